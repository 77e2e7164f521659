//! JPEG and PNG to PDF image XObjects.
//!
//! JPEG data is embedded as is. Opaque PNG data is passed through with a
//! predictor so the zlib stream never has to be decoded; PNGs with an alpha
//! channel are decoded so the alpha plane can become a soft mask.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Object, Stream, StringFormat, dictionary};
use thiserror::Error;

/// Why an image could not be embedded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnsupportedImage {
    #[error("not a JPEG or PNG image")]
    UnknownFormat,
    #[error("truncated or malformed {0} data")]
    Malformed(&'static str),
    #[error("unsupported PNG layout ({0})")]
    PngLayout(String),
}

/// An image ready to be added as an XObject.
#[derive(Debug)]
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    pub stream: Stream,
    /// Alpha plane, to be referenced as `/SMask`.
    pub soft_mask: Option<Stream>,
}

/// Decodes the headers of a JPEG or PNG file into an XObject.
pub fn decode(data: &[u8]) -> Result<PdfImage, UnsupportedImage> {
    if data.starts_with(&[0xFF, 0xD8]) {
        decode_jpeg(data)
    } else if data.starts_with(PNG_SIGNATURE) {
        decode_png(data)
    } else {
        Err(UnsupportedImage::UnknownFormat)
    }
}

fn image_dict(width: u32, height: u32, color_space: Object, bits: u8) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => i64::from(bits),
    }
}

// ===========================================
// JPEG
// ===========================================

fn decode_jpeg(data: &[u8]) -> Result<PdfImage, UnsupportedImage> {
    let malformed = || UnsupportedImage::Malformed("JPEG");
    let mut pos = 2;

    loop {
        while data.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        let marker = *data.get(pos).ok_or_else(malformed)?;
        pos += 1;

        // Standalone markers carry no length.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        let len = usize::from(read_u16(data, pos).ok_or_else(malformed)?);

        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let height = u32::from(read_u16(data, pos + 3).ok_or_else(malformed)?);
            let width = u32::from(read_u16(data, pos + 5).ok_or_else(malformed)?);
            let components = *data.get(pos + 7).ok_or_else(malformed)?;

            let mut dict = match components {
                1 => image_dict(width, height, "DeviceGray".into(), 8),
                3 => image_dict(width, height, "DeviceRGB".into(), 8),
                4 => {
                    let mut dict = image_dict(width, height, "DeviceCMYK".into(), 8);
                    // Adobe writes CMYK JPEGs inverted.
                    let decode: Vec<Object> = [1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer).to_vec();
                    dict.set("Decode", decode);
                    dict
                }
                _ => return Err(malformed()),
            };
            dict.set("Filter", "DCTDecode");

            return Ok(PdfImage {
                width,
                height,
                stream: Stream::new(dict, data.to_vec()),
                soft_mask: None,
            });
        }

        if marker == 0xD9 || marker == 0xDA {
            return Err(malformed());
        }
        pos += len;
    }
}

fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    Some(u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]))
}

fn read_u32(data: &[u8], pos: usize) -> Option<u32> {
    let bytes = data.get(pos..pos + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

// ===========================================
// PNG
// ===========================================

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

struct PngHeader {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: u8,
    interlace: u8,
}

fn decode_png(data: &[u8]) -> Result<PdfImage, UnsupportedImage> {
    let malformed = || UnsupportedImage::Malformed("PNG");
    let mut header = None;
    let mut palette = Vec::new();
    let mut idat = Vec::new();

    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let len = read_u32(data, pos).ok_or_else(malformed)? as usize;
        let kind = &data[pos + 4..pos + 8];
        let body = data.get(pos + 8..pos + 8 + len).ok_or_else(malformed)?;
        match kind {
            b"IHDR" if body.len() >= 13 => {
                header = Some(PngHeader {
                    width: read_u32(body, 0).ok_or_else(malformed)?,
                    height: read_u32(body, 4).ok_or_else(malformed)?,
                    bit_depth: body[8],
                    color_type: body[9],
                    interlace: body[12],
                });
            }
            b"PLTE" => palette = body.to_vec(),
            b"IDAT" => idat.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        // Length, type, body, CRC.
        pos += 12 + len;
    }

    let header = header.ok_or_else(malformed)?;
    if idat.is_empty() {
        return Err(malformed());
    }
    if header.interlace != 0 {
        return Err(UnsupportedImage::PngLayout("interlaced".into()));
    }

    match header.color_type {
        0 | 2 | 3 => png_passthrough(&header, &palette, idat),
        4 | 6 if header.bit_depth == 8 => png_split_alpha(&header, &idat),
        other => Err(UnsupportedImage::PngLayout(format!(
            "colour type {other}, bit depth {}",
            header.bit_depth
        ))),
    }
}

/// Embeds the zlib stream unchanged, letting the reader undo PNG filtering.
fn png_passthrough(
    header: &PngHeader,
    palette: &[u8],
    idat: Vec<u8>,
) -> Result<PdfImage, UnsupportedImage> {
    let (color_space, colors): (Object, i64) = match header.color_type {
        0 => ("DeviceGray".into(), 1),
        2 => ("DeviceRGB".into(), 3),
        _ => {
            if palette.is_empty() || palette.len() % 3 != 0 {
                return Err(UnsupportedImage::Malformed("PNG palette"));
            }
            let hival = (palette.len() / 3 - 1) as i64;
            let indexed = vec![
                "Indexed".into(),
                "DeviceRGB".into(),
                Object::Integer(hival),
                Object::String(palette.to_vec(), StringFormat::Hexadecimal),
            ];
            (Object::Array(indexed), 1)
        }
    };

    let mut dict = image_dict(header.width, header.height, color_space, header.bit_depth);
    dict.set("Filter", "FlateDecode");
    dict.set(
        "DecodeParms",
        dictionary! {
            "Predictor" => 15,
            "Colors" => colors,
            "BitsPerComponent" => i64::from(header.bit_depth),
            "Columns" => i64::from(header.width),
        },
    );

    Ok(PdfImage {
        width: header.width,
        height: header.height,
        stream: Stream::new(dict, idat),
        soft_mask: None,
    })
}

/// Decodes an 8-bit PNG with alpha into a colour plane and a soft mask.
fn png_split_alpha(header: &PngHeader, idat: &[u8]) -> Result<PdfImage, UnsupportedImage> {
    let malformed = || UnsupportedImage::Malformed("PNG");
    let channels: usize = if header.color_type == 6 { 4 } else { 2 };
    let color_channels = channels - 1;
    let width = header.width as usize;
    let stride = width * channels;

    let mut raw = Vec::new();
    ZlibDecoder::new(idat)
        .read_to_end(&mut raw)
        .map_err(|_| malformed())?;
    let pixels = unfilter(&raw, stride, channels, header.height as usize).ok_or_else(malformed)?;

    let mut color = Vec::with_capacity(pixels.len() / channels * color_channels);
    let mut alpha = Vec::with_capacity(pixels.len() / channels);
    for px in pixels.chunks_exact(channels) {
        color.extend_from_slice(&px[..color_channels]);
        alpha.push(px[color_channels]);
    }

    let color_space = if color_channels == 3 { "DeviceRGB" } else { "DeviceGray" };
    let mut dict = image_dict(header.width, header.height, color_space.into(), 8);
    dict.set("Filter", "FlateDecode");
    let mut mask_dict = image_dict(header.width, header.height, "DeviceGray".into(), 8);
    mask_dict.set("Filter", "FlateDecode");

    Ok(PdfImage {
        width: header.width,
        height: header.height,
        stream: Stream::new(dict, deflate(&color).map_err(|_| malformed())?),
        soft_mask: Some(Stream::new(mask_dict, deflate(&alpha).map_err(|_| malformed())?)),
    })
}

/// Reverses PNG scanline filtering.
fn unfilter(raw: &[u8], stride: usize, bpp: usize, rows: usize) -> Option<Vec<u8>> {
    let mut out = vec![0u8; stride * rows];
    let mut input = raw.chunks_exact(stride + 1);

    for row in 0..rows {
        let line = input.next()?;
        let (filter, src) = (line[0], &line[1..]);
        let (done, rest) = out.split_at_mut(row * stride);
        let prev = if row == 0 { None } else { Some(&done[(row - 1) * stride..]) };
        let cur = &mut rest[..stride];

        for i in 0..stride {
            let a = if i >= bpp { cur[i - bpp] } else { 0 };
            let b = prev.map_or(0, |p| p[i]);
            let c = if i >= bpp { prev.map_or(0, |p| p[i - bpp]) } else { 0 };
            let predicted = match filter {
                0 => 0,
                1 => a,
                2 => b,
                3 => ((u16::from(a) + u16::from(b)) / 2) as u8,
                4 => paeth(a, b, c),
                _ => return None,
            };
            cur[i] = src[i].wrapping_add(predicted);
        }
    }
    Some(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let (pa, pb, pc) = (
        (p - i16::from(a)).abs(),
        (p - i16::from(b)).abs(),
        (p - i16::from(c)).abs(),
    );
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
