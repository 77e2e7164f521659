//! Standard security handler: RC4 128-bit through a `/StdCF` crypt filter.
//!
//! Applied after compression, so streams are encrypted in their encoded
//! form. Every string and stream except the encryption dictionary itself is
//! encrypted with a key derived from its object number.

use lopdf::{Document, Object, ObjectId, StringFormat, dictionary};
use md5::{Digest, Md5};
use uuid::Uuid;

use crate::config::Config;

const PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

const KEY_LEN: usize = 16;

/// `/P` with every permission granted; bits 1 and 2 must be zero.
const ALL_PERMISSIONS: u32 = 0xFFFF_FFFC;

/// Passwords and permission flags for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protection {
    owner_password: String,
    user_password: String,
    permissions: u32,
}

impl Protection {
    /// Builds the protection settings, or `None` when the configuration
    /// blocks nothing and sets no user password.
    ///
    /// Without a configured owner password a random one is used, so the
    /// restrictions cannot be lifted.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.pdf_protected() {
            return None;
        }
        let owner_password = config
            .pdf_password
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let permissions = config
            .pdf_blocked_permissions
            .iter()
            .fold(ALL_PERMISSIONS, |p, perm| p & !perm.bit());

        Some(Self {
            owner_password,
            user_password: config.pdf_user_password.clone().unwrap_or_default(),
            permissions,
        })
    }

    pub fn permissions(&self) -> u32 {
        self.permissions
    }

    /// Encrypts the document in place and adds `/Encrypt` and `/ID` to the
    /// trailer.
    pub fn apply(&self, doc: &mut Document) {
        let file_id = Uuid::new_v4().as_bytes().to_vec();
        let owner_entry = owner_entry(&self.owner_password, &self.user_password);
        let key = document_key(&self.user_password, &owner_entry, self.permissions, &file_id);
        let user_entry = user_entry(&key, &file_id);

        for (&id, object) in doc.objects.iter_mut() {
            encrypt_object(&key, id, object);
        }

        let encrypt = dictionary! {
            "Filter" => "Standard",
            "V" => 4,
            "R" => 4,
            "Length" => 128,
            "CF" => dictionary! {
                "StdCF" => dictionary! {
                    "CFM" => "V2",
                    "Length" => 16,
                    "AuthEvent" => "DocOpen",
                },
            },
            "StmF" => "StdCF",
            "StrF" => "StdCF",
            "O" => Object::String(owner_entry, StringFormat::Hexadecimal),
            "U" => Object::String(user_entry, StringFormat::Hexadecimal),
            // Signed 32-bit, as the format requires.
            "P" => i64::from(self.permissions as i32),
        };
        let encrypt_id = doc.add_object(encrypt);

        doc.trailer.set("Encrypt", encrypt_id);
        doc.trailer.set(
            "ID",
            vec![
                Object::String(file_id.clone(), StringFormat::Hexadecimal),
                Object::String(file_id, StringFormat::Hexadecimal),
            ],
        );
    }
}

fn padded(password: &str) -> Vec<u8> {
    let bytes = password.as_bytes();
    let len = bytes.len().min(32);
    let mut out = bytes[..len].to_vec();
    out.extend_from_slice(&PAD[..32 - len]);
    out
}

/// MD5 once over `input`, then fifty more times over the key-length prefix.
fn stretched_hash(input: &[u8]) -> Vec<u8> {
    let mut hash = Md5::digest(input).to_vec();
    for _ in 0..50 {
        hash = Md5::digest(&hash[..KEY_LEN]).to_vec();
    }
    hash.truncate(KEY_LEN);
    hash
}

/// RC4 with `key`, then nineteen more passes with `key ^ i`.
fn rc4_rounds(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = rc4(key, data);
    for i in 1..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        out = rc4(&round_key, &out);
    }
    out
}

/// The `/O` entry.
fn owner_entry(owner: &str, user: &str) -> Vec<u8> {
    let source = if owner.is_empty() { user } else { owner };
    let key = stretched_hash(&padded(source));
    rc4_rounds(&key, &padded(user))
}

/// The file encryption key.
fn document_key(user: &str, owner_entry: &[u8], permissions: u32, file_id: &[u8]) -> Vec<u8> {
    let mut input = padded(user);
    input.extend_from_slice(owner_entry);
    input.extend_from_slice(&permissions.to_le_bytes());
    input.extend_from_slice(file_id);
    stretched_hash(&input)
}

/// The `/U` entry; only its first sixteen bytes are checked by readers.
fn user_entry(key: &[u8], file_id: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(PAD);
    hasher.update(file_id);
    let mut entry = rc4_rounds(key, &hasher.finalize());
    entry.extend_from_slice(&PAD[..16]);
    entry
}

fn object_key(key: &[u8], id: ObjectId) -> Vec<u8> {
    let mut input = key.to_vec();
    input.extend_from_slice(&id.0.to_le_bytes()[..3]);
    input.extend_from_slice(&id.1.to_le_bytes()[..2]);
    let len = (key.len() + 5).min(16);
    Md5::digest(&input)[..len].to_vec()
}

fn encrypt_object(key: &[u8], id: ObjectId, object: &mut Object) {
    let object_key = object_key(key, id);
    encrypt_in_place(&object_key, object);
}

fn encrypt_in_place(key: &[u8], object: &mut Object) {
    match object {
        Object::String(bytes, _) => *bytes = rc4(key, bytes),
        Object::Array(items) => items.iter_mut().for_each(|item| encrypt_in_place(key, item)),
        Object::Dictionary(dict) => dict
            .iter_mut()
            .for_each(|(_, value)| encrypt_in_place(key, value)),
        Object::Stream(stream) => {
            stream
                .dict
                .iter_mut()
                .for_each(|(_, value)| encrypt_in_place(key, value));
            let content = rc4(key, &stream.content);
            stream.set_content(content);
        }
        _ => {}
    }
}

/// RC4 keystream XOR.
fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, usize::from(j));
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[usize::from(i)]);
            state.swap(usize::from(i), usize::from(j));
            let k = state[usize::from(state[usize::from(i)].wrapping_add(state[usize::from(j)]))];
            byte ^ k
        })
        .collect()
}
