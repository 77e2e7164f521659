//! HTML fragment to well-formed XHTML.

use scraper::{ElementRef, Html, Node};

/// Elements written as `<name/>`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements dropped with their contents.
const DROPPED_ELEMENTS: &[&str] = &["script", "noscript", "template"];

/// Re-serialises `html` as XHTML.
///
/// `image_src` is asked for every `<img src>`; returning a path replaces the
/// source, returning `None` keeps it as it was.
pub fn to_xhtml(html: &str, mut image_src: impl FnMut(&str) -> Option<String>) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(fragment.root_element(), &mut out, &mut image_src);
    out
}

/// Visible text of an HTML fragment with whitespace collapsed.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn write_children(
    el: ElementRef<'_>,
    out: &mut String,
    image_src: &mut dyn FnMut(&str) -> Option<String>,
) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => escape_into(text, false, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out, image_src);
                }
            }
            _ => {}
        }
    }
}

fn write_element(
    el: ElementRef<'_>,
    out: &mut String,
    image_src: &mut dyn FnMut(&str) -> Option<String>,
) {
    let name = el.value().name();
    if DROPPED_ELEMENTS.contains(&name) {
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in el.value().attrs() {
        if !is_xml_name(attr) {
            continue;
        }
        let replaced = (name == "img" && attr == "src")
            .then(|| image_src(value))
            .flatten();
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_into(replaced.as_deref().unwrap_or(value), true, out);
        out.push('"');
    }

    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    write_children(el, out, image_src);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// HTML tolerates attribute names XML rejects, such as `"` or a leading digit.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&#160;"),
            c => out.push(c),
        }
    }
}
