//! Splitting the raw attribute text of a start tag into decoded
//! name/value pairs.
//!
//! Values are normalized the way XML 1.0 §3.3.3 asks for CDATA attributes:
//! literal tab, newline and carriage return become spaces, while the same
//! characters written as character references are kept. The five
//! predefined entities and character references are decoded; any other
//! entity reference is kept as a [`ValuePart::EntityRef`] for the tree
//! builder to judge.

use crate::error::{SyntaxKind, XmlError};
use crate::parser::input::{
    decode_char_ref, is_name, is_xml_char, is_xml_whitespace, predefined_entity,
};
use crate::tree::ValuePart;

/// One attribute as written in a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawAttribute {
    /// The qualified name.
    pub name: String,
    /// The decoded value.
    pub value: Vec<ValuePart>,
    /// Absolute offset of the name.
    pub offset: usize,
}

impl RawAttribute {
    /// Returns `true` for `xmlns` and `xmlns:*` declarations.
    pub fn is_namespace_decl(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }

    /// Returns the value as plain text, or `None` if it holds an entity
    /// reference that could not be decoded.
    pub fn plain_value(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.value {
            match part {
                ValuePart::Text(t) => out.push_str(t),
                ValuePart::EntityRef(_) => return None,
            }
        }
        Some(out)
    }
}

/// Parses `raw` (the text between the element name and `>`), whose first
/// byte sits at absolute offset `base`.
pub(crate) fn parse_attributes(raw: &str, base: usize) -> Result<Vec<RawAttribute>, XmlError> {
    let bytes = raw.as_bytes();
    let err = |at: usize, kind| XmlError::Syntax {
        offset: base + at,
        kind,
    };
    let mut attrs = Vec::new();
    let mut i = 0;

    loop {
        let ws_start = i;
        while i < bytes.len() && is_xml_whitespace(bytes[i]) {
            i += 1;
        }
        if i == bytes.len() {
            return Ok(attrs);
        }
        if i == ws_start {
            return Err(err(i, SyntaxKind::Whitespace));
        }

        let name_start = i;
        while i < bytes.len() && !is_xml_whitespace(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let name = &raw[name_start..i];
        if !is_name(name) {
            return Err(err(name_start, SyntaxKind::Name));
        }

        while i < bytes.len() && is_xml_whitespace(bytes[i]) {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            return Err(err(i, SyntaxKind::Equals));
        }
        i += 1;
        while i < bytes.len() && is_xml_whitespace(bytes[i]) {
            i += 1;
        }

        let quote = match bytes.get(i) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err(err(i, SyntaxKind::AttributeValue)),
        };
        let value_start = i + 1;
        let Some(len) = memchr::memchr(quote, &bytes[value_start..]) else {
            return Err(err(i, SyntaxKind::AttributeValue));
        };
        let value = decode_value(&raw[value_start..value_start + len])
            .map_err(|(at, kind)| err(value_start + at, kind))?;
        i = value_start + len + 1;

        attrs.push(RawAttribute {
            name: name.to_string(),
            value,
            offset: base + name_start,
        });
    }
}

/// Decodes one attribute value. Errors carry an offset relative to `raw`.
fn decode_value(raw: &str) -> Result<Vec<ValuePart>, (usize, SyntaxKind)> {
    let mut parts = Vec::new();
    let mut text = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut at = 0;

    while let Some(i) = memchr::memchr3(b'&', b'<', b'\t', rest.as_bytes())
        .into_iter()
        .chain(memchr::memchr2(b'\n', b'\r', rest.as_bytes()))
        .min()
    {
        push_checked(&mut text, &rest[..i], at)?;
        at += i;
        rest = &rest[i..];
        match rest.as_bytes()[0] {
            b'<' => return Err((at, SyntaxKind::AttributeValue)),
            b'&' => {
                let end = rest.find(';').ok_or((at, SyntaxKind::Reference))?;
                let body = &rest[1..end];
                if let Some(num) = body.strip_prefix('#') {
                    text.push(decode_char_ref(num).ok_or((at, SyntaxKind::CharRef))?);
                } else if let Some(c) = predefined_entity(body) {
                    text.push(c);
                } else if is_name(body) {
                    if !text.is_empty() {
                        parts.push(ValuePart::Text(std::mem::take(&mut text)));
                    }
                    parts.push(ValuePart::EntityRef(body.to_string()));
                } else {
                    return Err((at, SyntaxKind::Reference));
                }
                at += end + 1;
                rest = &rest[end + 1..];
            }
            _ => {
                text.push(' ');
                at += 1;
                rest = &rest[1..];
            }
        }
    }
    push_checked(&mut text, rest, at)?;
    if !text.is_empty() || parts.is_empty() {
        parts.push(ValuePart::Text(text));
    }
    Ok(parts)
}

fn push_checked(out: &mut String, segment: &str, at: usize) -> Result<(), (usize, SyntaxKind)> {
    if let Some((i, _)) = segment.char_indices().find(|&(_, c)| !is_xml_char(c)) {
        return Err((at + i, SyntaxKind::Char));
    }
    out.push_str(segment);
    Ok(())
}
