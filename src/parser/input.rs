//! Character classes, name helpers and reference decoding shared by the
//! scanner and the tree builder.
//!
//! # Security
//!
//! Two limits guard against hostile input unless the `huge` option lifts
//! them:
//!
//! - **Depth limit**: caps element nesting.
//! - **Name length limit**: caps element and attribute names.
//!
//! No external entity loading is performed (immune to XXE).

// -------------------------------------------------------------------------
// Security defaults
// -------------------------------------------------------------------------

/// Default maximum element nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

/// Nesting depth allowed with the `huge` option.
pub(crate) const HUGE_MAX_DEPTH: u32 = 2048;

/// Default maximum length (in bytes) of an element or attribute name.
pub(crate) const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// Name length allowed with the `huge` option.
pub(crate) const HUGE_MAX_NAME_LENGTH: usize = 10_000_000;

// -------------------------------------------------------------------------
// XML Name character classes (XML 1.0 §2.3)
// -------------------------------------------------------------------------

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2 `[2]`.
///
/// The XML 1.0 (Fifth Edition) `Char` production allows:
/// `#x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 [4a].
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Returns `true` for the four XML whitespace bytes (`S` production).
pub(crate) fn is_xml_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Returns `true` if `s` is a non-empty XML `Name`.
pub(crate) fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

/// Splits a qualified name into optional prefix and local part.
///
/// `"foo:bar"` → `(Some("foo"), "bar")`
/// `"bar"` → `(None, "bar")`
pub(crate) fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.find(':') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Validates that a name is a legal `QName` per Namespaces in XML 1.0 §4.
///
/// A `QName` has at most one colon, and neither prefix nor local part may be
/// empty. Returns an error message if invalid, or `None` if valid.
pub(crate) fn validate_qname(name: &str) -> Option<&'static str> {
    let colon_count = name.chars().filter(|&c| c == ':').count();
    if colon_count > 1 {
        return Some("QName contains multiple colons");
    }
    if colon_count == 1 && (name.starts_with(':') || name.ends_with(':')) {
        return Some("QName has empty prefix or local part");
    }
    None
}

// -------------------------------------------------------------------------
// References
// -------------------------------------------------------------------------

/// Returns the replacement of one of the five predefined entities.
pub(crate) fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

/// Decodes the body of a character reference (the part between `&#` and
/// `;`), e.g. `"60"` or `"x3C"`.
///
/// Returns `None` unless the body is well-formed and names a legal XML
/// character.
pub(crate) fn decode_char_ref(body: &str) -> Option<char> {
    let value = if let Some(hex) = body.strip_prefix('x') {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok()?
    } else {
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        body.parse::<u32>().ok()?
    };
    char::from_u32(value).filter(|&c| is_xml_char(c))
}

// -------------------------------------------------------------------------
// XML declaration
// -------------------------------------------------------------------------

/// Parsed XML declaration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlDeclaration {
    /// XML version (e.g. `"1.0"`).
    pub version: String,
    /// Optional encoding declaration.
    pub encoding: Option<String>,
    /// Optional standalone declaration.
    pub standalone: Option<bool>,
}

/// Parses the body of an XML declaration: everything between `<?xml` and
/// `?>`.
///
/// See XML 1.0 §2.8 production `[23]`. Returns a message describing the
/// first problem found.
pub(crate) fn parse_xml_decl(body: &str) -> Result<XmlDeclaration, &'static str> {
    let mut cursor = DeclCursor { rest: body };

    if !cursor.skip_whitespace() {
        return Err("whitespace required after '<?xml'");
    }
    let version = cursor
        .pseudo_attribute("version")?
        .ok_or("version is required in the XML declaration")?;
    // XML 1.0 §2.8: VersionNum ::= '1.' [0-9]+
    if !is_valid_version_num(version) {
        return Err("invalid version number");
    }

    let had_ws = cursor.skip_whitespace();
    let encoding = match cursor.pseudo_attribute("encoding")? {
        Some(_) if !had_ws => return Err("whitespace required before encoding"),
        Some(enc) => {
            // XML 1.0 §4.3.3: EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*
            if !is_valid_encoding_name(enc) {
                return Err("invalid encoding name");
            }
            Some(enc.to_string())
        }
        None => None,
    };

    // Without an encoding, the whitespace before it already separates
    // version from standalone.
    let had_ws2 = cursor.skip_whitespace() || (encoding.is_none() && had_ws);
    let standalone = match cursor.pseudo_attribute("standalone")? {
        Some(_) if !had_ws2 => return Err("whitespace required before standalone"),
        Some("yes") => Some(true),
        Some("no") => Some(false),
        Some(_) => return Err("standalone must be 'yes' or 'no'"),
        None => None,
    };

    cursor.skip_whitespace();
    if !cursor.rest.is_empty() {
        return Err("unexpected content in the XML declaration");
    }

    Ok(XmlDeclaration {
        version: version.to_string(),
        encoding,
        standalone,
    })
}

struct DeclCursor<'a> {
    rest: &'a str,
}

impl<'a> DeclCursor<'a> {
    fn skip_whitespace(&mut self) -> bool {
        let trimmed = self.rest.trim_start_matches([' ', '\t', '\r', '\n']);
        let skipped = trimmed.len() != self.rest.len();
        self.rest = trimmed;
        skipped
    }

    /// Reads `name = "value"` if the input continues with `name`.
    fn pseudo_attribute(&mut self, name: &str) -> Result<Option<&'a str>, &'static str> {
        let Some(after) = self.rest.strip_prefix(name) else {
            return Ok(None);
        };
        let after = after.trim_start_matches([' ', '\t', '\r', '\n']);
        let after = after
            .strip_prefix('=')
            .ok_or("expected '=' in the XML declaration")?
            .trim_start_matches([' ', '\t', '\r', '\n']);
        let quote = after
            .chars()
            .next()
            .filter(|&q| q == '"' || q == '\'')
            .ok_or("expected a quoted value in the XML declaration")?;
        let body = &after[1..];
        let end = body.find(quote).ok_or("unterminated value in the XML declaration")?;
        self.rest = &body[end + 1..];
        Ok(Some(&body[..end]))
    }
}

/// Validates an XML version number per XML 1.0 §2.8.
///
/// `VersionNum ::= '1.' [0-9]+`
fn is_valid_version_num(s: &str) -> bool {
    if let Some(rest) = s.strip_prefix("1.") {
        !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
    } else {
        false
    }
}

/// Validates an encoding name per XML 1.0 §4.3.3.
///
/// `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_valid_encoding_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    if !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("foo:bar"), (Some("foo"), "bar"));
        assert_eq!(split_name("bar"), (None, "bar"));
    }

    #[test]
    fn test_validate_qname() {
        assert_eq!(validate_qname("a:b"), None);
        assert_eq!(validate_qname("a:b:c"), Some("QName contains multiple colons"));
        assert_eq!(validate_qname(":b"), Some("QName has empty prefix or local part"));
    }

    #[test]
    fn test_is_name_chars() {
        assert!(is_name_start_char('a'));
        assert!(is_name_start_char('_'));
        assert!(!is_name_start_char('1'));
        assert!(is_name_char('1'));
        assert!(is_name_char('-'));
        assert!(is_name("x-1.y"));
        assert!(!is_name("1x"));
        assert!(!is_name(""));
    }

    #[test]
    fn test_predefined_entities() {
        assert_eq!(predefined_entity("lt"), Some('<'));
        assert_eq!(predefined_entity("quot"), Some('"'));
        assert_eq!(predefined_entity("nbsp"), None);
    }

    #[test]
    fn test_decode_char_ref() {
        assert_eq!(decode_char_ref("60"), Some('<'));
        assert_eq!(decode_char_ref("x3C"), Some('<'));
        assert_eq!(decode_char_ref("x1F600"), Some('\u{1F600}'));
        assert_eq!(decode_char_ref("0"), None);
        assert_eq!(decode_char_ref("xD800"), None);
        assert_eq!(decode_char_ref("x"), None);
        assert_eq!(decode_char_ref("12a"), None);
    }

    #[test]
    fn test_parse_xml_decl() {
        let decl = parse_xml_decl(" version=\"1.0\" encoding='UTF-8' standalone=\"yes\"").unwrap();
        assert_eq!(
            decl,
            XmlDeclaration {
                version: "1.0".into(),
                encoding: Some("UTF-8".into()),
                standalone: Some(true),
            }
        );
    }

    #[test]
    fn test_parse_xml_decl_standalone_without_encoding() {
        let decl = parse_xml_decl(" version='1.0' standalone='no' ").unwrap();
        assert_eq!(decl.encoding, None);
        assert_eq!(decl.standalone, Some(false));
    }

    #[test]
    fn test_parse_xml_decl_errors() {
        assert!(parse_xml_decl(" encoding='UTF-8'").is_err());
        assert!(parse_xml_decl(" version='2.0'").is_err());
        assert!(parse_xml_decl(" version='1.0'encoding='UTF-8'").is_err());
        assert!(parse_xml_decl(" version='1.0' standalone='maybe'").is_err());
        assert!(parse_xml_decl(" version='1.0' junk").is_err());
    }
}
