//! Encoding detection and incremental transcoding.
//!
//! Implements BOM sniffing and XML declaration encoding detection per
//! XML 1.0 Section 4.3.3 and Appendix F, bridging to `encoding_rs` for
//! character conversion.
//!
//! # Encoding Detection Strategy
//!
//! 1. A caller-supplied override wins over everything else.
//! 2. Otherwise check for a Byte Order Mark (BOM) and skip it.
//! 3. Without a BOM, recognize UTF-16 by the shape of a leading `<?`.
//! 4. Otherwise read the `encoding=` pseudo-attribute of the XML
//!    declaration from the raw ASCII-compatible bytes.
//! 5. Default to UTF-8.
//!
//! Detection happens once, on the first bytes of the stream. After that,
//! [`InputDecoder`] hands every chunk to a streaming `encoding_rs::Decoder`,
//! so a multi-byte sequence split across two chunks decodes exactly as if
//! it had arrived in one piece.

use encoding_rs::{DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// Upper bound on the bytes inspected while looking for the XML declaration.
const SNIFF_LIMIT: usize = 200;

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The named encoding is not known to `encoding_rs`.
    #[error("unsupported encoding: {0}")]
    Unsupported(String),
    /// The input holds a byte sequence that is invalid in its encoding.
    #[error("malformed {encoding} byte sequence at byte {offset}")]
    Malformed {
        /// Name of the encoding in use.
        encoding: &'static str,
        /// Offset of the bad sequence in the raw input.
        offset: usize,
    },
}

/// Detects the encoding of an XML byte stream by inspecting the Byte Order Mark.
///
/// Returns a tuple of (encoding name, number of BOM bytes to skip). The encoding
/// name is an IANA charset name suitable for passing to `encoding_rs`.
///
/// Per XML 1.0 Appendix F, the BOM detection order is:
/// - `EF BB BF` -> UTF-8
/// - `FE FF`    -> UTF-16 BE
/// - `FF FE`    -> UTF-16 LE
/// - No BOM     -> UTF-8 (default per XML spec)
///
/// # Examples
///
/// ```
/// use libxml2_rs::encoding::detect_encoding;
///
/// let (enc, skip) = detect_encoding(b"\xEF\xBB\xBFhello");
/// assert_eq!(enc, "UTF-8");
/// assert_eq!(skip, 3);
///
/// let (enc, skip) = detect_encoding(b"<root/>");
/// assert_eq!(enc, "UTF-8");
/// assert_eq!(skip, 0);
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        ("UTF-8", 3)
    } else if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        ("UTF-16BE", 2)
    } else if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFE {
        ("UTF-16LE", 2)
    } else {
        ("UTF-8", 0)
    }
}

/// Looks up an encoding by label, case-insensitively.
///
/// # Errors
///
/// Returns [`EncodingError::Unsupported`] for labels `encoding_rs` does not know.
pub fn lookup(label: &str) -> Result<&'static Encoding, EncodingError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EncodingError::Unsupported(label.to_string()))
}

enum DecoderState {
    /// Encoding not decided yet; raw bytes held back.
    Sniffing(Vec<u8>),
    /// Encoding decided; bytes flow straight through the decoder.
    Decoding(encoding_rs::Decoder),
}

/// Incremental bytes-to-UTF-8 decoder for one input stream.
///
/// # Examples
///
/// ```
/// use libxml2_rs::encoding::InputDecoder;
///
/// let mut decoder = InputDecoder::new(None).unwrap();
/// let mut out = String::new();
/// decoder.decode(b"<a>caf\xC3", false, &mut out).unwrap();
/// decoder.decode(b"\xA9</a>", true, &mut out).unwrap();
/// assert_eq!(out, "<a>caf\u{e9}</a>");
/// ```
pub struct InputDecoder {
    state: DecoderState,
    forced: Option<&'static Encoding>,
    encoding: Option<&'static Encoding>,
    /// Raw bytes handed to the `encoding_rs` decoder so far.
    consumed: usize,
}

impl Default for InputDecoder {
    /// A decoder that detects the encoding from the input.
    fn default() -> Self {
        Self {
            state: DecoderState::Sniffing(Vec::new()),
            forced: None,
            encoding: None,
            consumed: 0,
        }
    }
}

impl InputDecoder {
    /// Creates a decoder, optionally forcing an encoding.
    ///
    /// # Errors
    ///
    /// Fails if the override names an unknown encoding.
    pub fn new(override_label: Option<&str>) -> Result<Self, EncodingError> {
        let forced = override_label.map(lookup).transpose()?;
        Ok(Self {
            forced,
            ..Self::default()
        })
    }

    /// Returns the name of the encoding in use, once it has been decided.
    #[must_use]
    pub fn encoding_name(&self) -> Option<&'static str> {
        self.encoding.map(Encoding::name)
    }

    /// Returns `true` if the encoding came from a caller override.
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.forced.is_some()
    }

    /// Returns how many raw bytes are held back waiting for detection.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        match &self.state {
            DecoderState::Sniffing(held) => held.len(),
            DecoderState::Decoding(_) => 0,
        }
    }

    /// Discards all decoding state, keeping the forced encoding.
    pub fn reset(&mut self) {
        self.state = DecoderState::Sniffing(Vec::new());
        self.encoding = None;
        self.consumed = 0;
    }

    /// Decodes `bytes`, appending UTF-8 text to `out`.
    ///
    /// With `last == false`, incomplete trailing sequences are kept for the
    /// next call. With `last == true` they are reported as malformed.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError` for malformed input or an unsupported
    /// declared encoding.
    pub fn decode(&mut self, bytes: &[u8], last: bool, out: &mut String) -> Result<(), EncodingError> {
        if let DecoderState::Sniffing(held) = &mut self.state {
            held.extend_from_slice(bytes);
            let Some((encoding, skip)) = sniff(held, self.forced, last)? else {
                return Ok(());
            };
            let held = std::mem::take(held);
            log::debug!("input encoding detected as {}", encoding.name());
            self.encoding = Some(encoding);
            self.consumed = skip;
            self.state = DecoderState::Decoding(encoding.new_decoder_without_bom_handling());
            return self.run(&held[skip..], last, out);
        }
        self.run(bytes, last, out)
    }

    fn run(&mut self, mut input: &[u8], last: bool, out: &mut String) -> Result<(), EncodingError> {
        let DecoderState::Decoding(decoder) = &mut self.state else {
            return Ok(());
        };
        loop {
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or(input.len().saturating_mul(3).saturating_add(16));
            out.reserve(needed);
            let (result, read) = decoder.decode_to_string_without_replacement(input, out, last);
            self.consumed += read;
            input = &input[read..];
            match result {
                DecoderResult::InputEmpty => return Ok(()),
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(bad, after) => {
                    let encoding = self.encoding.map_or("UTF-8", Encoding::name);
                    return Err(EncodingError::Malformed {
                        encoding,
                        offset: self
                            .consumed
                            .saturating_sub(usize::from(bad) + usize::from(after)),
                    });
                }
            }
        }
    }
}

/// Decides the encoding of `held`, or returns `None` if more bytes are needed.
fn sniff(
    held: &[u8],
    forced: Option<&'static Encoding>,
    last: bool,
) -> Result<Option<(&'static Encoding, usize)>, EncodingError> {
    if let Some(encoding) = forced {
        // A BOM of the forced encoding itself is still skipped.
        if held.len() < 3 && !last {
            return Ok(None);
        }
        let skip = match Encoding::for_bom(held) {
            Some((bom_encoding, len)) if bom_encoding == encoding => len,
            _ => 0,
        };
        return Ok(Some((encoding, skip)));
    }

    if held.len() < 4 && !last {
        return Ok(None);
    }

    let (bom_name, skip) = detect_encoding(held);
    if skip > 0 {
        let encoding = match bom_name {
            "UTF-16BE" => UTF_16BE,
            "UTF-16LE" => UTF_16LE,
            _ => UTF_8,
        };
        return Ok(Some((encoding, skip)));
    }

    if held.starts_with(&[0x3C, 0x00, 0x3F, 0x00]) {
        return Ok(Some((UTF_16LE, 0)));
    }
    if held.starts_with(&[0x00, 0x3C, 0x00, 0x3F]) {
        return Ok(Some((UTF_16BE, 0)));
    }

    if held.len() < 5 && b"<?xml".starts_with(held) && !last {
        return Ok(None);
    }
    if held.starts_with(b"<?xml") {
        let closed = memchr::memmem::find(held, b"?>").is_some();
        if !closed && held.len() < SNIFF_LIMIT && !last {
            return Ok(None);
        }
        if let Some(declared) = extract_encoding_from_ascii_bytes(held) {
            let encoding = lookup(&declared)?;
            // The declaration was readable as ASCII, so a UTF-16 label
            // without a BOM cannot be right; keep reading bytes as UTF-8.
            if encoding == UTF_16LE || encoding == UTF_16BE {
                return Ok(Some((UTF_8, 0)));
            }
            return Ok(Some((encoding, 0)));
        }
    }

    Ok(Some((UTF_8, 0)))
}

/// Extracts the `encoding` attribute from raw bytes by treating them as ASCII.
///
/// Since the XML declaration must be in ASCII-compatible characters, we can
/// scan the bytes directly. Returns `None` if no encoding declaration is found.
fn extract_encoding_from_ascii_bytes(bytes: &[u8]) -> Option<String> {
    let limit = bytes.len().min(SNIFF_LIMIT);
    let scan = &bytes[..limit];

    if !scan.starts_with(b"<?xml") {
        return None;
    }

    let decl_end = memchr::memmem::find(scan, b"?>")?;
    let decl = &scan[..decl_end];

    let enc_pos = memchr::memmem::find(decl, b"encoding")?;
    let after_enc = &decl[enc_pos + b"encoding".len()..];

    // Skip whitespace and '='
    let after_enc = skip_ascii_whitespace(after_enc);
    if after_enc.first() != Some(&b'=') {
        return None;
    }
    let after_eq = skip_ascii_whitespace(&after_enc[1..]);

    let quote = *after_eq.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let after_quote = &after_eq[1..];
    let end = memchr::memchr(quote, after_quote)?;
    let encoding_bytes = &after_quote[..end];

    if encoding_bytes.iter().all(u8::is_ascii) {
        Some(String::from_utf8_lossy(encoding_bytes).into_owned())
    } else {
        None
    }
}

/// Skips leading ASCII whitespace bytes (space, tab, CR, LF).
fn skip_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t' || b == b'\r' || b == b'\n')
        .count();
    &bytes[skip..]
}

/// Returns `true` if the label is a recognized alias for UTF-8.
#[must_use]
pub fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("UTF-8") || label.eq_ignore_ascii_case("UTF8")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode_all(chunks: &[&[u8]], forced: Option<&str>) -> Result<String, EncodingError> {
        let mut decoder = InputDecoder::new(forced)?;
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            decoder.decode(chunk, i + 1 == chunks.len(), &mut out)?;
        }
        Ok(out)
    }

    #[test]
    fn test_detect_utf8_bom() {
        let bytes = b"\xEF\xBB\xBF<?xml version=\"1.0\"?><root/>";
        assert_eq!(detect_encoding(bytes), ("UTF-8", 3));
    }

    #[test]
    fn test_detect_utf16le_bom() {
        let bytes = b"\xFF\xFE<\x00r\x00o\x00o\x00t\x00";
        assert_eq!(detect_encoding(bytes), ("UTF-16LE", 2));
    }

    #[test]
    fn test_detect_utf16be_bom() {
        let bytes = b"\xFE\xFF\x00<\x00r\x00o\x00o\x00t";
        assert_eq!(detect_encoding(bytes), ("UTF-16BE", 2));
    }

    #[test]
    fn test_detect_no_bom() {
        assert_eq!(detect_encoding(b"<root/>"), ("UTF-8", 0));
        assert_eq!(detect_encoding(b""), ("UTF-8", 0));
        assert_eq!(detect_encoding(b"\xEF"), ("UTF-8", 0));
    }

    #[test]
    fn test_decode_utf8_passthrough() {
        let out = decode_all(&[b"<root>hello</root>"], None).unwrap();
        assert_eq!(out, "<root>hello</root>");
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let out = decode_all(&[b"\xEF\xBB\xBF<root/>"], None).unwrap();
        assert_eq!(out, "<root/>");
    }

    #[test]
    fn test_decode_split_multibyte_sequence() {
        // U+20AC EURO SIGN is E2 82 AC; split it over three chunks.
        let out = decode_all(&[b"<a>\xE2", b"\x82", b"\xAC</a>"], None).unwrap();
        assert_eq!(out, "<a>\u{20AC}</a>");
    }

    #[test]
    fn test_decode_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<r>\u{e9}</r>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (a, b) = bytes.split_at(5);
        let out = decode_all(&[a, b], None).unwrap();
        assert_eq!(out, "<r>\u{e9}</r>");
    }

    #[test]
    fn test_decode_declared_latin1() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>");
        bytes.extend_from_slice(b"<root>caf\xE9</root>");
        let out = decode_all(&[&bytes], None).unwrap();
        assert!(out.contains("caf\u{00E9}"));
    }

    #[test]
    fn test_declaration_split_across_chunks() {
        let out = decode_all(
            &[b"<?xml version=\"1.0\" enc", b"oding=\"ISO-8859-1\"?><r>\xE9</r>"],
            None,
        )
        .unwrap();
        assert!(out.ends_with("<r>\u{e9}</r>"));
    }

    #[test]
    fn test_override_wins() {
        let out = decode_all(&[b"<r>\xE9</r>"], Some("latin1")).unwrap();
        assert_eq!(out, "<r>\u{e9}</r>");
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let err = InputDecoder::new(Some("UNKNOWN-ENCODING-42")).err().unwrap();
        assert_eq!(err, EncodingError::Unsupported("UNKNOWN-ENCODING-42".into()));
    }

    #[test]
    fn test_unknown_declared_encoding() {
        let err = decode_all(&[b"<?xml version=\"1.0\" encoding=\"bogus\"?><r/>"], None)
            .unwrap_err();
        assert_eq!(err, EncodingError::Unsupported("bogus".into()));
    }

    #[test]
    fn test_invalid_utf8_reports_offset() {
        let err = decode_all(&[b"<r>\x80</r>"], None).unwrap_err();
        assert_eq!(
            err,
            EncodingError::Malformed {
                encoding: "UTF-8",
                offset: 3
            }
        );
    }

    #[test]
    fn test_short_input_waits_for_more() {
        let mut decoder = InputDecoder::new(None).unwrap();
        let mut out = String::new();
        decoder.decode(b"<a", false, &mut out).unwrap();
        assert_eq!(out, "");
        assert_eq!(decoder.pending_bytes(), 2);
        decoder.decode(b"/>", true, &mut out).unwrap();
        assert_eq!(out, "<a/>");
        assert_eq!(decoder.encoding_name(), Some("UTF-8"));
    }

    #[test]
    fn test_extract_encoding_single_quotes() {
        let enc = extract_encoding_from_ascii_bytes(b"<?xml version='1.0' encoding='UTF-8'?><r/>");
        assert_eq!(enc, Some("UTF-8".to_string()));
        assert_eq!(extract_encoding_from_ascii_bytes(b"<?xml version=\"1.0\"?>"), None);
        assert_eq!(extract_encoding_from_ascii_bytes(b"<root/>"), None);
    }
}
