//! XML 1.0 parser.
//!
//! Parsing is split into layers that each keep their own resumable state,
//! so a document can arrive in one piece or in arbitrary chunks and still
//! produce the same tree:
//!
//! 1. [`crate::encoding::InputDecoder`] turns raw bytes into UTF-8.
//! 2. [`scanner::Scanner`] turns text into tokens, suspending mid-construct.
//! 3. The tree builder applies tokens to a [`Document`], scoping namespaces
//!    and checking well-formedness.
//! 4. [`ParserContext`] drives the three and tracks the parse lifecycle.
//!
//! [`PushParser`] and the `parse_*` functions are conveniences on top of
//! [`ParserContext`].

mod attrs;
mod builder;
pub mod context;
pub(crate) mod input;
mod namespace;
pub mod push;
pub mod scanner;

pub use context::{ParserContext, ParserState};
pub use push::PushParser;

use std::io::Read;
use std::path::Path;

use crate::error::{ParseError, XmlError};
use crate::tree::Document;

use input::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NAME_LENGTH, HUGE_MAX_DEPTH, HUGE_MAX_NAME_LENGTH};

/// Legacy option bit: recover on errors.
pub const XML_PARSE_RECOVER: i32 = 1 << 0;
/// Legacy option bit: suppress error reports.
pub const XML_PARSE_NOERROR: i32 = 1 << 5;
/// Legacy option bit: suppress warning reports.
pub const XML_PARSE_NOWARNING: i32 = 1 << 6;
/// Legacy option bit: remove blank nodes.
pub const XML_PARSE_NOBLANKS: i32 = 1 << 8;
/// Legacy option bit: relax the hardcoded parser limits.
pub const XML_PARSE_HUGE: i32 = 1 << 19;

/// Chunk size used when reading from files and readers.
const READ_CHUNK: usize = 8192;

/// Parse options controlling parser behavior and security limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use libxml2_rs::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .recover(true)
///     .no_blanks(true)
///     .max_depth(128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// If true, attempt to recover from errors and produce a partial tree.
    pub recover: bool,
    /// If true, recovered errors are not logged or passed to a SAX handler.
    pub no_error: bool,
    /// If true, warnings are not logged or passed to a SAX handler.
    pub no_warning: bool,
    /// If true, strip whitespace-only text nodes.
    pub no_blanks: bool,
    /// If true, the depth and name-length limits are lifted to their huge
    /// values.
    pub huge: bool,

    // -- Security limits --
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
    /// Maximum number of tree nodes, the document node included. Exceeding
    /// it fails with [`XmlError::OutOfMemory`].
    pub max_nodes: Option<usize>,

    /// Encoding that overrides the BOM and the XML declaration.
    pub encoding: Option<String>,
    /// Base URL recorded on the document.
    pub base_url: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            recover: false,
            no_error: false,
            no_warning: false,
            no_blanks: false,
            huge: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_nodes: None,
            encoding: None,
            base_url: None,
        }
    }
}

impl ParseOptions {
    /// Builds options from a legacy option mask. Unknown bits are ignored.
    ///
    /// ```
    /// use libxml2_rs::parser::{ParseOptions, XML_PARSE_NOBLANKS, XML_PARSE_RECOVER};
    ///
    /// let opts = ParseOptions::from_bits(XML_PARSE_RECOVER | XML_PARSE_NOBLANKS | (1 << 30));
    /// assert!(opts.recover && opts.no_blanks);
    /// assert_eq!(opts.to_bits(), XML_PARSE_RECOVER | XML_PARSE_NOBLANKS);
    /// ```
    #[must_use]
    pub fn from_bits(bits: i32) -> Self {
        Self {
            recover: bits & XML_PARSE_RECOVER != 0,
            no_error: bits & XML_PARSE_NOERROR != 0,
            no_warning: bits & XML_PARSE_NOWARNING != 0,
            no_blanks: bits & XML_PARSE_NOBLANKS != 0,
            huge: bits & XML_PARSE_HUGE != 0,
            ..Self::default()
        }
    }

    /// Returns the legacy option mask for the flags these options carry.
    #[must_use]
    pub fn to_bits(&self) -> i32 {
        [
            (self.recover, XML_PARSE_RECOVER),
            (self.no_error, XML_PARSE_NOERROR),
            (self.no_warning, XML_PARSE_NOWARNING),
            (self.no_blanks, XML_PARSE_NOBLANKS),
            (self.huge, XML_PARSE_HUGE),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |bits, (_, bit)| bits | bit)
    }

    /// Enables or disables error recovery mode.
    #[must_use]
    pub fn recover(mut self, yes: bool) -> Self {
        self.recover = yes;
        self
    }

    /// Enables or disables reporting of recovered errors.
    #[must_use]
    pub fn no_error(mut self, yes: bool) -> Self {
        self.no_error = yes;
        self
    }

    /// Enables or disables reporting of warnings.
    #[must_use]
    pub fn no_warning(mut self, yes: bool) -> Self {
        self.no_warning = yes;
        self
    }

    /// Enables or disables stripping of blank text nodes.
    #[must_use]
    pub fn no_blanks(mut self, yes: bool) -> Self {
        self.no_blanks = yes;
        self
    }

    /// Enables or disables the huge limits.
    #[must_use]
    pub fn huge(mut self, yes: bool) -> Self {
        self.huge = yes;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    /// Caps the number of tree nodes.
    #[must_use]
    pub fn max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = Some(max);
        self
    }

    /// Forces the input encoding.
    #[must_use]
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Sets the base URL recorded on the document.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub(crate) fn effective_max_depth(&self) -> u32 {
        if self.huge {
            self.max_depth.max(HUGE_MAX_DEPTH)
        } else {
            self.max_depth
        }
    }

    pub(crate) fn effective_max_name_length(&self) -> usize {
        if self.huge {
            self.max_name_length.max(HUGE_MAX_NAME_LENGTH)
        } else {
            self.max_name_length
        }
    }
}

/// Parses an XML string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses an XML string with the given options.
///
/// The text is already decoded, so an encoding declaration is recorded on
/// the document but not applied.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML and recovery
/// mode is not enabled.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let mut ctx = ParserContext::new(options.clone())?;
    ctx.parse_str(input)?;
    finished_document(&mut ctx)
}

/// Parses raw bytes with default options, detecting the encoding.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_bytes(input: &[u8]) -> Result<Document, ParseError> {
    parse_bytes_with_options(input, &ParseOptions::default())
}

/// Parses raw bytes with the given options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML and recovery
/// mode is not enabled, or if `options.encoding` is not supported.
///
/// # Examples
///
/// ```
/// use libxml2_rs::parser::{parse_bytes_with_options, ParseOptions};
///
/// let opts = ParseOptions::default().recover(true);
/// let doc = parse_bytes_with_options(b"<a><b></a>", &opts).unwrap();
/// assert!(!doc.well_formed);
/// assert_eq!(doc.diagnostics.len(), 1);
/// ```
pub fn parse_bytes_with_options(input: &[u8], options: &ParseOptions) -> Result<Document, ParseError> {
    let mut ctx = ParserContext::new(options.clone())?;
    ctx.parse_bytes(input)?;
    finished_document(&mut ctx)
}

/// Parses everything `reader` yields, feeding it through a push context.
///
/// # Errors
///
/// Returns `ParseError` for malformed input and for read failures.
pub fn parse_reader<R: Read>(reader: R, options: &ParseOptions) -> Result<Document, ParseError> {
    let mut ctx = ParserContext::new_push(options.clone())?;
    read_into(&mut ctx, reader)?;
    finished_document(&mut ctx)
}

/// Feeds everything `reader` yields into `ctx` and terminates it.
pub(crate) fn read_into<R: Read>(ctx: &mut ParserContext<'_>, mut reader: R) -> Result<(), ParseError> {
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(context_error(
                    ctx,
                    XmlError::InvalidArgument(format!("read failed: {e}")),
                ))
            }
        };
        ctx.feed_chunk(&chunk[..n]).map_err(|e| context_error(ctx, e))?;
    }
    ctx.terminate().map_err(|e| context_error(ctx, e))
}

/// Parses a file. The path becomes the document URL unless
/// `options.base_url` is set.
///
/// # Errors
///
/// Returns `ParseError` if the file cannot be opened or is malformed.
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Document, ParseError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        ParseError::new(XmlError::InvalidArgument(format!(
            "cannot open {}: {e}",
            path.display()
        )))
    })?;
    let mut options = options.clone();
    if options.base_url.is_none() {
        options.base_url = Some(path.display().to_string());
    }
    log::debug!("parsing file {}", path.display());
    parse_reader(std::io::BufReader::new(file), &options)
}

fn context_error(ctx: &ParserContext<'_>, error: XmlError) -> ParseError {
    ParseError {
        error,
        diagnostics: ctx.diagnostics().to_vec(),
    }
}

pub(crate) fn finished_document(ctx: &mut ParserContext<'_>) -> Result<Document, ParseError> {
    ctx.take_document().ok_or_else(|| {
        ParseError::new(XmlError::InvalidArgument(
            "parser finished without a document".into(),
        ))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_option_bits_round_trip() {
        for bits in [
            0,
            XML_PARSE_RECOVER,
            XML_PARSE_NOERROR | XML_PARSE_NOWARNING,
            XML_PARSE_NOBLANKS | XML_PARSE_HUGE,
            XML_PARSE_RECOVER | XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NOBLANKS | XML_PARSE_HUGE,
        ] {
            assert_eq!(ParseOptions::from_bits(bits).to_bits(), bits);
        }
    }

    #[test]
    fn test_unknown_bits_ignored() {
        let opts = ParseOptions::from_bits(1 << 2 | 1 << 11 | XML_PARSE_RECOVER);
        assert_eq!(opts, ParseOptions::default().recover(true));
    }

    #[test]
    fn test_huge_lifts_limits() {
        let opts = ParseOptions::default().max_depth(10);
        assert_eq!(opts.effective_max_depth(), 10);
        assert_eq!(opts.clone().huge(true).effective_max_depth(), HUGE_MAX_DEPTH);
        assert_eq!(
            opts.huge(true).effective_max_name_length(),
            HUGE_MAX_NAME_LENGTH
        );
    }

    #[test]
    fn test_parse_str_and_bytes_agree() {
        let input = "<r a='1'><c>t</c><!--x--></r>";
        let a = parse_str(input).unwrap();
        let b = parse_bytes(input.as_bytes()).unwrap();
        assert_eq!(
            crate::tree::dump::debug_dump(&a),
            crate::tree::dump::debug_dump(&b)
        );
    }

    #[test]
    fn test_parse_reader() {
        let input = format!("<r>{}</r>", "<i>v</i>".repeat(5000));
        let doc = parse_reader(input.as_bytes(), &ParseOptions::default()).unwrap();
        let r = doc.root_element().unwrap();
        assert_eq!(doc.children(r).count(), 5000);
    }

    #[test]
    fn test_parse_reader_reports_diagnostics() {
        let err = parse_reader(&b"<r></x>"[..], &ParseOptions::default()).unwrap_err();
        assert!(matches!(err.error, XmlError::WellFormedness { .. }));
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/nonexistent/input.xml", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err.error, XmlError::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_file_sets_url() {
        let path = std::env::temp_dir().join("libxml2_rs_parse_file_test.xml");
        std::fs::write(&path, "<r/>").unwrap();
        let doc = parse_file(&path, &ParseOptions::default()).unwrap();
        assert_eq!(doc.url.as_deref(), Some(path.display().to_string().as_str()));
        std::fs::remove_file(&path).unwrap();
    }
}
