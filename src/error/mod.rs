//! Error types and diagnostics for XML parsing.
//!
//! Every failure the core can produce falls into one of four classes,
//! modelled by [`XmlError`]:
//!
//! - [`XmlError::Syntax`]: the scanner cannot tokenize further.
//! - [`XmlError::WellFormedness`]: tree-level violations such as mismatched
//!   tags or an undeclared prefix.
//! - [`XmlError::OutOfMemory`]: the tree store could not allocate.
//! - [`XmlError::InvalidArgument`]: a caller broke an ABI contract.
//!
//! The parser supports **recovery mode**: syntax and well-formedness errors
//! are collected into a `Vec<ParseDiagnostic>` while a (possibly partial)
//! tree is still produced.

use std::fmt;

/// Severity level for a parse diagnostic, matching libxml2's `xmlErrorLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A non-fatal issue that doesn't prevent parsing.
    Warning,
    /// A recoverable error: the document is malformed but parsing can continue.
    Error,
    /// An unrecoverable error. Parsing stops.
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the decoded input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The construct the scanner expected when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SyntaxKind {
    /// An XML name (element, attribute, PI target or entity name).
    #[error("a name")]
    Name,
    /// The `>` or `/>` closing a start tag.
    #[error("'>' closing the tag")]
    TagClose,
    /// The `>` closing an end tag.
    #[error("'>' closing the end tag")]
    EndTagClose,
    /// A quoted attribute value.
    #[error("a quoted attribute value")]
    AttributeValue,
    /// The `=` between an attribute name and its value.
    #[error("'=' after the attribute name")]
    Equals,
    /// Whitespace between attributes.
    #[error("whitespace between attributes")]
    Whitespace,
    /// The `-->` closing a comment (or a `--` inside one).
    #[error("'-->' closing the comment")]
    CommentClose,
    /// The `]]>` closing a CDATA section.
    #[error("']]>' closing the CDATA section")]
    CDataClose,
    /// The `?>` closing a processing instruction.
    #[error("'?>' closing the processing instruction")]
    PiClose,
    /// A well-formed `<!DOCTYPE ...>` declaration.
    #[error("a DOCTYPE declaration")]
    Doctype,
    /// Markup after `<!` that is neither a comment, CDATA nor DOCTYPE.
    #[error("a comment, CDATA section or DOCTYPE")]
    MarkupDecl,
    /// A `&name;` or `&#NN;` reference terminated by `;`.
    #[error("a character or entity reference")]
    Reference,
    /// A character reference naming a legal XML character.
    #[error("a valid character reference")]
    CharRef,
    /// A character allowed by the XML `Char` production.
    #[error("a legal XML character")]
    Char,
    /// A valid UTF-8 sequence (after transcoding).
    #[error("valid UTF-8")]
    Utf8,
    /// A well-formed XML declaration.
    #[error("a well-formed XML declaration")]
    XmlDecl,
    /// More input; the document ended inside a construct.
    #[error("more input")]
    Eof,
}

/// The error taxonomy shared by every layer of the parsing core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    /// The scanner could not tokenize the input any further.
    #[error("syntax error at byte {offset}: expected {kind}")]
    Syntax {
        /// Byte offset (in the decoded stream) where scanning stopped.
        offset: usize,
        /// The construct the scanner expected.
        kind: SyntaxKind,
    },
    /// A tree-level well-formedness violation.
    #[error("{message} at {location}")]
    WellFormedness {
        /// Human-readable description.
        message: String,
        /// Where the offending construct started.
        location: SourceLocation,
    },
    /// The tree store could not allocate a record.
    #[error("out of memory")]
    OutOfMemory,
    /// A caller violated an interface contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl XmlError {
    /// Builds a well-formedness error.
    pub fn well_formedness(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::WellFormedness {
            message: message.into(),
            location,
        }
    }

    /// Returns `true` for the classes that recovery mode may continue past.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::WellFormedness { .. })
    }
}

/// A single diagnostic emitted during parsing.
///
/// Diagnostics are collected when the parser operates in recovery mode,
/// allowing it to produce a partial tree even when the input is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable error message.
    pub message: String,
    /// Where in the source this error occurred.
    pub location: SourceLocation,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}",
            self.severity, self.message, self.location
        )
    }
}

/// The error type returned when a whole parse fails.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The error that aborted the parse.
    pub error: XmlError,
    /// All diagnostics collected before the fatal error.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParseError {
    /// Wraps an error with no accompanying diagnostics.
    #[must_use]
    pub fn new(error: XmlError) -> Self {
        Self {
            error,
            diagnostics: Vec::new(),
        }
    }

    /// Returns the primary error message.
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl From<XmlError> for ParseError {
    fn from(error: XmlError) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.error)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            line: 10,
            column: 5,
            byte_offset: 42,
        };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_syntax_error_display() {
        let err = XmlError::Syntax {
            offset: 14,
            kind: SyntaxKind::CommentClose,
        };
        assert_eq!(
            err.to_string(),
            "syntax error at byte 14: expected '-->' closing the comment"
        );
    }

    #[test]
    fn test_well_formedness_display() {
        let err = XmlError::well_formedness(
            "mismatched end tag",
            SourceLocation {
                line: 1,
                column: 8,
                byte_offset: 7,
            },
        );
        assert_eq!(err.to_string(), "mismatched end tag at 1:8");
        assert!(err.is_recoverable());
        assert!(!XmlError::OutOfMemory.is_recoverable());
    }

    #[test]
    fn test_parse_diagnostic_display() {
        let diag = ParseDiagnostic {
            severity: ErrorSeverity::Warning,
            message: "attribute value not quoted".to_string(),
            location: SourceLocation {
                line: 3,
                column: 10,
                byte_offset: 50,
            },
        };
        assert_eq!(
            diag.to_string(),
            "warning: attribute value not quoted at 3:10"
        );
    }

    #[test]
    fn test_error_severity_display() {
        assert_eq!(ErrorSeverity::Warning.to_string(), "warning");
        assert_eq!(ErrorSeverity::Error.to_string(), "error");
        assert_eq!(ErrorSeverity::Fatal.to_string(), "fatal error");
    }

    #[test]
    fn test_parse_error_is_error_trait() {
        let err = ParseError::new(XmlError::InvalidArgument("negative size".into()));
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.source().is_some());
        assert_eq!(err.to_string(), "parse error: invalid argument: negative size");
    }
}
