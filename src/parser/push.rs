//! Push/incremental XML parser.
//!
//! Provides a chunk-oriented parsing interface in the manner of libxml2's
//! push parser (`xmlCreatePushParserCtxt` / `xmlParseChunk`). Data can be
//! fed to the parser in arbitrarily sized chunks via [`PushParser::push`],
//! and the final document is obtained by calling [`PushParser::finish`].
//!
//! Each chunk is decoded, tokenized and applied to the tree as soon as it
//! arrives; only an incomplete trailing construct stays buffered. The tree
//! does not depend on where the chunk boundaries fall.
//!
//! # Examples
//!
//! ```
//! use libxml2_rs::parser::PushParser;
//!
//! let mut parser = PushParser::new();
//! parser.push(b"<root>").unwrap();
//! parser.push(b"<child>Hello</child>").unwrap();
//! parser.push(b"</root>").unwrap();
//!
//! let doc = parser.finish().unwrap();
//! let root = doc.root_element().unwrap();
//! assert_eq!(doc.node_name(root), Some("root"));
//! ```

use crate::error::{ParseError, XmlError};
use crate::parser::context::ParserContext;
use crate::parser::ParseOptions;
use crate::tree::Document;

/// A push-based (incremental) XML parser.
///
/// # Examples
///
/// With parse options:
///
/// ```
/// use libxml2_rs::parser::{ParseOptions, PushParser};
///
/// let opts = ParseOptions::default().recover(true);
/// let mut parser = PushParser::with_options(opts).unwrap();
/// parser.push(b"<root>").unwrap();
/// parser.push(b"</wrong>").unwrap();
///
/// let doc = parser.finish().unwrap();
/// assert!(doc.root_element().is_some());
/// assert!(!doc.well_formed);
/// ```
pub struct PushParser {
    ctx: ParserContext<'static>,
    /// Total bytes received via `push()`.
    pushed: usize,
}

impl PushParser {
    /// Creates a new push parser with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctx: ParserContext::from_default_options(),
            pushed: 0,
        }
    }

    /// Creates a new push parser with the specified options.
    ///
    /// # Errors
    ///
    /// Fails if `options.encoding` names an unsupported encoding.
    pub fn with_options(options: ParseOptions) -> Result<Self, XmlError> {
        Ok(Self {
            ctx: ParserContext::new_push(options)?,
            pushed: 0,
        })
    }

    /// Feeds a chunk of raw XML bytes into the parser.
    ///
    /// The chunk can be any size and may split tokens, elements, or even
    /// multi-byte characters at arbitrary boundaries.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error. After an error every further call
    /// fails until [`reset`](Self::reset).
    ///
    /// ```
    /// use libxml2_rs::parser::PushParser;
    ///
    /// let mut parser = PushParser::new();
    /// parser.push(b"<ro").unwrap();
    /// parser.push(b"ot/>").unwrap();
    /// let doc = parser.finish().unwrap();
    /// ```
    pub fn push(&mut self, data: &[u8]) -> Result<(), ParseError> {
        self.pushed += data.len();
        self.ctx.feed_chunk(data).map_err(|e| self.error(e))
    }

    /// Finalizes parsing and returns the constructed [`Document`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the data is not well-formed XML (unless
    /// recovery mode is enabled via [`ParseOptions::recover`]).
    pub fn finish(mut self) -> Result<Document, ParseError> {
        self.ctx.terminate().map_err(|e| self.error(e))?;
        self.ctx.take_document().ok_or_else(|| {
            ParseError::new(XmlError::InvalidArgument(
                "push parser produced no document".into(),
            ))
        })
    }

    /// Returns the number of bytes received but not yet parsed, such as an
    /// unterminated tag at the end of the last chunk.
    ///
    /// ```
    /// use libxml2_rs::parser::PushParser;
    ///
    /// let mut parser = PushParser::new();
    /// parser.push(b"<root><chi").unwrap();
    /// assert_eq!(parser.buffered_bytes(), 4);
    /// ```
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.ctx.buffered_bytes()
    }

    /// Returns `true` if no data has been pushed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pushed == 0
    }

    /// Resets the parser, discarding all input and the partial document.
    ///
    /// After calling this method, the parser is in the same state as a
    /// newly created one (with the same options).
    pub fn reset(&mut self) {
        self.ctx.reset();
        self.pushed = 0;
    }

    fn error(&self, error: XmlError) -> ParseError {
        ParseError {
            error,
            diagnostics: self.ctx.diagnostics().to_vec(),
        }
    }
}

impl Default for PushParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PushParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushParser")
            .field("pushed_bytes", &self.pushed)
            .field("buffered_bytes", &self.buffered_bytes())
            .field("state", &self.ctx.state())
            .finish()
    }
}
