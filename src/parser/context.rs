//! The parser context: one parse, one-shot or pushed in chunks.
//!
//! A [`ParserContext`] owns the input decoder, the resumable scanner and the
//! tree builder of a single parse and moves through the states of
//! [`ParserState`]:
//!
//! ```text
//! Ready --feed/parse--> Parsing --terminate--> Finished
//!   |                    |   ^
//!   |                    |   | resume
//!   |                    v   |
//!   +-----stop-------> Stopped
//!
//! any error outside recovery mode --> Error
//! ```
//!
//! Once `Finished` or `Error`, only [`ParserContext::reset`] makes the
//! context usable again.

use std::fmt;

use crate::encoding::{EncodingError, InputDecoder};
use crate::error::{ParseDiagnostic, ParseError, SourceLocation, SyntaxKind, XmlError};
use crate::parser::builder::TreeBuilder;
use crate::parser::scanner::{Scan, Scanner};
use crate::parser::ParseOptions;
use crate::sax::SaxHandler;
use crate::tree::Document;

/// Lifecycle state of a [`ParserContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// Created or reset; no input seen.
    Ready,
    /// Input is being consumed.
    Parsing,
    /// Suspended by [`ParserContext::stop`]; input is refused until
    /// [`ParserContext::resume`].
    Stopped,
    /// The end of input was processed.
    Finished,
    /// A fatal error ended the parse.
    Error,
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Parsing => "parsing",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
            Self::Error => "in error",
        };
        f.write_str(name)
    }
}

/// State of one parse.
///
/// # Examples
///
/// ```
/// use libxml2_rs::parser::{ParseOptions, ParserContext, ParserState};
///
/// let mut ctx = ParserContext::new_push(ParseOptions::default()).unwrap();
/// ctx.feed_chunk(b"<greeting>hel").unwrap();
/// ctx.feed_chunk(b"lo</greeting>").unwrap();
/// ctx.terminate().unwrap();
/// assert_eq!(ctx.state(), ParserState::Finished);
///
/// let doc = ctx.take_document().unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.text_content(root), "hello");
/// ```
pub struct ParserContext<'h> {
    options: ParseOptions,
    state: ParserState,
    push: bool,
    decoder: InputDecoder,
    scanner: Scanner,
    builder: Option<TreeBuilder<'h>>,
    /// The SAX handler while no builder exists.
    parked_sax: Option<&'h mut dyn SaxHandler>,
    /// Diagnostics of a document that was taken or dropped.
    saved_diagnostics: Vec<ParseDiagnostic>,
    well_formed: bool,
    error: Option<XmlError>,
    scratch: String,
}

impl ParserContext<'static> {
    /// Creates a context for a one-shot parse.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `options.encoding` names an
    /// unsupported encoding.
    pub fn new(options: ParseOptions) -> Result<Self, XmlError> {
        Self::build(options, None, false)
    }

    /// Creates a context that is fed with [`feed_chunk`](Self::feed_chunk).
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `options.encoding` names an
    /// unsupported encoding.
    pub fn new_push(options: ParseOptions) -> Result<Self, XmlError> {
        Self::build(options, None, true)
    }

    /// A push context with default options, which cannot fail.
    pub(crate) fn from_default_options() -> Self {
        Self::assemble(ParseOptions::default(), InputDecoder::default(), None, true)
    }
}

impl<'h> ParserContext<'h> {
    /// Creates a context that notifies `handler` of every construct.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `options.encoding` names an
    /// unsupported encoding.
    pub fn with_sax(options: ParseOptions, handler: &'h mut dyn SaxHandler) -> Result<Self, XmlError> {
        Self::build(options, Some(handler), true)
    }

    fn build(
        options: ParseOptions,
        sax: Option<&'h mut dyn SaxHandler>,
        push: bool,
    ) -> Result<Self, XmlError> {
        let decoder = InputDecoder::new(options.encoding.as_deref())
            .map_err(|e| XmlError::InvalidArgument(e.to_string()))?;
        Ok(Self::assemble(options, decoder, sax, push))
    }

    fn assemble(
        options: ParseOptions,
        decoder: InputDecoder,
        sax: Option<&'h mut dyn SaxHandler>,
        push: bool,
    ) -> Self {
        let builder = TreeBuilder::new(&options, sax);
        Self {
            options,
            state: ParserState::Ready,
            push,
            decoder,
            scanner: Scanner::new(),
            builder: Some(builder),
            parked_sax: None,
            saved_diagnostics: Vec::new(),
            well_formed: true,
            error: None,
            scratch: String::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// The options this context parses with.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Returns `true` if no error has been seen so far.
    #[must_use]
    pub fn well_formed(&self) -> bool {
        match &self.builder {
            Some(builder) => self.well_formed && builder.document().well_formed,
            None => self.well_formed,
        }
    }

    /// The fatal error that moved the context to [`ParserState::Error`].
    #[must_use]
    pub fn error(&self) -> Option<&XmlError> {
        self.error.as_ref()
    }

    /// Diagnostics recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        match &self.builder {
            Some(builder) => &builder.document().diagnostics,
            None => &self.saved_diagnostics,
        }
    }

    /// The document under construction, if it has not been taken or
    /// dropped.
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.builder.as_ref().map(TreeBuilder::document)
    }

    /// Bytes received but not yet turned into tree nodes.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.scanner.buffered() + self.decoder.pending_bytes()
    }

    /// Parses a complete document held in memory.
    ///
    /// # Errors
    ///
    /// Returns the fatal error together with the diagnostics recorded
    /// before it.
    pub fn parse_bytes(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        self.expect_ready()?;
        self.feed_chunk(bytes)
            .and_then(|()| self.terminate())
            .map_err(|e| self.parse_error(e))
    }

    /// Parses a complete document that is already decoded. Any encoding
    /// declaration is recorded but not applied.
    ///
    /// # Errors
    ///
    /// Returns the fatal error together with the diagnostics recorded
    /// before it.
    pub fn parse_str(&mut self, text: &str) -> Result<(), ParseError> {
        self.expect_ready()?;
        self.begin("parse_str")
            .and_then(|()| {
                let result = self.consume_text(text);
                self.settle(result)
            })
            .and_then(|()| self.terminate())
            .map_err(|e| self.parse_error(e))
    }

    /// Feeds the next chunk of raw input.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] without touching the context
    /// when it is stopped, finished or in error. Other errors are fatal
    /// parse errors and leave the context in [`ParserState::Error`].
    pub fn feed_chunk(&mut self, bytes: &[u8]) -> Result<(), XmlError> {
        self.begin("feed_chunk")?;
        let result = self.consume_bytes(bytes, false);
        self.settle(result)
    }

    /// Signals the end of input and completes the document.
    ///
    /// # Errors
    ///
    /// Same as [`feed_chunk`](Self::feed_chunk); in addition unclosed
    /// elements and a missing root element are reported here.
    pub fn terminate(&mut self) -> Result<(), XmlError> {
        self.begin("terminate")?;
        let mut result = self.consume_bytes(&[], true);
        if result.is_ok() {
            if let Some(builder) = self.builder.as_mut() {
                result = builder.finish(self.scanner.location());
            }
        }
        self.settle(result)?;
        self.transition(ParserState::Finished);
        Ok(())
    }

    /// Suspends a parse. Later chunks are refused until [`resume`](Self::resume).
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] unless the context is ready
    /// or parsing.
    pub fn stop(&mut self) -> Result<(), XmlError> {
        match self.state {
            ParserState::Ready | ParserState::Parsing => {
                self.transition(ParserState::Stopped);
                Ok(())
            }
            other => Err(XmlError::InvalidArgument(format!(
                "cannot stop a parser that is {other}"
            ))),
        }
    }

    /// Continues a stopped parse.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] unless the context is stopped.
    pub fn resume(&mut self) -> Result<(), XmlError> {
        if self.state != ParserState::Stopped {
            return Err(XmlError::InvalidArgument(format!(
                "cannot resume a parser that is {}",
                self.state
            )));
        }
        self.transition(ParserState::Parsing);
        Ok(())
    }

    /// Hands the document to the caller.
    ///
    /// Available once finished, or while stopped (a partial tree). Returns
    /// `None` in every other state and after the document was taken.
    pub fn take_document(&mut self) -> Option<Document> {
        if !matches!(self.state, ParserState::Finished | ParserState::Stopped) {
            return None;
        }
        let builder = self.builder.take()?;
        let (doc, sax) = builder.into_parts();
        self.parked_sax = sax;
        self.well_formed = doc.well_formed;
        self.saved_diagnostics.clone_from(&doc.diagnostics);
        Some(doc)
    }

    /// Returns the context to [`ParserState::Ready`] with the same options,
    /// discarding any input, document and error.
    pub fn reset(&mut self) {
        let sax = match self.builder.take() {
            Some(builder) => builder.into_parts().1,
            None => self.parked_sax.take(),
        };
        self.builder = Some(TreeBuilder::new(&self.options, sax));
        self.decoder.reset();
        self.scanner = Scanner::new();
        self.saved_diagnostics.clear();
        self.well_formed = true;
        self.error = None;
        self.transition(ParserState::Ready);
    }

    /// Resets the context and replaces its options.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] for an unsupported encoding
    /// override; the context is then left unchanged.
    pub fn reset_with(&mut self, options: ParseOptions) -> Result<(), XmlError> {
        let decoder = InputDecoder::new(options.encoding.as_deref())
            .map_err(|e| XmlError::InvalidArgument(e.to_string()))?;
        self.options = options;
        self.decoder = decoder;
        self.reset();
        Ok(())
    }

    fn expect_ready(&self) -> Result<(), ParseError> {
        if self.state == ParserState::Ready {
            Ok(())
        } else {
            Err(ParseError::new(XmlError::InvalidArgument(format!(
                "parser context is {}, reset it before parsing again",
                self.state
            ))))
        }
    }

    fn begin(&mut self, operation: &str) -> Result<(), XmlError> {
        match self.state {
            ParserState::Ready => {
                self.transition(ParserState::Parsing);
                Ok(())
            }
            ParserState::Parsing => Ok(()),
            other => Err(XmlError::InvalidArgument(format!(
                "{operation} on a parser that is {other}"
            ))),
        }
    }

    fn transition(&mut self, next: ParserState) {
        if self.state != next {
            log::debug!(
                "parser context {} -> {next} ({} mode)",
                self.state,
                if self.push { "push" } else { "one-shot" }
            );
            self.state = next;
        }
    }

    fn consume_bytes(&mut self, bytes: &[u8], last: bool) -> Result<(), XmlError> {
        let Some(builder) = self.builder.as_mut() else {
            return Ok(());
        };
        if builder.is_halted() {
            return Ok(());
        }
        let mut text = std::mem::take(&mut self.scratch);
        text.clear();
        let decoded = self.decoder.decode(bytes, last, &mut text);
        let result = match decoded {
            Ok(()) => {
                self.scanner.feed(&text);
                if last {
                    self.scanner.finish();
                }
                drain(&mut self.scanner, builder)
            }
            Err(err) => builder.report_halting(encoding_error(err)),
        };
        self.scratch = text;
        result
    }

    fn consume_text(&mut self, text: &str) -> Result<(), XmlError> {
        let Some(builder) = self.builder.as_mut() else {
            return Ok(());
        };
        self.scanner.feed(text);
        drain(&mut self.scanner, builder)
    }

    /// Moves to [`ParserState::Error`] on a fatal error, dropping the
    /// document but keeping its diagnostics.
    fn settle(&mut self, result: Result<(), XmlError>) -> Result<(), XmlError> {
        let Err(err) = result else {
            return Ok(());
        };
        log::debug!("parse failed: {err}");
        if let Some(builder) = self.builder.take() {
            let (doc, sax) = builder.into_parts();
            self.saved_diagnostics = doc.diagnostics;
            self.parked_sax = sax;
        }
        self.well_formed = false;
        self.error = Some(err.clone());
        self.transition(ParserState::Error);
        Err(err)
    }

    fn parse_error(&self, error: XmlError) -> ParseError {
        ParseError {
            error,
            diagnostics: self.diagnostics().to_vec(),
        }
    }
}

/// Applies every complete token to the builder. A syntax error stops
/// scanning for good; in recovery mode the tree built so far survives.
fn drain(scanner: &mut Scanner, builder: &mut TreeBuilder<'_>) -> Result<(), XmlError> {
    while !builder.is_halted() {
        match scanner.next_token() {
            Ok(Scan::Token(token)) => builder.process(token)?,
            Ok(Scan::NeedMore | Scan::End) => break,
            Err(err) => builder.report_halting(err)?,
        }
    }
    Ok(())
}

fn encoding_error(err: EncodingError) -> XmlError {
    match err {
        EncodingError::Malformed { offset, .. } => XmlError::Syntax {
            offset,
            kind: SyntaxKind::Utf8,
        },
        EncodingError::Unsupported(name) => XmlError::well_formedness(
            format!("Unsupported encoding: {name}"),
            SourceLocation {
                line: 1,
                column: 1,
                byte_offset: 0,
            },
        ),
    }
}

impl fmt::Debug for ParserContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserContext")
            .field("state", &self.state)
            .field("push", &self.push)
            .field("buffered_bytes", &self.buffered_bytes())
            .field("well_formed", &self.well_formed())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
