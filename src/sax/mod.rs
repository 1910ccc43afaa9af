//! SAX2 streaming event handler API.
//!
//! SAX (Simple API for XML) is a streaming, event-driven API for processing
//! XML. The parser fires callbacks as it encounters elements, text,
//! comments, and other XML constructs. A handler can also ask the parser
//! not to build a tree at all, which keeps memory flat for large inputs.
//!
//! Events come from the same tree builder that constructs documents, so a
//! SAX parse and a tree parse see exactly the same namespace resolution and
//! error handling.
//!
//! # Examples
//!
//! Counting elements without building a tree:
//!
//! ```
//! use libxml2_rs::parser::ParseOptions;
//! use libxml2_rs::sax::{parse_sax_document, SaxHandler};
//!
//! struct Count(usize);
//!
//! impl SaxHandler for Count {
//!     fn start_element(
//!         &mut self,
//!         _local: &str,
//!         _prefix: Option<&str>,
//!         _ns: Option<&str>,
//!         _attrs: &[(String, String, Option<String>, Option<String>)],
//!     ) {
//!         self.0 += 1;
//!     }
//!
//!     fn build_tree(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let mut count = Count(0);
//! let doc = parse_sax_document(b"<r><a/><b/></r>", &ParseOptions::default(), &mut count).unwrap();
//! assert_eq!(count.0, 3);
//! assert!(doc.root_element().is_none());
//! ```

use crate::error::{ParseError, SourceLocation, XmlError};
use crate::parser::{ParseOptions, ParserContext};
use crate::tree::Document;

/// A SAX2 event handler trait.
///
/// Implement the callbacks you care about; all methods have default no-op
/// implementations so you only need to override what you need.
///
/// # Attribute tuples
///
/// Attributes are passed as `(local_name, value, prefix, namespace_uri)` tuples.
/// Namespace declarations are not attributes; they are reported through
/// [`namespace_declaration`](SaxHandler::namespace_declaration) before the
/// element that carries them.
#[allow(unused_variables)]
pub trait SaxHandler {
    /// Called at the start of the document, before any other events.
    fn start_document(&mut self) {}

    /// Called at the end of the document, after all other events.
    fn end_document(&mut self) {}

    /// Called for the `<?xml ...?>` declaration.
    fn xml_declaration(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {}

    /// Called for each `xmlns` / `xmlns:prefix` declaration. `prefix` is
    /// `None` for the default namespace and `uri` is empty for `xmlns=""`.
    fn namespace_declaration(&mut self, prefix: Option<&str>, uri: &str) {}

    /// Called when an element start tag is encountered.
    ///
    /// `attributes` contains `(local_name, value, prefix, namespace_uri)` tuples.
    fn start_element(
        &mut self,
        local_name: &str,
        prefix: Option<&str>,
        namespace: Option<&str>,
        attributes: &[(String, String, Option<String>, Option<String>)],
    ) {
    }

    /// Called when an element end tag is encountered (or a self-closing tag ends).
    fn end_element(&mut self, local_name: &str, prefix: Option<&str>, namespace: Option<&str>) {}

    /// Called for character data (text content).
    fn characters(&mut self, content: &str) {}

    /// Called for CDATA sections.
    fn cdata(&mut self, content: &str) {}

    /// Called for XML comments.
    fn comment(&mut self, content: &str) {}

    /// Called for processing instructions.
    fn processing_instruction(&mut self, target: &str, data: Option<&str>) {}

    /// Called for a reference to an entity other than the predefined ones.
    fn entity_reference(&mut self, name: &str) {}

    /// Called when a warning is encountered during parsing.
    fn warning(&mut self, message: &str, location: SourceLocation) {}

    /// Called when a recoverable error is encountered during parsing.
    fn error(&mut self, message: &str, location: SourceLocation) {}

    /// Whether the parser should build a tree alongside the events.
    fn build_tree(&self) -> bool {
        true
    }
}

/// A default no-op SAX handler. Useful as a base or for testing.
pub struct DefaultHandler;

impl SaxHandler for DefaultHandler {}

/// Parses XML from a string, firing SAX events on the provided handler.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML and recovery
/// mode is not enabled.
///
/// # Examples
///
/// ```
/// use libxml2_rs::sax::{parse_sax, DefaultHandler};
/// use libxml2_rs::parser::ParseOptions;
///
/// let mut handler = DefaultHandler;
/// parse_sax("<root/>", &ParseOptions::default(), &mut handler).unwrap();
/// ```
pub fn parse_sax(
    input: &str,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<(), ParseError> {
    let mut ctx = ParserContext::with_sax(options.clone(), handler)?;
    ctx.parse_str(input)
}

/// Parses raw bytes, firing SAX events, and returns the document that was
/// built alongside. The document holds only the document node when the
/// handler declines tree building.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML and recovery
/// mode is not enabled.
pub fn parse_sax_document(
    input: &[u8],
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<Document, ParseError> {
    let mut ctx = ParserContext::with_sax(options.clone(), handler)?;
    ctx.parse_bytes(input)?;
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

    // --- Test handler that records events ---

    #[derive(Debug, Default)]
    struct RecordingHandler {
        events: Vec<String>,
    }

    impl SaxHandler for RecordingHandler {
        fn start_document(&mut self) {
            self.events.push("start_document".to_string());
        }

        fn end_document(&mut self) {
            self.events.push("end_document".to_string());
        }

        fn start_element(
            &mut self,
            local_name: &str,
            prefix: Option<&str>,
            namespace: Option<&str>,
            attributes: &[(String, String, Option<String>, Option<String>)],
        ) {
            use std::fmt::Write;
            let mut event = format!("start_element({local_name}");
            if let Some(pfx) = prefix {
                let _ = write!(event, ", prefix={pfx}");
            }
            if let Some(ns) = namespace {
                let _ = write!(event, ", ns={ns}");
            }
            for (name, value, _, _) in attributes {
                let _ = write!(event, ", {name}={value}");
            }
            event.push(')');
            self.events.push(event);
        }

        fn end_element(
            &mut self,
            local_name: &str,
            prefix: Option<&str>,
            _namespace: Option<&str>,
        ) {
            let event = match prefix {
                Some(pfx) => format!("end_element({pfx}:{local_name})"),
                None => format!("end_element({local_name})"),
            };
            self.events.push(event);
        }

        fn xml_declaration(
            &mut self,
            version: &str,
            encoding: Option<&str>,
            _standalone: Option<bool>,
        ) {
            self.events.push(format!(
                "xml_declaration({version}, {})",
                encoding.unwrap_or_default()
            ));
        }

        fn characters(&mut self, content: &str) {
            self.events.push(format!("characters({content})"));
        }

        fn cdata(&mut self, content: &str) {
            self.events.push(format!("cdata({content})"));
        }

        fn comment(&mut self, content: &str) {
            self.events.push(format!("comment({content})"));
        }

        fn processing_instruction(&mut self, target: &str, data: Option<&str>) {
            match data {
                Some(d) => self.events.push(format!("pi({target}, {d})")),
                None => self.events.push(format!("pi({target})")),
            }
        }

        fn namespace_declaration(&mut self, prefix: Option<&str>, uri: &str) {
            self.events
                .push(format!("ns({}, {uri})", prefix.unwrap_or_default()));
        }

        fn entity_reference(&mut self, name: &str) {
            self.events.push(format!("entity_reference({name})"));
        }

        fn warning(&mut self, message: &str, _location: SourceLocation) {
            self.events.push(format!("warning({message})"));
        }

        fn error(&mut self, message: &str, _location: SourceLocation) {
            self.events.push(format!("error({message})"));
        }
    }

    fn parse_events(input: &str) -> Vec<String> {
        let mut handler = RecordingHandler::default();
        parse_sax(input, &ParseOptions::default(), &mut handler).unwrap();
        handler.events
    }

    #[test]
    fn test_sax_event_sequences() {
        let cases: &[(&str, &[&str])] = &[
            ("<root/>", &["start_element(root)", "end_element(root)"]),
            (
                "<p>Hello <b>world</b>!</p>",
                &[
                    "start_element(p)",
                    "characters(Hello )",
                    "start_element(b)",
                    "characters(world)",
                    "end_element(b)",
                    "characters(!)",
                    "end_element(p)",
                ],
            ),
            (
                "<root id=\"1\" class='big'/>",
                &["start_element(root, id=1, class=big)", "end_element(root)"],
            ),
            (
                "<r><!-- hi --><![CDATA[raw & data]]>&amp;&lt;</r>",
                &[
                    "start_element(r)",
                    "comment( hi )",
                    "cdata(raw & data)",
                    "characters(&<)",
                    "end_element(r)",
                ],
            ),
            (
                "<?xml version='1.0' encoding='UTF-8'?><?t d?><!DOCTYPE r><r/>",
                &[
                    "xml_declaration(1.0, UTF-8)",
                    "pi(t, d)",
                    "start_element(r)",
                    "end_element(r)",
                ],
            ),
            (
                "<root xmlns='urn:d'><child/></root>",
                &[
                    "ns(, urn:d)",
                    "start_element(root, ns=urn:d)",
                    "start_element(child, ns=urn:d)",
                    "end_element(child)",
                    "end_element(root)",
                ],
            ),
            (
                "<n:root xmlns:n='urn:n'/>",
                &[
                    "ns(n, urn:n)",
                    "start_element(root, prefix=n, ns=urn:n)",
                    "end_element(n:root)",
                ],
            ),
        ];
        for (input, expected) in cases {
            let mut want = vec!["start_document"];
            want.extend_from_slice(expected);
            want.push("end_document");
            assert_eq!(parse_events(input), want, "events for {input}");
        }
    }

    #[test]
    fn test_sax_error_mismatched_tags() {
        let mut handler = DefaultHandler;
        let result = parse_sax("<a></b>", &ParseOptions::default(), &mut handler);
        assert!(result.is_err());
    }

    #[test]
    fn test_sax_entity_reference_event() {
        let events = parse_events("<!DOCTYPE r [<!ENTITY e 'x'>]><r>a&e;b</r>");
        assert_eq!(
            events,
            vec![
                "start_document",
                "start_element(r)",
                "characters(a)",
                "entity_reference(e)",
                "characters(b)",
                "end_element(r)",
                "end_document",
            ]
        );
    }

    #[test]
    fn test_sax_recovered_error_event() {
        let mut handler = RecordingHandler::default();
        parse_sax(
            "<a></b></a>",
            &ParseOptions::default().recover(true),
            &mut handler,
        )
        .unwrap();
        assert!(handler
            .events
            .iter()
            .any(|e| e.starts_with("error(Opening and ending tag mismatch")));
        assert_eq!(handler.events.last().map(String::as_str), Some("end_document"));
    }

    #[test]
    fn test_sax_no_error_suppresses_callback() {
        let mut handler = RecordingHandler::default();
        let options = ParseOptions::default().recover(true).no_error(true);
        parse_sax("<a></b></a>", &options, &mut handler).unwrap();
        assert!(!handler.events.iter().any(|e| e.starts_with("error(")));
    }

    #[test]
    fn test_sax_without_tree() {
        struct Streaming {
            elements: usize,
        }
        impl SaxHandler for Streaming {
            fn start_element(
                &mut self,
                _local_name: &str,
                _prefix: Option<&str>,
                _namespace: Option<&str>,
                _attributes: &[(String, String, Option<String>, Option<String>)],
            ) {
                self.elements += 1;
            }
            fn build_tree(&self) -> bool {
                false
            }
        }

        let mut handler = Streaming { elements: 0 };
        let doc = parse_sax_document(
            b"<p:r xmlns:p='urn:p'><p:c/><c/></p:r>",
            &ParseOptions::default(),
            &mut handler,
        )
        .unwrap();
        assert_eq!(handler.elements, 3);
        assert_eq!(doc.root_element(), None);
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_sax_attribute_namespaces() {
        struct Attrs(Vec<(String, Option<String>)>);
        impl SaxHandler for Attrs {
            fn start_element(
                &mut self,
                _local_name: &str,
                _prefix: Option<&str>,
                _namespace: Option<&str>,
                attributes: &[(String, String, Option<String>, Option<String>)],
            ) {
                for (local, _, _, ns) in attributes {
                    self.0.push((local.clone(), ns.clone()));
                }
            }
        }

        let mut handler = Attrs(Vec::new());
        parse_sax(
            "<r xmlns='urn:d' xmlns:p='urn:p' a='1' p:b='2' xml:lang='en'/>",
            &ParseOptions::default(),
            &mut handler,
        )
        .unwrap();
        assert_eq!(
            handler.0,
            vec![
                ("a".to_string(), None),
                ("b".to_string(), Some("urn:p".to_string())),
                (
                    "lang".to_string(),
                    Some("http://www.w3.org/XML/1998/namespace".to_string())
                ),
            ]
        );
    }
}
