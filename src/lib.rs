//! # libxml2-rs
//!
//! The parsing and tree-construction core of libxml2, in Rust: bytes in,
//! a namespace-resolved document tree out. The same tree is produced for
//! one-shot and arbitrarily chunked input, and the legacy C ABI
//! (`xmlReadMemory`, `xmlParseChunk`, `xmlFreeDoc`, ...) is exported from
//! the [`ffi`] module.
//!
//! ## Quick Start
//!
//! ```
//! use libxml2_rs::Document;
//!
//! let doc = Document::parse_str("<root xmlns='urn:x'><child>Hello</child></root>").unwrap();
//! let root = doc.root_element().unwrap();
//! assert_eq!(doc.node_name(root), Some("root"));
//! assert_eq!(doc.node_namespace(root), Some("urn:x"));
//! ```
//!
//! ## Push parsing
//!
//! ```
//! use libxml2_rs::parser::{ParseOptions, ParserContext};
//!
//! let mut ctx = ParserContext::new_push(ParseOptions::default()).unwrap();
//! ctx.feed_chunk(b"<a><b/>").unwrap();
//! ctx.feed_chunk(b"</a>").unwrap();
//! ctx.terminate().unwrap();
//! let doc = ctx.take_document().unwrap();
//! assert!(doc.well_formed);
//! ```

pub mod encoding;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod parser;
pub mod sax;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use error::{ParseError, XmlError};
pub use parser::{ParseOptions, ParserContext, ParserState};
pub use tree::{Document, NodeId};
