//! Namespace scoping during tree construction.
//!
//! Maintains a stack of binding frames that mirrors the element nesting.
//! Each frame holds the `xmlns` declarations introduced on one element.
//! Resolution walks the frames innermost-first.
//!
//! Bindings carry the namespace record created for the declaration, so
//! every element in the scope of one declaration resolves to the same
//! [`NsId`]. The `xml` prefix needs no declaration: it resolves to the
//! document's cached record.

use crate::error::XmlError;
use crate::tree::{Document, NsId, XML_NAMESPACE};

#[derive(Debug, Clone)]
struct Binding {
    /// `None` for the default namespace.
    prefix: Option<String>,
    /// `None` for an `xmlns=""` unbinding.
    href: Option<String>,
    /// The declaration's record, absent when no tree is being built.
    record: Option<NsId>,
}

/// The result of resolving a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution<'a> {
    /// Bound to a namespace URI.
    Bound {
        /// The namespace record, if a tree is being built.
        record: Option<NsId>,
        /// The namespace URI.
        href: &'a str,
    },
    /// No namespace: the default namespace was never declared or was
    /// unbound with `xmlns=""`.
    NoNamespace,
    /// A non-default prefix with no declaration in scope.
    Undeclared,
}

/// Stack of prefix bindings scoped to the open-element chain.
#[derive(Debug, Default)]
pub(crate) struct NamespaceResolver {
    bindings: Vec<Binding>,
    /// Index into `bindings` where each open frame starts.
    frames: Vec<usize>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the frame of a newly started element.
    pub fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    /// Closes the innermost frame, dropping its bindings.
    pub fn pop_frame(&mut self) {
        if let Some(start) = self.frames.pop() {
            self.bindings.truncate(start);
        }
    }

    /// Number of open frames.
    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Binds `prefix` in the innermost frame. An `href` of `None` with no
    /// prefix records an explicit unbinding of the default namespace.
    pub fn bind(&mut self, prefix: Option<&str>, href: Option<&str>, record: Option<NsId>) {
        self.bindings.push(Binding {
            prefix: prefix.map(str::to_string),
            href: href.filter(|h| !h.is_empty()).map(str::to_string),
            record,
        });
    }

    /// Resolves `prefix` (`None` for the default namespace).
    ///
    /// The `xml` prefix resolves to the document's cached record, which is
    /// created on first use when `doc` is given.
    pub fn resolve(
        &self,
        doc: Option<&mut Document>,
        prefix: Option<&str>,
    ) -> Result<Resolution<'_>, XmlError> {
        if prefix == Some("xml") {
            let record = doc.map(Document::xml_namespace).transpose()?;
            return Ok(Resolution::Bound {
                record,
                href: XML_NAMESPACE,
            });
        }
        let found = self
            .bindings
            .iter()
            .rev()
            .find(|b| b.prefix.as_deref() == prefix);
        Ok(match found {
            Some(Binding {
                href: Some(href),
                record,
                ..
            }) => Resolution::Bound {
                record: *record,
                href: href.as_str(),
            },
            Some(_) => Resolution::NoNamespace,
            None if prefix.is_none() => Resolution::NoNamespace,
            None => Resolution::Undeclared,
        })
    }
}
