//! Tree construction from scanner tokens.
//!
//! The builder keeps an explicit stack of open elements and a
//! [`NamespaceResolver`] frame per open element. For each start tag it
//! splits the raw attribute text, separates `xmlns` declarations from
//! regular attributes, creates the element, records its declarations in
//! `ns_defs`, resolves the element's own namespace and then resolves and
//! attaches the regular attributes against the updated scope.
//!
//! Well-formedness problems go through [`TreeBuilder::report`]: outside
//! recovery mode they abort the parse, inside it they become diagnostics
//! and building continues.

use std::collections::HashSet;

use crate::error::{ErrorSeverity, ParseDiagnostic, SourceLocation, XmlError};
use crate::parser::attrs::{parse_attributes, RawAttribute};
use crate::parser::input::{is_xml_whitespace, parse_xml_decl, split_name, validate_qname};
use crate::parser::namespace::{NamespaceResolver, Resolution};
use crate::parser::scanner::{DoctypeDecls, Spanned, Token};
use crate::parser::ParseOptions;
use crate::sax::SaxHandler;
use crate::tree::{
    value_to_string, Document, NodeId, NsId, NsOwner, ValuePart, XMLNS_NAMESPACE, XML_NAMESPACE,
};

/// SAX attribute tuple: `(local_name, value, prefix, namespace_uri)`.
type SaxAttribute = (String, String, Option<String>, Option<String>);

#[derive(Debug)]
struct OpenElement {
    /// `None` when no tree is being built.
    node: Option<NodeId>,
    /// Qualified name, matched against end tags.
    name: String,
    ns_href: Option<String>,
    line: u32,
}

/// Outcome of a prefix lookup, detached from the resolver's borrow.
enum Lookup {
    Bound(Option<NsId>, String),
    NoNamespace,
    Undeclared,
}

/// Consumes tokens and materializes them in a [`Document`].
pub(crate) struct TreeBuilder<'h> {
    doc: Document,
    open: Vec<OpenElement>,
    resolver: NamespaceResolver,
    recover: bool,
    no_blanks: bool,
    no_error: bool,
    no_warning: bool,
    max_depth: usize,
    max_name_length: usize,
    encoding_forced: bool,
    sax: Option<&'h mut dyn SaxHandler>,
    build_tree: bool,
    started: bool,
    seen_root: bool,
    doctype: Option<DoctypeDecls>,
    halted: bool,
}

impl<'h> TreeBuilder<'h> {
    pub fn new(options: &ParseOptions, sax: Option<&'h mut dyn SaxHandler>) -> Self {
        let mut doc = Document::new();
        doc.version = Some("1.0".to_string());
        doc.encoding.clone_from(&options.encoding);
        doc.url.clone_from(&options.base_url);
        doc.parse_flags = options.to_bits();
        doc.set_node_limit(options.max_nodes);
        let build_tree = sax.as_ref().map_or(true, |h| h.build_tree());
        Self {
            doc,
            open: Vec::new(),
            resolver: NamespaceResolver::new(),
            recover: options.recover,
            no_blanks: options.no_blanks,
            no_error: options.no_error,
            no_warning: options.no_warning,
            max_depth: options.effective_max_depth() as usize,
            max_name_length: options.effective_max_name_length(),
            encoding_forced: options.encoding.is_some(),
            sax,
            build_tree,
            started: false,
            seen_root: false,
            doctype: None,
            halted: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    /// Splits the builder into its document and the SAX handler it was
    /// notifying, so the handler can drive a fresh builder.
    pub fn into_parts(self) -> (Document, Option<&'h mut dyn SaxHandler>) {
        (self.doc, self.sax)
    }

    /// Returns `true` once an error stopped tree construction for good.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Applies one token to the tree.
    pub fn process(&mut self, spanned: Spanned) -> Result<(), XmlError> {
        self.start_document();
        if self.halted {
            return Ok(());
        }
        let Spanned { token, location } = spanned;
        match token {
            Token::XmlDecl(body) => self.xml_declaration(&body, location),
            Token::StartTag {
                name,
                attrs_raw,
                empty,
            } => self.start_element(name, &attrs_raw, empty, location),
            Token::EndTag(name) => self.end_element(&name, location),
            Token::Text(content) => self.characters(content, location),
            Token::CData(content) => self.cdata(content, location),
            Token::Comment(content) => {
                if let Some(h) = self.sax.as_mut() {
                    h.comment(&content);
                }
                if self.build_tree {
                    let id = self.doc.create_comment(content)?;
                    self.attach(id, location)?;
                }
                Ok(())
            }
            Token::Pi { target, data } => {
                if let Some(h) = self.sax.as_mut() {
                    h.processing_instruction(&target, data.as_deref());
                }
                if self.build_tree {
                    let id = self.doc.create_pi(target, data)?;
                    self.attach(id, location)?;
                }
                Ok(())
            }
            Token::DoctypeSkip(decls) => {
                if self.seen_root || !self.open.is_empty() || self.doctype.is_some() {
                    return self.report(wf("DOCTYPE not allowed here", location));
                }
                log::trace!("DOCTYPE declares {} entities", decls.entities.len());
                self.doctype = Some(decls);
                Ok(())
            }
            Token::EntityRef(name) => self.entity_reference(name, location),
        }
    }

    /// Resolves the end of input: unclosed elements and a missing root
    /// element are well-formedness errors.
    pub fn finish(&mut self, location: SourceLocation) -> Result<(), XmlError> {
        self.start_document();
        if !self.halted {
            if let Some(top) = self.open.last() {
                let msg = format!("Premature end of data in tag {} line {}", top.name, top.line);
                self.report(wf(msg, location))?;
            } else if !self.seen_root {
                self.report(wf("Start tag expected, '<' not found", location))?;
            }
        }
        while !self.open.is_empty() {
            self.close_top();
        }
        if let Some(h) = self.sax.as_mut() {
            h.end_document();
        }
        log::debug!(
            "tree built: {} nodes, well-formed: {}",
            self.doc.node_count(),
            self.doc.well_formed
        );
        Ok(())
    }

    /// Routes a recoverable error: aborts outside recovery mode, records a
    /// diagnostic inside it.
    pub fn report(&mut self, err: XmlError) -> Result<(), XmlError> {
        self.doc.well_formed = false;
        if !self.recover || !err.is_recoverable() {
            return Err(err);
        }
        let location = match &err {
            XmlError::WellFormedness { location, .. } => *location,
            XmlError::Syntax { offset, .. } => SourceLocation {
                line: 0,
                column: 0,
                byte_offset: *offset,
            },
            _ => SourceLocation::default(),
        };
        let message = match &err {
            XmlError::WellFormedness { message, .. } => message.clone(),
            other => other.to_string(),
        };
        if !self.no_error {
            log::warn!("recovered: {err}");
            if let Some(h) = self.sax.as_mut() {
                h.error(&message, location);
            }
        }
        self.doc.diagnostics.push(ParseDiagnostic {
            severity: ErrorSeverity::Error,
            message,
            location,
        });
        Ok(())
    }

    /// Records an error after which no more tokens are applied.
    pub fn report_halting(&mut self, err: XmlError) -> Result<(), XmlError> {
        self.report(err)?;
        self.halted = true;
        Ok(())
    }

    fn warn(&mut self, message: String, location: SourceLocation) {
        if !self.no_warning {
            log::warn!("{message} at {location}");
            if let Some(h) = self.sax.as_mut() {
                h.warning(&message, location);
            }
        }
        self.doc.diagnostics.push(ParseDiagnostic {
            severity: ErrorSeverity::Warning,
            message,
            location,
        });
    }

    fn start_document(&mut self) {
        if !self.started {
            self.started = true;
            if let Some(h) = self.sax.as_mut() {
                h.start_document();
            }
        }
    }

    fn current_parent(&self) -> NodeId {
        self.open
            .last()
            .and_then(|e| e.node)
            .unwrap_or_else(|| self.doc.root())
    }

    fn attach(&mut self, id: NodeId, location: SourceLocation) -> Result<(), XmlError> {
        self.doc.set_line(id, location.line);
        let parent = self.current_parent();
        self.doc.attach_child(parent, id)
    }

    fn lookup(&mut self, prefix: Option<&str>) -> Result<Lookup, XmlError> {
        let doc = self.build_tree.then_some(&mut self.doc);
        Ok(match self.resolver.resolve(doc, prefix)? {
            Resolution::Bound { record, href } => Lookup::Bound(record, href.to_string()),
            Resolution::NoNamespace => Lookup::NoNamespace,
            Resolution::Undeclared => Lookup::Undeclared,
        })
    }

    fn xml_declaration(&mut self, body: &str, location: SourceLocation) -> Result<(), XmlError> {
        let decl = match parse_xml_decl(body) {
            Ok(decl) => decl,
            Err(msg) => {
                log::debug!("bad XML declaration: {msg}");
                return self.report(XmlError::Syntax {
                    offset: location.byte_offset,
                    kind: crate::error::SyntaxKind::XmlDecl,
                });
            }
        };
        if decl.version != "1.0" {
            self.warn(format!("Unsupported version '{}'", decl.version), location);
        }
        if let Some(h) = self.sax.as_mut() {
            h.xml_declaration(&decl.version, decl.encoding.as_deref(), decl.standalone);
        }
        self.doc.version = Some(decl.version);
        if !self.encoding_forced {
            self.doc.encoding = decl.encoding;
        }
        self.doc.standalone = decl.standalone;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn start_element(
        &mut self,
        name: String,
        attrs_raw: &str,
        empty: bool,
        location: SourceLocation,
    ) -> Result<(), XmlError> {
        if self.open.is_empty() && self.seen_root {
            return self.report_halting(wf("Extra content at the end of the document", location));
        }
        if name.len() > self.max_name_length {
            return self.report_halting(wf(
                format!("Name too long: {} bytes, use XML_PARSE_HUGE option", name.len()),
                location,
            ));
        }
        if self.open.len() >= self.max_depth {
            let msg = format!(
                "Excessive depth in document: {} use XML_PARSE_HUGE option",
                self.max_depth
            );
            return self.report_halting(wf(msg, location));
        }
        if let Some(problem) = validate_qname(&name) {
            self.report(wf(format!("Failed to parse QName '{name}': {problem}"), location))?;
        }
        let attrs = match parse_attributes(attrs_raw, location.byte_offset + 1 + name.len()) {
            Ok(attrs) => attrs,
            Err(err) => return self.report_halting(err),
        };

        let (prefix, local) = split_name(&name);
        let (prefix, local) = (prefix.map(str::to_string), local.to_string());

        let node = if self.build_tree {
            let id = self.doc.create_element_ns(local.clone(), prefix.clone())?;
            self.attach(id, location)?;
            Some(id)
        } else {
            None
        };
        self.resolver.push_frame();
        self.open.push(OpenElement {
            node,
            name: name.clone(),
            ns_href: None,
            line: location.line,
        });
        self.seen_root = true;

        for decl in attrs.iter().filter(|a| a.is_namespace_decl()) {
            self.declare_namespace(node, decl, location)?;
        }

        let ns_href = match self.lookup(prefix.as_deref())? {
            Lookup::Bound(record, href) => {
                if let Some(id) = node {
                    self.doc.set_node_namespace(id, record);
                }
                Some(href)
            }
            Lookup::NoNamespace => None,
            Lookup::Undeclared => {
                let msg = format!(
                    "Namespace prefix {} on {local} is not defined",
                    prefix.as_deref().unwrap_or_default()
                );
                self.report(wf(msg, location))?;
                None
            }
        };
        if let Some(top) = self.open.last_mut() {
            top.ns_href.clone_from(&ns_href);
        }

        let mut seen_qnames = HashSet::new();
        let mut seen_expanded = HashSet::new();
        let mut sax_attrs: Vec<SaxAttribute> = Vec::new();
        for attr in attrs.into_iter().filter(|a| !a.is_namespace_decl()) {
            if let Some(problem) = validate_qname(&attr.name) {
                let msg = format!("Failed to parse QName '{}': {problem}", attr.name);
                self.report(wf(msg, location))?;
            }
            if !seen_qnames.insert(attr.name.clone()) {
                self.report(wf(format!("Attribute {} redefined", attr.name), location))?;
                continue;
            }
            let (a_prefix, a_local) = split_name(&attr.name);
            let (record, href) = match a_prefix {
                None => (None, None),
                Some(p) => match self.lookup(Some(p))? {
                    Lookup::Bound(record, href) => (record, Some(href)),
                    Lookup::NoNamespace | Lookup::Undeclared => {
                        let msg =
                            format!("Namespace prefix {p} for {a_local} on {local} is not defined");
                        self.report(wf(msg, location))?;
                        (None, None)
                    }
                },
            };
            if let Some(h) = &href {
                if !seen_expanded.insert((a_local.to_string(), h.clone())) {
                    let msg = format!("Namespaced Attribute {a_local} in '{h}' redefined");
                    self.report(wf(msg, location))?;
                    continue;
                }
            }
            self.check_value_entities(&attr, location)?;

            if self.sax.is_some() {
                sax_attrs.push((
                    a_local.to_string(),
                    value_to_string(&attr.value),
                    a_prefix.map(str::to_string),
                    href.clone(),
                ));
            }
            if let Some(element) = node {
                let a_prefix = a_prefix.map(str::to_string);
                let a_local = a_local.to_string();
                self.doc
                    .create_attribute_ns(element, a_local, a_prefix, record, attr.value)?;
            }
        }

        if let Some(h) = self.sax.as_mut() {
            h.start_element(&local, prefix.as_deref(), ns_href.as_deref(), &sax_attrs);
        }
        if empty {
            self.close_top();
        }
        Ok(())
    }

    fn declare_namespace(
        &mut self,
        node: Option<NodeId>,
        decl: &RawAttribute,
        location: SourceLocation,
    ) -> Result<(), XmlError> {
        let prefix = decl.name.strip_prefix("xmlns:");
        let Some(href) = decl.plain_value() else {
            return self.report(wf(
                format!("{}: entity reference in namespace name", decl.name),
                location,
            ));
        };
        match prefix {
            Some("xml") => {
                if href != XML_NAMESPACE {
                    self.report(wf("xml namespace prefix mapped to wrong URI", location))?;
                }
                // The xml prefix is predeclared; no record is created.
                return Ok(());
            }
            Some("xmlns") => {
                return self.report(wf("redefinition of the xmlns prefix is forbidden", location));
            }
            Some("") => {
                return self.report(wf("Failed to parse QName 'xmlns:'", location));
            }
            _ => {}
        }
        if href == XML_NAMESPACE {
            return self.report(wf("reuse of the xml namespace name is forbidden", location));
        }
        if href == XMLNS_NAMESPACE {
            return self.report(wf("reuse of the xmlns namespace name is forbidden", location));
        }
        if let Some(p) = prefix {
            if href.is_empty() {
                return self.report(wf(
                    format!("xmlns:{p}: Empty XML namespace is not allowed"),
                    location,
                ));
            }
        }
        if !href.is_empty() && !href.contains(':') {
            self.warn(format!("xmlns: URI {href} is not absolute"), location);
        }
        let record = match node {
            Some(element) => Some(self.doc.create_namespace(
                NsOwner::Element(element),
                prefix,
                Some(&href),
            )?),
            None => None,
        };
        if let Some(h) = self.sax.as_mut() {
            h.namespace_declaration(prefix, &href);
        }
        self.resolver.bind(prefix, Some(&href), record);
        Ok(())
    }

    /// References to entities other than the predefined ones are errors
    /// unless the DOCTYPE declares them or has an external part that may.
    fn check_entity(&mut self, name: &str, location: SourceLocation) -> Result<(), XmlError> {
        if self.doctype.as_ref().is_some_and(|d| d.may_declare(name)) {
            return Ok(());
        }
        self.report(wf(format!("Entity '{name}' not defined"), location))
    }

    fn check_value_entities(
        &mut self,
        attr: &RawAttribute,
        location: SourceLocation,
    ) -> Result<(), XmlError> {
        for part in &attr.value {
            if let ValuePart::EntityRef(name) = part {
                self.check_entity(name, location)?;
            }
        }
        Ok(())
    }

    fn end_element(&mut self, name: &str, location: SourceLocation) -> Result<(), XmlError> {
        let Some(top) = self.open.last() else {
            return self.report(wf(format!("Unexpected end tag : {name}"), location));
        };
        if top.name == name {
            self.close_top();
            return Ok(());
        }
        let msg = format!(
            "Opening and ending tag mismatch: {} line {} and {name}",
            top.name, top.line
        );
        self.report(wf(msg, location))?;
        // Recovery: close up to a matching open element, else ignore the tag.
        if let Some(depth) = self.open.iter().rposition(|e| e.name == name) {
            while self.open.len() > depth {
                self.close_top();
            }
        }
        Ok(())
    }

    fn close_top(&mut self) {
        let Some(element) = self.open.pop() else {
            return;
        };
        self.resolver.pop_frame();
        if let Some(h) = self.sax.as_mut() {
            let (prefix, local) = split_name(&element.name);
            h.end_element(local, prefix, element.ns_href.as_deref());
        }
    }

    /// Content that may only appear inside the root element.
    fn check_in_root(&mut self, location: SourceLocation) -> Result<bool, XmlError> {
        if !self.open.is_empty() {
            return Ok(true);
        }
        let msg = if self.seen_root {
            "Extra content at the end of the document"
        } else {
            "Start tag expected, '<' not found"
        };
        self.report(wf(msg, location))?;
        Ok(false)
    }

    fn characters(&mut self, content: String, location: SourceLocation) -> Result<(), XmlError> {
        let blank = content.bytes().all(is_xml_whitespace);
        if self.open.is_empty() && blank {
            return Ok(());
        }
        if !self.check_in_root(location)? {
            return Ok(());
        }
        if blank && self.no_blanks {
            return Ok(());
        }
        if let Some(h) = self.sax.as_mut() {
            h.characters(&content);
        }
        if !self.build_tree {
            return Ok(());
        }
        let parent = self.current_parent();
        if let Some(existing) = self.doc.trailing_text_mut(parent) {
            existing
                .try_reserve(content.len())
                .map_err(|_| XmlError::OutOfMemory)?;
            existing.push_str(&content);
            return Ok(());
        }
        let id = self.doc.create_text(content)?;
        self.attach(id, location)
    }

    fn cdata(&mut self, content: String, location: SourceLocation) -> Result<(), XmlError> {
        if !self.check_in_root(location)? {
            return Ok(());
        }
        if let Some(h) = self.sax.as_mut() {
            h.cdata(&content);
        }
        if self.build_tree {
            let id = self.doc.create_cdata(content)?;
            self.attach(id, location)?;
        }
        Ok(())
    }

    fn entity_reference(&mut self, name: String, location: SourceLocation) -> Result<(), XmlError> {
        if !self.check_in_root(location)? {
            return Ok(());
        }
        self.check_entity(&name, location)?;
        if let Some(h) = self.sax.as_mut() {
            h.entity_reference(&name);
        }
        if self.build_tree {
            let id = self.doc.create_entity_ref(name)?;
            self.attach(id, location)?;
        }
        Ok(())
    }
}

fn wf(message: impl Into<String>, location: SourceLocation) -> XmlError {
    XmlError::well_formedness(message, location)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::scanner::{Scan, Scanner};
    use crate::tree::NodeKind;
    use pretty_assertions::assert_eq;

    fn build(input: &str, options: &ParseOptions) -> Result<Document, XmlError> {
        let mut scanner = Scanner::new();
        scanner.feed(input);
        scanner.finish();
        let mut builder = TreeBuilder::new(options, None);
        loop {
            match scanner.next_token()? {
                Scan::Token(t) => builder.process(t)?,
                Scan::End | Scan::NeedMore => break,
            }
        }
        builder.finish(scanner.location())?;
        Ok(builder.into_document())
    }

    fn strict(input: &str) -> Result<Document, XmlError> {
        build(input, &ParseOptions::default())
    }

    fn recover(input: &str) -> Document {
        build(input, &ParseOptions::default().recover(true)).unwrap()
    }

    #[test]
    fn test_builds_nested_elements() {
        let doc = strict("<a><b>x</b><c/></a>").unwrap();
        let a = doc.root_element().unwrap();
        let names: Vec<_> = doc
            .children(a)
            .map(|c| doc.node_name(c).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(doc.text_content(a), "x");
        assert_eq!(doc.version.as_deref(), Some("1.0"));
        assert!(doc.well_formed);
    }

    #[test]
    fn test_pi_in_document_order() {
        let doc = strict("<r>a<?t d?><e/></r>").unwrap();
        let r = doc.root_element().unwrap();
        let kinds: Vec<_> = doc.children(r).map(|c| doc.node(c).kind.label()).collect();
        assert_eq!(kinds, vec!["TEXT", "PI", "ELEMENT"]);
        let pi = doc.children(r).nth(1).unwrap();
        assert_eq!(doc.node_name(pi), Some("t"));
        assert_eq!(doc.node_text(pi), Some("d"));
    }

    #[test]
    fn test_adjacent_text_is_coalesced() {
        let doc = strict("<r>a&amp;b&#33;</r>").unwrap();
        let r = doc.root_element().unwrap();
        assert_eq!(doc.children(r).count(), 1);
        assert_eq!(doc.text_content(r), "a&b!");
    }

    #[test]
    fn test_whitespace_outside_root_has_no_node() {
        let doc = strict("\n<r/>\n<!-- c -->\n").unwrap();
        let kinds: Vec<_> = doc
            .children(doc.root())
            .map(|c| doc.node(c).kind.label())
            .collect();
        assert_eq!(kinds, vec!["ELEMENT", "COMMENT"]);
    }

    #[test]
    fn test_second_root_is_an_error() {
        let err = strict("<a/><b/>").unwrap_err();
        assert!(matches!(err, XmlError::WellFormedness { .. }));
        let doc = recover("<a/><b/>");
        assert!(!doc.well_formed);
        assert_eq!(doc.children(doc.root()).count(), 1);
    }

    #[test]
    fn test_mismatched_end_tag_recovery() {
        assert!(strict("<a><b></a>").is_err());
        let doc = recover("<a><b></a><!-- after -->");
        assert!(!doc.well_formed);
        let a = doc.root_element().unwrap();
        let b = doc.first_child(a).unwrap();
        assert_eq!(doc.node_name(b), Some("b"));
        assert_eq!(doc.children(doc.root()).count(), 2);
    }

    #[test]
    fn test_unclosed_element_at_end() {
        let err = strict("<a><b>").unwrap_err();
        assert!(err.to_string().starts_with("Premature end of data in tag b"));
        let doc = recover("<a><b>text");
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.text_content(doc.root_element().unwrap()), "text");
    }

    #[test]
    fn test_empty_document() {
        assert!(strict("").is_err());
        assert!(strict("<!-- only -->").is_err());
    }

    #[test]
    fn test_duplicate_attribute() {
        assert!(strict("<a x='1' x='2'/>").is_err());
        assert!(strict("<a xmlns:p='u' xmlns:q='u' p:x='1' q:x='2'/>").is_err());
        let doc = recover("<a x='1' x='2'/>");
        let a = doc.root_element().unwrap();
        assert_eq!(doc.attributes(a).len(), 1);
        assert_eq!(doc.attribute(a, "x").as_deref(), Some("1"));
    }

    #[test]
    fn test_text_outside_root() {
        assert!(strict("hello<a/>").is_err());
        assert!(strict("<a/>tail").is_err());
        let doc = recover("<a/>tail");
        assert_eq!(doc.children(doc.root()).count(), 1);
    }

    #[test]
    fn test_entity_reference_node() {
        assert!(strict("<a>&custom;</a>").is_err());
        let doc = strict("<!DOCTYPE a [<!ENTITY custom 'x'>]><a>&custom;</a>").unwrap();
        let a = doc.root_element().unwrap();
        let child = doc.first_child(a).unwrap();
        assert_eq!(
            doc.node(child).kind,
            NodeKind::EntityRef {
                name: "custom".into()
            }
        );
        let doc = recover("<a>&custom;</a>");
        assert!(!doc.well_formed);
        assert_eq!(doc.children(doc.root_element().unwrap()).count(), 1);
    }

    #[test]
    fn test_undeclared_entity_after_doctype() {
        for input in [
            "<!DOCTYPE a><a>&custom;</a>",
            "<!DOCTYPE a [<!ENTITY other 'x'>]><a>&custom;</a>",
            "<!DOCTYPE a><a v='1&custom;2'/>",
            "<!DOCTYPE a [<!ENTITY other 'x'>]><a v='&custom;'/>",
        ] {
            let err = strict(input).unwrap_err();
            let message = err.to_string();
            assert!(message.starts_with("Entity 'custom' not defined"), "{input}: {message}");
        }

        let doc = recover("<!DOCTYPE a [<!ENTITY other 'x'>]><a v='1&custom;2'>&custom;</a>");
        assert!(!doc.well_formed);
        assert_eq!(doc.diagnostics.len(), 2);
        let a = doc.root_element().unwrap();
        assert_eq!(
            doc.node(doc.first_child(a).unwrap()).kind,
            NodeKind::EntityRef {
                name: "custom".into()
            }
        );
        let attr = doc.attributes(a)[0];
        assert_eq!(
            doc.attr(attr).value,
            vec![
                ValuePart::Text("1".into()),
                ValuePart::EntityRef("custom".into()),
                ValuePart::Text("2".into()),
            ]
        );
    }

    #[test]
    fn test_no_blanks() {
        let doc = build("<r>  <c/> x </r>", &ParseOptions::default().no_blanks(true)).unwrap();
        let r = doc.root_element().unwrap();
        let kinds: Vec<_> = doc.children(r).map(|c| doc.node(c).kind.label()).collect();
        assert_eq!(kinds, vec!["ELEMENT", "TEXT"]);
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions::default().max_depth(3);
        assert!(build("<a><b><c/></b></a>", &options).is_ok());
        let err = build("<a><b><c><d/></c></b></a>", &options).unwrap_err();
        assert!(err.to_string().contains("Excessive depth"));
        let huge = ParseOptions::default().max_depth(3).huge(true);
        assert!(build("<a><b><c><d/></c></b></a>", &huge).is_ok());
    }

    #[test]
    fn test_node_limit() {
        let options = ParseOptions::default().max_nodes(3);
        let err = build("<a><b/><c/></a>", &options).unwrap_err();
        assert_eq!(err, XmlError::OutOfMemory);
        let err = build("<a><b/><c/></a>", &options.recover(true)).unwrap_err();
        assert_eq!(err, XmlError::OutOfMemory);
    }

    #[test]
    fn test_xml_declaration_fields() {
        let doc = strict("<?xml version='1.0' encoding='ISO-8859-1' standalone='yes'?><r/>").unwrap();
        assert_eq!(doc.version.as_deref(), Some("1.0"));
        assert_eq!(doc.encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(doc.standalone, Some(true));
        assert!(strict("<?xml encoding='UTF-8'?><r/>").is_err());
    }

    #[test]
    fn test_relative_namespace_uri_warns() {
        let doc = strict("<r xmlns='relative'/>").unwrap();
        assert!(doc.well_formed);
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].severity, ErrorSeverity::Warning);
    }
}
