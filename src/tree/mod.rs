//! Arena-based XML document tree.
//!
//! All nodes, attributes and namespace records live in contiguous arenas
//! owned by the `Document` and are referenced by typed indices (`NodeId`,
//! `AttrId`, `NsId`), each a newtype over `NonZeroU32`.
//!
//! Ownership runs strictly parent → child; the back-links (parent, owning
//! element, owning document) are plain indices that are never followed for
//! ownership purposes. Dropping the `Document` frees everything at once.
//!
//! # Allocation failures
//!
//! Arenas grow with `try_reserve`, so a failed allocation surfaces as
//! [`XmlError::OutOfMemory`] instead of aborting. A node cap can also be
//! installed with [`Document::set_node_limit`]; exceeding it is reported the
//! same way.

pub mod dump;
mod namespace;
mod node;

pub use namespace::{
    AttrData, AttributeType, NsData, NsOwner, ValuePart, XMLNS_NAMESPACE, XML_NAMESPACE,
};
pub use node::NodeKind;
pub(crate) use namespace::value_to_string;

use std::num::NonZeroU32;

use crate::error::{ParseDiagnostic, XmlError};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(NonZeroU32);

        impl $name {
            #[allow(clippy::cast_possible_truncation)]
            fn from_index(index: usize) -> Self {
                // Ids are 1-based so that `Option<Id>` stays pointer-sized.
                match NonZeroU32::new((index as u32).wrapping_add(1)) {
                    Some(n) => Self(n),
                    None => unreachable!("arena index overflow"),
                }
            }

            fn as_index(self) -> usize {
                self.0.get() as usize - 1
            }

            /// Converts the id to a raw non-zero `u32`.
            #[must_use]
            pub fn into_raw(self) -> u32 {
                self.0.get()
            }

            /// Rebuilds an id from a raw `u32`; 0 means "none".
            #[must_use]
            pub fn from_raw(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map(Self)
            }
        }
    };
}

arena_id!(
    /// A typed index into the document's node arena.
    NodeId
);
arena_id!(
    /// A typed index into the document's attribute arena.
    AttrId
);
arena_id!(
    /// A typed index into the document's namespace arena.
    NsId
);

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is (element, text, comment, etc.) and its payload.
    pub kind: NodeKind,
    /// Parent node, if any. The document node has no parent.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
    /// Resolved namespace of an element; `None` means "no namespace".
    pub ns: Option<NsId>,
    /// 1-based source line the node started on (0 if built by hand).
    pub line: u32,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            ns: None,
            line: 0,
        }
    }
}

/// An XML document.
///
/// The `Document` owns all nodes, attributes and namespaces and provides
/// the tree-store operations used by the builder plus read-only navigation.
///
/// # Examples
///
/// ```
/// use libxml2_rs::Document;
///
/// let doc = Document::parse_str("<root/>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), Some("root"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    attrs: Vec<AttrData>,
    namespaces: Vec<NsData>,
    /// The document node id (not the root element).
    root: NodeId,
    /// Cached record for the implicit `xml` prefix.
    xml_ns: Option<NsId>,
    /// Optional cap on the number of nodes.
    node_limit: Option<usize>,
    /// XML version from the XML declaration (e.g., "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration or the caller's override.
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
    /// Base URL the document was loaded from, if known.
    pub url: Option<String>,
    /// Legacy option bits the document was parsed with.
    pub parse_flags: i32,
    /// `false` if any syntax or well-formedness error was recovered from.
    pub well_formed: bool,
    /// Diagnostics collected during parsing (warnings and recovered errors).
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Document {
    /// Creates a new empty document with no XML declaration.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            attrs: Vec::new(),
            namespaces: Vec::new(),
            root: NodeId::from_index(0),
            xml_ns: None,
            node_limit: None,
            version: None,
            encoding: None,
            standalone: None,
            url: None,
            parse_flags: 0,
            well_formed: true,
            diagnostics: Vec::new(),
        }
    }

    /// Creates a new empty document carrying the given XML version.
    #[must_use]
    pub fn create_document(version: &str) -> Self {
        let mut doc = Self::new();
        doc.version = Some(version.to_string());
        doc
    }

    /// Parses an XML string with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    pub fn parse_str(input: &str) -> Result<Self, crate::error::ParseError> {
        crate::parser::parse_str(input)
    }

    /// Parses raw bytes with default options, detecting the encoding.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, crate::error::ParseError> {
        crate::parser::parse_bytes(input)
    }

    /// Caps the number of nodes this document may hold.
    ///
    /// Creating a node beyond the cap fails with `OutOfMemory`.
    pub fn set_node_limit(&mut self, limit: Option<usize>) {
        self.node_limit = limit;
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the single top-level element, if any.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| self.node(id).kind.is_element())
    }

    /// Returns a reference to the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node of this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns `true` if `id` indexes a node of this document.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.as_index() < self.nodes.len()
    }

    /// Returns an attribute record.
    #[must_use]
    pub fn attr(&self, id: AttrId) -> &AttrData {
        &self.attrs[id.as_index()]
    }

    /// Returns a namespace record.
    #[must_use]
    pub fn namespace(&self, id: NsId) -> &NsData {
        &self.namespaces[id.as_index()]
    }

    // --- Allocation ---

    fn alloc_node(&mut self, kind: NodeKind) -> Result<NodeId, XmlError> {
        if self
            .node_limit
            .is_some_and(|limit| self.nodes.len() >= limit)
        {
            return Err(XmlError::OutOfMemory);
        }
        self.nodes
            .try_reserve(1)
            .map_err(|_| XmlError::OutOfMemory)?;
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        Ok(id)
    }

    /// Creates a detached element. A `prefix:local` name is split.
    pub fn create_element(&mut self, name: &str) -> Result<NodeId, XmlError> {
        let (prefix, local) = crate::parser::input::split_name(name);
        self.create_element_ns(local.to_string(), prefix.map(str::to_string))
    }

    /// Creates a detached element from an already split name.
    pub fn create_element_ns(
        &mut self,
        name: String,
        prefix: Option<String>,
    ) -> Result<NodeId, XmlError> {
        self.alloc_node(NodeKind::Element {
            name,
            prefix,
            attributes: Vec::new(),
            ns_defs: Vec::new(),
        })
    }

    /// Creates a detached text node; the content buffer moves into it.
    pub fn create_text(&mut self, content: impl Into<String>) -> Result<NodeId, XmlError> {
        self.alloc_node(NodeKind::Text {
            content: content.into(),
        })
    }

    /// Creates a detached CDATA section.
    pub fn create_cdata(&mut self, content: impl Into<String>) -> Result<NodeId, XmlError> {
        self.alloc_node(NodeKind::CData {
            content: content.into(),
        })
    }

    /// Creates a detached comment.
    pub fn create_comment(&mut self, content: impl Into<String>) -> Result<NodeId, XmlError> {
        self.alloc_node(NodeKind::Comment {
            content: content.into(),
        })
    }

    /// Creates a detached processing instruction.
    pub fn create_pi(
        &mut self,
        target: impl Into<String>,
        data: Option<String>,
    ) -> Result<NodeId, XmlError> {
        self.alloc_node(NodeKind::ProcessingInstruction {
            target: target.into(),
            data,
        })
    }

    /// Creates a detached entity reference node.
    pub fn create_entity_ref(&mut self, name: impl Into<String>) -> Result<NodeId, XmlError> {
        self.alloc_node(NodeKind::EntityRef { name: name.into() })
    }

    /// Creates an empty document fragment.
    pub fn create_fragment(&mut self) -> Result<NodeId, XmlError> {
        self.alloc_node(NodeKind::DocumentFragment)
    }

    /// Creates an attribute on `element` and appends it to its attribute list.
    ///
    /// A `prefix:local` name is split; the namespace is left unresolved.
    pub fn create_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        value: Vec<ValuePart>,
    ) -> Result<AttrId, XmlError> {
        let (prefix, local) = crate::parser::input::split_name(name);
        self.create_attribute_ns(
            element,
            local.to_string(),
            prefix.map(str::to_string),
            None,
            value,
        )
    }

    /// Creates an attribute with an already resolved namespace.
    pub fn create_attribute_ns(
        &mut self,
        element: NodeId,
        name: String,
        prefix: Option<String>,
        ns: Option<NsId>,
        value: Vec<ValuePart>,
    ) -> Result<AttrId, XmlError> {
        self.check_id(element)?;
        if !self.node(element).kind.is_element() {
            return Err(XmlError::InvalidArgument(
                "attributes can only be created on elements".into(),
            ));
        }
        self.attrs
            .try_reserve(1)
            .map_err(|_| XmlError::OutOfMemory)?;
        let id = AttrId::from_index(self.attrs.len());
        self.attrs.push(AttrData {
            name,
            prefix,
            ns,
            atype: AttributeType::Cdata,
            value,
            element,
        });
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(element).kind {
            attributes
                .try_reserve(1)
                .map_err(|_| XmlError::OutOfMemory)?;
            attributes.push(id);
        }
        Ok(id)
    }

    /// Creates a namespace record.
    ///
    /// An empty `prefix` denotes the default namespace; an empty `href`
    /// records an explicit unbinding. Records owned by an element are
    /// appended to its `ns_defs`.
    pub fn create_namespace(
        &mut self,
        owner: NsOwner,
        prefix: Option<&str>,
        href: Option<&str>,
    ) -> Result<NsId, XmlError> {
        if let NsOwner::Element(element) = owner {
            self.check_id(element)?;
            if !self.node(element).kind.is_element() {
                return Err(XmlError::InvalidArgument(
                    "namespaces can only be declared on elements".into(),
                ));
            }
        }
        self.namespaces
            .try_reserve(1)
            .map_err(|_| XmlError::OutOfMemory)?;
        let id = NsId::from_index(self.namespaces.len());
        self.namespaces.push(NsData {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            href: href.filter(|h| !h.is_empty()).map(str::to_string),
            owner,
        });
        if let NsOwner::Element(element) = owner {
            if let NodeKind::Element { ns_defs, .. } = &mut self.node_mut(element).kind {
                ns_defs.try_reserve(1).map_err(|_| XmlError::OutOfMemory)?;
                ns_defs.push(id);
            }
        }
        Ok(id)
    }

    /// Returns the document's record for the `xml` prefix, creating it on
    /// first use. Every call returns the same id.
    pub fn xml_namespace(&mut self) -> Result<NsId, XmlError> {
        if let Some(id) = self.xml_ns {
            return Ok(id);
        }
        let id = self.create_namespace(NsOwner::Document, Some("xml"), Some(XML_NAMESPACE))?;
        self.xml_ns = Some(id);
        Ok(id)
    }

    /// Returns the cached `xml` namespace without creating it.
    #[must_use]
    pub fn cached_xml_namespace(&self) -> Option<NsId> {
        self.xml_ns
    }

    /// Sets (or clears) the resolved namespace of a node.
    pub fn set_node_namespace(&mut self, node: NodeId, ns: Option<NsId>) {
        self.node_mut(node).ns = ns;
    }

    pub(crate) fn set_line(&mut self, node: NodeId, line: u32) {
        self.node_mut(node).line = line;
    }

    fn check_id(&self, id: NodeId) -> Result<(), XmlError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(XmlError::InvalidArgument(format!(
                "node {} does not belong to this document",
                id.into_raw()
            )))
        }
    }

    // --- Linking ---

    /// Appends `child` to the end of `parent`'s child list.
    ///
    /// Fails if the child already has a parent, is the document node, is
    /// `parent` itself or one of its ancestors, or if either id does not
    /// belong to this document.
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), XmlError> {
        self.check_id(parent)?;
        self.check_id(child)?;
        if !self.node(parent).kind.is_container() {
            return Err(XmlError::InvalidArgument(format!(
                "{} nodes cannot have children",
                self.node(parent).kind.label()
            )));
        }
        if matches!(self.node(child).kind, NodeKind::Document) {
            return Err(XmlError::InvalidArgument(
                "the document node cannot be attached".into(),
            ));
        }
        if self.node(child).parent.is_some() {
            return Err(XmlError::InvalidArgument(
                "child already has a parent; detach it first".into(),
            ));
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(XmlError::InvalidArgument(
                "cannot attach a node below itself".into(),
            ));
        }

        self.node_mut(child).parent = Some(parent);
        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
        Ok(())
    }

    /// Detaches a node from its parent (but does not free it from the arena).
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let node = self.node_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Returns the content buffer of `parent`'s last child if it is a text
    /// node, so that adjacent character data can be merged into it.
    pub(crate) fn trailing_text_mut(&mut self, parent: NodeId) -> Option<&mut String> {
        let last = self.node(parent).last_child?;
        match &mut self.node_mut(last).kind {
            NodeKind::Text { content } => Some(content),
            _ => None,
        }
    }

    // --- Accessors ---

    /// Returns the local name of an element or the target of a PI.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. }
            | NodeKind::EntityRef { name } => Some(name),
            _ => None,
        }
    }

    /// Returns the source prefix of an element, if any.
    #[must_use]
    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { prefix, .. } => prefix.as_deref(),
            _ => None,
        }
    }

    /// Returns the resolved namespace record of a node.
    #[must_use]
    pub fn node_ns(&self, id: NodeId) -> Option<NsId> {
        self.node(id).ns
    }

    /// Returns the namespace URI of a node, if any.
    #[must_use]
    pub fn node_namespace(&self, id: NodeId) -> Option<&str> {
        self.node(id)
            .ns
            .and_then(|ns| self.namespace(ns).href.as_deref())
    }

    /// Returns the content of a text, CDATA, comment or PI node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::Comment { content }
            | NodeKind::CData { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// Returns the concatenated text content of a node and all its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => {
                buf.push_str(content);
            }
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    /// Returns the attribute ids of an element (empty for other nodes).
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[AttrId] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the namespaces declared on an element (empty for other nodes).
    #[must_use]
    pub fn ns_defs(&self, id: NodeId) -> &[NsId] {
        match &self.node(id).kind {
            NodeKind::Element { ns_defs, .. } => ns_defs,
            _ => &[],
        }
    }

    /// Looks up an attribute by qualified name.
    #[must_use]
    pub fn attribute_id(&self, id: NodeId, name: &str) -> Option<AttrId> {
        self.attributes(id)
            .iter()
            .copied()
            .find(|&a| self.attr(a).qualified_name() == name)
    }

    /// Returns an attribute's value by qualified name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.attribute_id(id, name)
            .map(|a| self.attr(a).value_string())
    }

    /// Returns an attribute's value by local name and namespace URI.
    #[must_use]
    pub fn attribute_ns(&self, id: NodeId, local: &str, href: &str) -> Option<String> {
        self.attributes(id)
            .iter()
            .map(|&a| self.attr(a))
            .find(|a| {
                a.name == local
                    && a.ns
                        .and_then(|ns| self.namespace(ns).href.as_deref())
                        == Some(href)
            })
            .map(AttrData::value_string)
    }

    /// Finds the namespace record in scope at `node` for `prefix`
    /// (`None` = default namespace), like libxml2's `xmlSearchNs`.
    ///
    /// The `xml` prefix only resolves if the document record already exists.
    #[must_use]
    pub fn search_ns(&self, node: NodeId, prefix: Option<&str>) -> Option<NsId> {
        if prefix == Some("xml") {
            return self.xml_ns;
        }
        for ancestor in self.ancestors(node) {
            for &ns in self.ns_defs(ancestor).iter().rev() {
                if self.namespace(ns).prefix.as_deref() == prefix {
                    return Some(ns);
                }
            }
        }
        None
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns the number of nodes in the arena, including the document node.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of attribute records.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attrs.len()
    }

    /// Returns the number of namespace records.
    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(doc: &mut Document, s: &str) -> NodeId {
        doc.create_text(s).unwrap()
    }

    #[test]
    fn test_new_document_has_root() {
        let doc = Document::new();
        assert!(matches!(doc.node(doc.root()).kind, NodeKind::Document));
        assert_eq!(doc.node_count(), 1);
        assert!(doc.well_formed);
    }

    #[test]
    fn test_create_document_records_version() {
        let doc = Document::create_document("1.1");
        assert_eq!(doc.version.as_deref(), Some("1.1"));
    }

    #[test]
    fn test_create_and_attach_element() {
        let mut doc = Document::new();
        let root = doc.root();
        let elem = doc.create_element("div").unwrap();
        doc.attach_child(root, elem).unwrap();

        assert_eq!(doc.first_child(root), Some(elem));
        assert_eq!(doc.last_child(root), Some(elem));
        assert_eq!(doc.parent(elem), Some(root));
        assert_eq!(doc.node_name(elem), Some("div"));
        assert_eq!(doc.root_element(), Some(elem));
    }

    #[test]
    fn test_create_element_splits_prefix() {
        let mut doc = Document::new();
        let elem = doc.create_element("svg:rect").unwrap();
        assert_eq!(doc.node_name(elem), Some("rect"));
        assert_eq!(doc.node_prefix(elem), Some("svg"));
    }

    #[test]
    fn test_attach_multiple_children() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = text(&mut doc, "A");
        let b = text(&mut doc, "B");
        let c = text(&mut doc, "C");
        doc.attach_child(root, a).unwrap();
        doc.attach_child(root, b).unwrap();
        doc.attach_child(root, c).unwrap();

        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.prev_sibling(c), Some(b));
        assert_eq!(doc.prev_sibling(a), None);
        assert_eq!(doc.next_sibling(c), None);
    }

    #[test]
    fn test_attach_rejects_parented_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        doc.attach_child(root, a).unwrap();
        doc.attach_child(a, b).unwrap();
        let err = doc.attach_child(root, b).unwrap_err();
        assert!(matches!(err, XmlError::InvalidArgument(_)));
        assert_eq!(doc.parent(b), Some(a));
    }

    #[test]
    fn test_attach_rejects_cycles_and_document_node() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("a").unwrap();
        doc.attach_child(root, a).unwrap();
        assert!(doc.attach_child(a, root).is_err());
        let b = doc.create_element("b").unwrap();
        doc.attach_child(a, b).unwrap();
        doc.detach(a);
        assert!(doc.attach_child(b, a).is_err());
        assert!(doc.attach_child(a, a).is_err());
    }

    #[test]
    fn test_attach_rejects_leaf_parent() {
        let mut doc = Document::new();
        let t = text(&mut doc, "x");
        let e = doc.create_element("e").unwrap();
        assert!(doc.attach_child(t, e).is_err());
    }

    #[test]
    fn test_attach_rejects_foreign_id() {
        let mut big = Document::new();
        let mut last = big.root();
        for _ in 0..5 {
            last = big.create_element("x").unwrap();
        }
        let mut small = Document::new();
        let root = small.root();
        let err = small.attach_child(root, last).unwrap_err();
        assert!(matches!(err, XmlError::InvalidArgument(_)));
    }

    #[test]
    fn test_detach() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = text(&mut doc, "A");
        let b = text(&mut doc, "B");
        let c = text(&mut doc, "C");
        doc.attach_child(root, a).unwrap();
        doc.attach_child(root, b).unwrap();
        doc.attach_child(root, c).unwrap();

        doc.detach(b);

        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(doc.parent(b), None);
        assert_eq!(doc.next_sibling(a), Some(c));
        assert_eq!(doc.prev_sibling(c), Some(a));

        // Detached nodes can be re-attached.
        doc.attach_child(root, b).unwrap();
        assert_eq!(doc.last_child(root), Some(b));
    }

    #[test]
    fn test_detach_only_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = text(&mut doc, "A");
        doc.attach_child(root, a).unwrap();
        doc.detach(a);
        assert_eq!(doc.first_child(root), None);
        assert_eq!(doc.last_child(root), None);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.create_element("p").unwrap();
        let a = text(&mut doc, "hello ");
        let b = doc.create_element("b").unwrap();
        let b_text = text(&mut doc, "world");
        doc.attach_child(root, p).unwrap();
        doc.attach_child(p, a).unwrap();
        doc.attach_child(p, b).unwrap();
        doc.attach_child(b, b_text).unwrap();

        assert_eq!(doc.ancestors(b_text).collect::<Vec<_>>(), vec![b_text, b, p, root]);
        assert_eq!(doc.descendants(root).collect::<Vec<_>>(), vec![p, a, b, b_text]);
        assert_eq!(doc.text_content(p), "hello world");
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let elem = doc.create_element("div").unwrap();
        doc.create_attribute(elem, "id", vec![ValuePart::Text("main".into())])
            .unwrap();
        let a = doc
            .create_attribute(
                elem,
                "title",
                vec![
                    ValuePart::Text("a ".into()),
                    ValuePart::EntityRef("nbsp".into()),
                ],
            )
            .unwrap();

        assert_eq!(doc.attribute(elem, "id").as_deref(), Some("main"));
        assert_eq!(doc.attribute(elem, "title").as_deref(), Some("a &nbsp;"));
        assert_eq!(doc.attribute(elem, "style"), None);
        assert_eq!(doc.attributes(elem).len(), 2);
        assert_eq!(doc.attr(a).element, elem);
        assert_eq!(doc.attr(a).atype, AttributeType::Cdata);
    }

    #[test]
    fn test_attribute_on_non_element_fails() {
        let mut doc = Document::new();
        let t = text(&mut doc, "x");
        assert!(doc.create_attribute(t, "a", Vec::new()).is_err());
    }

    #[test]
    fn test_namespace_records() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = doc.create_element("e").unwrap();
        doc.attach_child(root, e).unwrap();
        let ns = doc
            .create_namespace(NsOwner::Element(e), Some("p"), Some("urn:p"))
            .unwrap();
        let unbind = doc
            .create_namespace(NsOwner::Element(e), Some(""), Some(""))
            .unwrap();

        assert_eq!(doc.ns_defs(e), &[ns, unbind]);
        assert_eq!(doc.namespace(ns).prefix.as_deref(), Some("p"));
        assert!(doc.namespace(unbind).is_unbinding());
        assert_eq!(doc.namespace(unbind).prefix, None);

        let child = doc.create_element("c").unwrap();
        doc.attach_child(e, child).unwrap();
        assert_eq!(doc.search_ns(child, Some("p")), Some(ns));
        assert_eq!(doc.search_ns(child, None), Some(unbind));
        assert_eq!(doc.search_ns(child, Some("q")), None);
    }

    #[test]
    fn test_xml_namespace_is_cached() {
        let mut doc = Document::new();
        assert_eq!(doc.cached_xml_namespace(), None);
        let first = doc.xml_namespace().unwrap();
        let second = doc.xml_namespace().unwrap();
        assert_eq!(first, second);
        assert_eq!(doc.namespace_count(), 1);
        assert_eq!(doc.namespace(first).href.as_deref(), Some(XML_NAMESPACE));
        assert_eq!(doc.namespace(first).owner, NsOwner::Document);
    }

    #[test]
    fn test_node_limit_reports_out_of_memory() {
        let mut doc = Document::new();
        doc.set_node_limit(Some(3));
        doc.create_element("a").unwrap();
        doc.create_element("b").unwrap();
        assert_eq!(doc.create_element("c").unwrap_err(), XmlError::OutOfMemory);
    }

    #[test]
    fn test_trailing_text_merges() {
        let mut doc = Document::new();
        let e = doc.create_element("e").unwrap();
        let t = text(&mut doc, "ab");
        doc.attach_child(e, t).unwrap();
        doc.trailing_text_mut(e).unwrap().push_str("cd");
        assert_eq!(doc.node_text(t), Some("abcd"));
    }

    #[test]
    fn test_node_id_raw_roundtrip() {
        let mut doc = Document::new();
        let e = doc.create_element("e").unwrap();
        assert_eq!(NodeId::from_raw(e.into_raw()), Some(e));
        assert_eq!(NodeId::from_raw(0), None);
    }
}
