//! Exporting documents into C records, and their lifecycle.
//!
//! A parsed [`Document`] lives in arenas. C callers instead expect the
//! legacy pointer graph, so every document handed across the boundary is
//! exported once into heap records (`xmlDoc`, `xmlNode`, `xmlAttr`,
//! `xmlNs`) that the caller owns and releases with [`xmlFreeDoc`].

use std::collections::{HashMap, HashSet};
use std::ptr;

use super::strings::{free_xml_char, str_arg, to_xml_char, to_xml_char_opt};
use super::types::{
    xmlAttr, xmlAttributeType, xmlChar, xmlDoc, xmlElementType, xmlNode, xmlNs,
    XML_CHAR_ENCODING_UTF8, XML_DOC_USERBUILT, XML_DOC_WELLFORMED, XML_STANDALONE_UNSET,
};
use super::{clear_last_error, fail, parser_init};
use crate::tree::{AttributeType, Document, NodeId, NodeKind, NsId, NsOwner, ValuePart};

static TEXT_NAME: &[u8] = b"text\0";
static COMMENT_NAME: &[u8] = b"comment\0";

/// Exports `doc` into a freshly allocated record graph.
///
/// Only nodes reachable from the document node are exported. The result
/// must be released with [`xmlFreeDoc`].
pub(crate) fn export_document(doc: &Document) -> *mut xmlDoc {
    let standalone = match doc.standalone {
        Some(true) => 1,
        Some(false) => 0,
        None => XML_STANDALONE_UNSET,
    };
    let out = Box::into_raw(Box::new(xmlDoc {
        _private: ptr::null_mut(),
        type_: xmlElementType::XML_DOCUMENT_NODE,
        name: ptr::null_mut(),
        children: ptr::null_mut(),
        last: ptr::null_mut(),
        parent: ptr::null_mut(),
        next: ptr::null_mut(),
        prev: ptr::null_mut(),
        doc: ptr::null_mut(),
        compression: -1,
        standalone,
        intSubset: ptr::null_mut(),
        extSubset: ptr::null_mut(),
        oldNs: ptr::null_mut(),
        version: to_xml_char_opt(doc.version.as_deref()),
        encoding: to_xml_char_opt(doc.encoding.as_deref()),
        ids: ptr::null_mut(),
        refs: ptr::null_mut(),
        URL: to_xml_char_opt(doc.url.as_deref()),
        charset: XML_CHAR_ENCODING_UTF8,
        dict: ptr::null_mut(),
        psvi: ptr::null_mut(),
        parseFlags: doc.parse_flags,
        properties: if doc.well_formed { XML_DOC_WELLFORMED } else { 0 },
    }));

    let mut exporter = Exporter {
        src: doc,
        out,
        ns: HashMap::new(),
        elements: HashSet::new(),
    };
    // SAFETY: `out` was just allocated and is exclusively ours.
    unsafe {
        (*out).doc = out;
        if let Some(xml) = doc.cached_xml_namespace() {
            (*out).oldNs = exporter.namespace(xml);
        }
        exporter.export_children();
        exporter.adopt_stray_namespaces();
    }
    log::trace!("exported document with {} nodes", doc.node_count());
    out
}

struct Exporter<'d> {
    src: &'d Document,
    out: *mut xmlDoc,
    ns: HashMap<NsId, *mut xmlNs>,
    elements: HashSet<NodeId>,
}

impl Exporter<'_> {
    /// Returns the record for `id`, creating it on first use.
    fn namespace(&mut self, id: NsId) -> *mut xmlNs {
        if let Some(&ns) = self.ns.get(&id) {
            return ns;
        }
        let data = self.src.namespace(id);
        let ns = Box::into_raw(Box::new(xmlNs {
            next: ptr::null_mut(),
            type_: xmlElementType::XML_NAMESPACE_DECL,
            href: to_xml_char_opt(data.href.as_deref()),
            prefix: to_xml_char_opt(data.prefix.as_deref()),
            _private: ptr::null_mut(),
            context: self.out,
        }));
        self.ns.insert(id, ns);
        ns
    }

    /// Walks the arena depth-first without recursion, so deep documents
    /// cannot exhaust the native stack.
    unsafe fn export_children(&mut self) {
        let doc_parent = self.out.cast::<xmlNode>();
        let mut pending: Vec<(NodeId, *mut xmlNode)> = Vec::new();
        push_children(self.src, self.src.root(), doc_parent, &mut pending);
        while let Some((id, parent)) = pending.pop() {
            let node = self.node(id);
            // SAFETY: `parent` is the document or a node exported earlier
            // in this walk; both share the `children`/`last` prefix.
            unsafe { append_child(parent, node) };
            push_children(self.src, id, node, &mut pending);
        }
    }

    /// Chains records whose owner was not exported (hand-built trees can
    /// point at detached declarations) onto `oldNs`, so they are freed
    /// with the document.
    unsafe fn adopt_stray_namespaces(&mut self) {
        let xml = self.src.cached_xml_namespace();
        for (&id, &ns) in &self.ns {
            let linked = match self.src.namespace(id).owner {
                NsOwner::Document => Some(id) == xml,
                NsOwner::Element(e) => self.elements.contains(&e),
            };
            if !linked {
                // SAFETY: `ns` and the document are live records of this export.
                unsafe {
                    (*ns).next = (*self.out).oldNs;
                    (*self.out).oldNs = ns;
                }
            }
        }
    }

    fn node(&mut self, id: NodeId) -> *mut xmlNode {
        let data = self.src.node(id);
        let (type_, name, content) = match &data.kind {
            NodeKind::Element { name, prefix, .. } => {
                // An element whose prefix did not resolve keeps its
                // qualified name.
                let name = match (prefix, data.ns) {
                    (Some(p), None) => to_xml_char(&format!("{p}:{name}")),
                    _ => to_xml_char(name),
                };
                (xmlElementType::XML_ELEMENT_NODE, name.cast_const(), ptr::null_mut())
            }
            NodeKind::Text { content } => (
                xmlElementType::XML_TEXT_NODE,
                TEXT_NAME.as_ptr(),
                to_xml_char(content),
            ),
            NodeKind::CData { content } => (
                xmlElementType::XML_CDATA_SECTION_NODE,
                ptr::null(),
                to_xml_char(content),
            ),
            NodeKind::Comment { content } => (
                xmlElementType::XML_COMMENT_NODE,
                COMMENT_NAME.as_ptr(),
                to_xml_char(content),
            ),
            NodeKind::ProcessingInstruction { target, data } => (
                xmlElementType::XML_PI_NODE,
                to_xml_char(target).cast_const(),
                data.as_deref().map_or(ptr::null_mut(), to_xml_char),
            ),
            NodeKind::EntityRef { name } => (
                xmlElementType::XML_ENTITY_REF_NODE,
                to_xml_char(name).cast_const(),
                ptr::null_mut(),
            ),
            NodeKind::DocumentFragment | NodeKind::Document => (
                xmlElementType::XML_DOCUMENT_FRAG_NODE,
                ptr::null(),
                ptr::null_mut(),
            ),
        };
        let node = new_node(type_, name, content, self.out);
        let line = u16::try_from(data.line).unwrap_or(u16::MAX);
        // SAFETY: `node` was just allocated and is exclusively ours.
        unsafe {
            (*node).line = line;
            if data.kind.is_element() {
                self.elements.insert(id);
                (*node).nsDef = self.ns_defs(id);
                (*node).ns = data.ns.map_or(ptr::null_mut(), |ns| self.namespace(ns));
                (*node).properties = self.attributes(id, node);
            }
        }
        node
    }

    fn ns_defs(&mut self, element: NodeId) -> *mut xmlNs {
        let mut head: *mut xmlNs = ptr::null_mut();
        let mut tail: *mut xmlNs = ptr::null_mut();
        for &id in self.src.ns_defs(element) {
            let ns = self.namespace(id);
            if tail.is_null() {
                head = ns;
            } else {
                // SAFETY: `tail` is a record created by `namespace`.
                unsafe { (*tail).next = ns };
            }
            tail = ns;
        }
        head
    }

    fn attributes(&mut self, element: NodeId, owner: *mut xmlNode) -> *mut xmlAttr {
        let mut head: *mut xmlAttr = ptr::null_mut();
        let mut tail: *mut xmlAttr = ptr::null_mut();
        for &id in self.src.attributes(element) {
            let data = self.src.attr(id);
            let name = match (&data.prefix, data.ns) {
                (Some(p), None) => to_xml_char(&format!("{p}:{}", data.name)),
                _ => to_xml_char(&data.name),
            };
            let ns = data.ns.map_or(ptr::null_mut(), |ns| self.namespace(ns));
            let attr = Box::into_raw(Box::new(xmlAttr {
                _private: ptr::null_mut(),
                type_: xmlElementType::XML_ATTRIBUTE_NODE,
                name,
                children: ptr::null_mut(),
                last: ptr::null_mut(),
                parent: owner,
                next: ptr::null_mut(),
                prev: tail,
                doc: self.out,
                ns,
                atype: attribute_type(data.atype),
                psvi: ptr::null_mut(),
            }));
            for part in &data.value {
                let child = match part {
                    ValuePart::Text(text) => new_node(
                        xmlElementType::XML_TEXT_NODE,
                        TEXT_NAME.as_ptr(),
                        to_xml_char(text),
                        self.out,
                    ),
                    ValuePart::EntityRef(name) => new_node(
                        xmlElementType::XML_ENTITY_REF_NODE,
                        to_xml_char(name),
                        ptr::null_mut(),
                        self.out,
                    ),
                };
                // SAFETY: `attr` starts with the same prefix as `xmlNode`
                // up to `last`, so it can act as a parent.
                unsafe { append_child(attr.cast::<xmlNode>(), child) };
            }
            if tail.is_null() {
                head = attr;
            } else {
                // SAFETY: `tail` is the attribute created last iteration.
                unsafe { (*tail).next = attr };
            }
            tail = attr;
        }
        head
    }
}

fn push_children(
    doc: &Document,
    id: NodeId,
    parent: *mut xmlNode,
    pending: &mut Vec<(NodeId, *mut xmlNode)>,
) {
    let start = pending.len();
    pending.extend(doc.children(id).map(|child| (child, parent)));
    // Popped from the end, so reverse to keep document order.
    pending[start..].reverse();
}

fn new_node(
    type_: xmlElementType,
    name: *const xmlChar,
    content: *mut xmlChar,
    doc: *mut xmlDoc,
) -> *mut xmlNode {
    Box::into_raw(Box::new(xmlNode {
        _private: ptr::null_mut(),
        type_,
        name,
        children: ptr::null_mut(),
        last: ptr::null_mut(),
        parent: ptr::null_mut(),
        next: ptr::null_mut(),
        prev: ptr::null_mut(),
        doc,
        ns: ptr::null_mut(),
        content,
        properties: ptr::null_mut(),
        nsDef: ptr::null_mut(),
        psvi: ptr::null_mut(),
        line: 0,
        extra: 0,
    }))
}

/// Links `child` as the last child of `parent`.
///
/// # Safety
///
/// Both pointers must be live records; `parent` may be a document or an
/// attribute viewed through the common node prefix.
unsafe fn append_child(parent: *mut xmlNode, child: *mut xmlNode) {
    // SAFETY: both records are live per the caller contract.
    unsafe {
        (*child).parent = parent;
        let last = (*parent).last;
        if last.is_null() {
            (*parent).children = child;
        } else {
            (*last).next = child;
            (*child).prev = last;
        }
        (*parent).last = child;
    }
}

fn attribute_type(atype: AttributeType) -> xmlAttributeType {
    match atype {
        AttributeType::Cdata => xmlAttributeType::XML_ATTRIBUTE_CDATA,
        AttributeType::Id => xmlAttributeType::XML_ATTRIBUTE_ID,
        AttributeType::Idref => xmlAttributeType::XML_ATTRIBUTE_IDREF,
        AttributeType::Idrefs => xmlAttributeType::XML_ATTRIBUTE_IDREFS,
        AttributeType::Entity => xmlAttributeType::XML_ATTRIBUTE_ENTITY,
        AttributeType::Entities => xmlAttributeType::XML_ATTRIBUTE_ENTITIES,
        AttributeType::Nmtoken => xmlAttributeType::XML_ATTRIBUTE_NMTOKEN,
        AttributeType::Nmtokens => xmlAttributeType::XML_ATTRIBUTE_NMTOKENS,
        AttributeType::Enumeration => xmlAttributeType::XML_ATTRIBUTE_ENUMERATION,
        AttributeType::Notation => xmlAttributeType::XML_ATTRIBUTE_NOTATION,
    }
}

// --- Release ---

/// Frees a sibling chain and everything below it.
///
/// # Safety
///
/// Every node in the chain must have been created by this module and not
/// freed yet.
unsafe fn free_node_list(first: *mut xmlNode) {
    // SAFETY: forwarded from the caller.
    unsafe {
        release_walk(first, |node| free_node_fields(&node));
    }
}

/// Takes ownership of every node of a sibling chain and its subtrees, a
/// node's children before its following siblings.
///
/// # Safety
///
/// As for [`free_node_list`].
unsafe fn release_walk(first: *mut xmlNode, mut visit: impl FnMut(Box<xmlNode>)) {
    let mut pending = vec![first];
    while let Some(cur) = pending.pop() {
        if cur.is_null() {
            continue;
        }
        // SAFETY: `cur` came from `Box::into_raw` in `new_node`.
        let node = unsafe { Box::from_raw(cur) };
        pending.push(node.next);
        pending.push(node.children);
        visit(node);
    }
}

/// Releases what a node record owns besides its children.
unsafe fn free_node_fields(node: &xmlNode) {
    // SAFETY: attribute and namespace lists and strings are owned by `node`.
    unsafe {
        free_attr_list(node.properties);
        free_ns_list(node.nsDef);
        if matches!(
            node.type_,
            xmlElementType::XML_ELEMENT_NODE
                | xmlElementType::XML_PI_NODE
                | xmlElementType::XML_ENTITY_REF_NODE
        ) {
            free_xml_char(node.name);
        }
        free_xml_char(node.content);
    }
}

unsafe fn free_attr_list(mut cur: *mut xmlAttr) {
    while !cur.is_null() {
        // SAFETY: `cur` came from `Box::into_raw` in `Exporter::attributes`.
        let attr = unsafe { Box::from_raw(cur) };
        cur = attr.next;
        // SAFETY: the value nodes and name are owned by `attr`.
        unsafe {
            free_node_list(attr.children);
            free_xml_char(attr.name);
        }
    }
}

unsafe fn free_ns_list(mut cur: *mut xmlNs) {
    while !cur.is_null() {
        // SAFETY: `cur` came from `Box::into_raw` in `Exporter::namespace`.
        let ns = unsafe { Box::from_raw(cur) };
        cur = ns.next;
        // SAFETY: both strings are owned by `ns`.
        unsafe {
            free_xml_char(ns.href);
            free_xml_char(ns.prefix);
        }
    }
}

/// Frees `doc` and every record reachable from it.
///
/// # Safety
///
/// `doc` must come from [`export_document`] and not be freed yet.
pub(crate) unsafe fn free_document(doc: *mut xmlDoc) {
    // SAFETY: `doc` came from `Box::into_raw` in `export_document`.
    let doc = unsafe { Box::from_raw(doc) };
    // SAFETY: children, `oldNs` and strings are owned by the document.
    unsafe {
        free_node_list(doc.children);
        free_ns_list(doc.oldNs);
        free_xml_char(doc.version);
        free_xml_char(doc.encoding);
        free_xml_char(doc.URL);
        free_xml_char(doc.name.cast::<xmlChar>());
    }
}

// --- Entry points ---

/// Creates an empty document. A null `version` means `"1.0"`.
///
/// Returns null (and sets the last error) if `version` is not UTF-8.
#[no_mangle]
pub unsafe extern "C" fn xmlNewDoc(version: *const xmlChar) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: caller passes null or a NUL-terminated string.
    let version = match unsafe { str_arg(version.cast(), "version") } {
        Ok(v) => v.unwrap_or("1.0"),
        Err(e) => return fail(&e),
    };
    let doc = export_document(&Document::create_document(version));
    // SAFETY: `doc` was just exported and is exclusively ours.
    unsafe { (*doc).properties |= XML_DOC_USERBUILT };
    doc
}

/// Frees a document and all of its nodes, attributes and namespaces.
///
/// Passing null is safe and does nothing.
#[no_mangle]
pub unsafe extern "C" fn xmlFreeDoc(doc: *mut xmlDoc) {
    if !doc.is_null() {
        // SAFETY: `doc` was returned by a constructor of this library.
        unsafe { free_document(doc) };
    }
}
