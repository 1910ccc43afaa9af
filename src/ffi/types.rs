//! Fixed-layout records shared with C callers.
//!
//! Field order and widths match the legacy `tree.h` / `parser.h` headers,
//! so a C program compiled against them can walk an exported tree
//! directly. Records are produced by [`super::document`] and released by
//! [`xmlFreeDoc`](super::document::xmlFreeDoc).
#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::{c_char, c_int, c_ushort, c_void};

/// Byte type of all tree strings (UTF-8, NUL terminated).
pub type xmlChar = u8;

/// Node type tag stored in the `type_` field of every record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum xmlElementType {
    XML_ELEMENT_NODE = 1,
    XML_ATTRIBUTE_NODE = 2,
    XML_TEXT_NODE = 3,
    XML_CDATA_SECTION_NODE = 4,
    XML_ENTITY_REF_NODE = 5,
    XML_ENTITY_NODE = 6,
    XML_PI_NODE = 7,
    XML_COMMENT_NODE = 8,
    XML_DOCUMENT_NODE = 9,
    XML_DOCUMENT_TYPE_NODE = 10,
    XML_DOCUMENT_FRAG_NODE = 11,
    XML_NOTATION_NODE = 12,
    XML_HTML_DOCUMENT_NODE = 13,
    XML_DTD_NODE = 14,
    XML_ELEMENT_DECL = 15,
    XML_ATTRIBUTE_DECL = 16,
    XML_ENTITY_DECL = 17,
    XML_NAMESPACE_DECL = 18,
    XML_XINCLUDE_START = 19,
    XML_XINCLUDE_END = 20,
}

/// Declared type of an attribute.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum xmlAttributeType {
    XML_ATTRIBUTE_CDATA = 1,
    XML_ATTRIBUTE_ID = 2,
    XML_ATTRIBUTE_IDREF = 3,
    XML_ATTRIBUTE_IDREFS = 4,
    XML_ATTRIBUTE_ENTITY = 5,
    XML_ATTRIBUTE_ENTITIES = 6,
    XML_ATTRIBUTE_NMTOKEN = 7,
    XML_ATTRIBUTE_NMTOKENS = 8,
    XML_ATTRIBUTE_ENUMERATION = 9,
    XML_ATTRIBUTE_NOTATION = 10,
}

/// A namespace binding. Element-owned records are chained through `next`
/// on the element's `nsDef`; the document's `xml` record hangs off
/// `xmlDoc::oldNs`.
#[repr(C)]
#[derive(Debug)]
pub struct xmlNs {
    pub next: *mut xmlNs,
    pub type_: xmlElementType,
    pub href: *const xmlChar,
    pub prefix: *const xmlChar,
    pub _private: *mut c_void,
    pub context: *mut xmlDoc,
}

#[repr(C)]
#[derive(Debug)]
pub struct xmlNode {
    pub _private: *mut c_void,
    pub type_: xmlElementType,
    pub name: *const xmlChar,
    pub children: *mut xmlNode,
    pub last: *mut xmlNode,
    pub parent: *mut xmlNode,
    pub next: *mut xmlNode,
    pub prev: *mut xmlNode,
    pub doc: *mut xmlDoc,
    pub ns: *mut xmlNs,
    pub content: *mut xmlChar,
    pub properties: *mut xmlAttr,
    pub nsDef: *mut xmlNs,
    pub psvi: *mut c_void,
    pub line: c_ushort,
    pub extra: c_ushort,
}

/// An attribute. Its value is the `children` list: Text nodes and, for
/// references to undeclared entities, EntityRef nodes.
#[repr(C)]
#[derive(Debug)]
pub struct xmlAttr {
    pub _private: *mut c_void,
    pub type_: xmlElementType,
    pub name: *const xmlChar,
    pub children: *mut xmlNode,
    pub last: *mut xmlNode,
    pub parent: *mut xmlNode,
    pub next: *mut xmlAttr,
    pub prev: *mut xmlAttr,
    pub doc: *mut xmlDoc,
    pub ns: *mut xmlNs,
    pub atype: xmlAttributeType,
    pub psvi: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct xmlDoc {
    pub _private: *mut c_void,
    pub type_: xmlElementType,
    pub name: *mut c_char,
    pub children: *mut xmlNode,
    pub last: *mut xmlNode,
    pub parent: *mut xmlNode,
    pub next: *mut xmlNode,
    pub prev: *mut xmlNode,
    pub doc: *mut xmlDoc,
    pub compression: c_int,
    pub standalone: c_int,
    pub intSubset: *mut c_void,
    pub extSubset: *mut c_void,
    pub oldNs: *mut xmlNs,
    pub version: *const xmlChar,
    pub encoding: *const xmlChar,
    pub ids: *mut c_void,
    pub refs: *mut c_void,
    pub URL: *const xmlChar,
    pub charset: c_int,
    pub dict: *mut c_void,
    pub psvi: *mut c_void,
    pub parseFlags: c_int,
    pub properties: c_int,
}

/// The caller-visible part of a parser context.
///
/// `doc` holds the result of the last [`xmlParseDocument`] or terminating
/// [`xmlParseChunk`] call; the caller takes ownership of it.
///
/// [`xmlParseDocument`]: super::parser::xmlParseDocument
/// [`xmlParseChunk`]: super::push::xmlParseChunk
#[repr(C)]
#[derive(Debug)]
pub struct xmlParserCtxt {
    pub doc: *mut xmlDoc,
    pub wellFormed: c_int,
    pub options: c_int,
    pub input: *const c_char,
    pub input_size: c_int,
    pub base_url: *const c_char,
    pub encoding: *const c_char,
}

pub type xmlNodePtr = *mut xmlNode;
pub type xmlDocPtr = *mut xmlDoc;
pub type xmlParserCtxtPtr = *mut xmlParserCtxt;

/// Reads up to `len` bytes into `buffer`. Returns the byte count, 0 at end
/// of input, or a negative value on error.
pub type xmlInputReadCallback =
    Option<unsafe extern "C" fn(context: *mut c_void, buffer: *mut c_char, len: c_int) -> c_int>;

/// Releases the read context. Called exactly once per read.
pub type xmlInputCloseCallback = Option<unsafe extern "C" fn(context: *mut c_void) -> c_int>;

/// Value of `xmlDoc::standalone` when the declaration omits it.
pub const XML_STANDALONE_UNSET: c_int = -1;

/// `xmlDoc::properties` bit set on documents parsed without errors.
pub const XML_DOC_WELLFORMED: c_int = 1 << 0;

/// `xmlDoc::properties` bit set on documents built through `xmlNewDoc`.
pub const XML_DOC_USERBUILT: c_int = 1 << 5;

/// `xmlDoc::charset` value for UTF-8.
pub const XML_CHAR_ENCODING_UTF8: c_int = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_enum_values() {
        assert_eq!(xmlElementType::XML_ELEMENT_NODE as c_int, 1);
        assert_eq!(xmlElementType::XML_ENTITY_REF_NODE as c_int, 5);
        assert_eq!(xmlElementType::XML_DOCUMENT_NODE as c_int, 9);
        assert_eq!(xmlElementType::XML_NAMESPACE_DECL as c_int, 18);
        assert_eq!(xmlElementType::XML_XINCLUDE_END as c_int, 20);
        assert_eq!(xmlAttributeType::XML_ATTRIBUTE_NOTATION as c_int, 10);
        assert_eq!(size_of::<xmlElementType>(), size_of::<c_int>());
    }

    #[test]
    fn test_node_and_attr_share_prefix() {
        // Callers walk properties and children through a common prefix.
        assert_eq!(offset_of!(xmlNode, type_), offset_of!(xmlAttr, type_));
        assert_eq!(offset_of!(xmlNode, name), offset_of!(xmlAttr, name));
        assert_eq!(offset_of!(xmlNode, children), offset_of!(xmlAttr, children));
        assert_eq!(offset_of!(xmlNode, parent), offset_of!(xmlAttr, parent));
        assert_eq!(offset_of!(xmlNode, doc), offset_of!(xmlAttr, doc));
        assert_eq!(offset_of!(xmlNode, children), offset_of!(xmlDoc, children));
        assert_eq!(offset_of!(xmlNode, doc), offset_of!(xmlDoc, doc));
    }

    #[test]
    fn test_line_field_is_last_pair() {
        // `type_` is padded to pointer width, so 14 pointer slots precede `line`.
        assert_eq!(offset_of!(xmlNode, line), 14 * size_of::<*mut c_void>());
        assert_eq!(offset_of!(xmlNode, extra), offset_of!(xmlNode, line) + 2);
    }
}
