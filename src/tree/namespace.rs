//! Namespace and attribute records owned by a [`Document`](super::Document).

use super::NodeId;

/// The namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace URI of `xmlns` declarations themselves.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Who owns a namespace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NsOwner {
    /// Held by the document itself (the cached `xml` namespace).
    Document,
    /// Declared on an element and listed in its `ns_defs`.
    Element(NodeId),
}

/// A namespace record.
///
/// Identity is by record: two elements in the scope of the same declaration
/// point at the same `NsId`, not at two records with equal strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsData {
    /// The bound prefix, or `None` for the default namespace.
    pub prefix: Option<String>,
    /// The namespace URI, or `None` for an `xmlns=""` unbinding.
    pub href: Option<String>,
    /// The owning element or document.
    pub owner: NsOwner,
}

impl NsData {
    /// Returns `true` if this record is an `xmlns=""` unbinding.
    #[must_use]
    pub fn is_unbinding(&self) -> bool {
        self.href.is_none()
    }
}

/// Attribute classification, mirroring libxml2's `xmlAttributeType`.
///
/// Everything parsed by the core is `Cdata`; a validation layer may
/// reclassify attributes later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeType {
    #[default]
    Cdata,
    Id,
    Idref,
    Idrefs,
    Entity,
    Entities,
    Nmtoken,
    Nmtokens,
    Enumeration,
    Notation,
}

/// One piece of a decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuePart {
    /// Literal text (predefined and character references already decoded).
    Text(String),
    /// An unexpanded reference to a non-predefined entity.
    EntityRef(String),
}

/// An attribute record, owned by the element it appears on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrData {
    /// The local part of the attribute name.
    pub name: String,
    /// Prefix as written in the source, if any.
    pub prefix: Option<String>,
    /// Resolved namespace; unprefixed attributes never have one.
    pub ns: Option<super::NsId>,
    /// Attribute classification (CDATA unless a schema layer says otherwise).
    pub atype: AttributeType,
    /// Decoded value, as text and entity-reference parts.
    pub value: Vec<ValuePart>,
    /// The owning element.
    pub element: NodeId,
}

impl AttrData {
    /// Returns the qualified name (`prefix:name` or `name`).
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Returns the value as a string, re-serializing entity references
    /// as `&name;`.
    #[must_use]
    pub fn value_string(&self) -> String {
        value_to_string(&self.value)
    }
}

/// Renders value parts as text, entity references as `&name;`.
pub(crate) fn value_to_string(parts: &[ValuePart]) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            ValuePart::Text(t) => out.push_str(t),
            ValuePart::EntityRef(name) => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
        }
    }
    out
}
