//! Node type definitions.
//!
//! The `NodeKind` enum represents all node types in an XML document tree,
//! corresponding to libxml2's `xmlElementType`. Each variant carries the
//! node-type-specific payload (e.g., element name and attributes, text content).

use super::{AttrId, NsId};

/// The kind of an XML node and its associated data.
///
/// This enum carries the payload for each node type. Navigation links
/// (parent, children, siblings) and the resolved namespace are stored in
/// `NodeData`, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node. There is exactly one per `Document`.
    Document,

    /// An element node, e.g., `<svg:rect width="3">`.
    Element {
        /// The local part of the element name.
        name: String,
        /// Namespace prefix as written in the source (`"svg"` above), if any.
        prefix: Option<String>,
        /// Attributes owned by this element, in document order.
        attributes: Vec<AttrId>,
        /// Namespaces declared on this element (`xmlns` / `xmlns:p`).
        ns_defs: Vec<NsId>,
    },

    /// A text node containing character data.
    Text {
        /// The text content (predefined and character references decoded).
        content: String,
    },

    /// A CDATA section, e.g., `<![CDATA[...]]>`.
    CData {
        /// The CDATA content (no escaping applied).
        content: String,
    },

    /// A comment node, e.g., `<!-- ... -->`.
    Comment {
        /// The comment text (without the `<!--` and `-->` delimiters).
        content: String,
    },

    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction {
        /// The PI target (e.g., `"xml-stylesheet"`).
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A reference to an entity that is not one of the five predefined ones.
    ///
    /// The core never expands such references; it keeps them as nodes.
    EntityRef {
        /// The entity name (without `&` and `;`).
        name: String,
    },

    /// A detached fragment used as a temporary container.
    DocumentFragment,
}

impl NodeKind {
    /// Returns `true` if nodes of this kind may own children.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Document | Self::Element { .. } | Self::DocumentFragment
        )
    }

    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Short upper-case label used by the debug dump and log messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT",
            Self::Element { .. } => "ELEMENT",
            Self::Text { .. } => "TEXT",
            Self::CData { .. } => "CDATA",
            Self::Comment { .. } => "COMMENT",
            Self::ProcessingInstruction { .. } => "PI",
            Self::EntityRef { .. } => "ENTITY_REF",
            Self::DocumentFragment => "FRAGMENT",
        }
    }
}
