//! Textual tree dump in the style of `xmllint --debug`.
//!
//! Two documents with the same structure, names, namespaces and content
//! produce the same dump, whatever their arena ids are. The push tests use
//! this to compare chunked parses against one-shot parses.

use std::fmt::Write;

use super::{Document, NodeId, NodeKind, ValuePart};

/// Renders `doc` as an indented outline, one construct per line.
///
/// ```
/// use libxml2_rs::Document;
/// use libxml2_rs::tree::dump::debug_dump;
///
/// let doc = Document::parse_str("<a x='1'>hi</a>").unwrap();
/// let dump = debug_dump(&doc);
/// assert!(dump.contains("  ELEMENT a\n"));
/// assert!(dump.contains("    ATTRIBUTE x\n"));
/// ```
#[must_use]
pub fn debug_dump(doc: &Document) -> String {
    let mut out = String::from("DOCUMENT\n");
    if let Some(version) = &doc.version {
        let _ = writeln!(out, "version={version}");
    }
    if let Some(encoding) = &doc.encoding {
        let _ = writeln!(out, "encoding={encoding}");
    }
    if let Some(standalone) = doc.standalone {
        let _ = writeln!(out, "standalone={standalone}");
    }
    if let Some(url) = &doc.url {
        let _ = writeln!(out, "URL={url}");
    }
    for child in doc.children(doc.root()) {
        dump_node(doc, child, 1, &mut out);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn content_line(out: &mut String, depth: usize, content: &str) {
    indent(out, depth);
    out.push_str("content=");
    for c in content.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\n');
}

fn dump_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let node = doc.node(id);
    indent(out, depth);
    match &node.kind {
        NodeKind::Element { name, prefix, .. } => {
            out.push_str("ELEMENT ");
            if let Some(p) = prefix {
                let _ = write!(out, "{p}:");
            }
            out.push_str(name);
            if let Some(href) = doc.node_namespace(id) {
                let _ = write!(out, " {{{href}}}");
            }
            out.push('\n');
            for &ns in doc.ns_defs(id) {
                let ns = doc.namespace(ns);
                indent(out, depth + 1);
                let _ = writeln!(
                    out,
                    "namespace {} href={}",
                    ns.prefix.as_deref().unwrap_or("(default)"),
                    ns.href.as_deref().unwrap_or("")
                );
            }
            for &attr_id in doc.attributes(id) {
                let attr = doc.attr(attr_id);
                indent(out, depth + 1);
                let _ = write!(out, "ATTRIBUTE {}", attr.qualified_name());
                if let Some(ns) = attr.ns {
                    let href = doc.namespace(ns).href.as_deref().unwrap_or("");
                    let _ = write!(out, " {{{href}}}");
                }
                out.push('\n');
                for part in &attr.value {
                    indent(out, depth + 2);
                    match part {
                        ValuePart::Text(text) => {
                            out.push_str("TEXT\n");
                            content_line(out, depth + 3, text);
                        }
                        ValuePart::EntityRef(name) => {
                            let _ = writeln!(out, "ENTITY_REF({name})");
                        }
                    }
                }
            }
            for child in doc.children(id) {
                dump_node(doc, child, depth + 1, out);
            }
        }
        NodeKind::Text { content } | NodeKind::CData { content } | NodeKind::Comment { content } => {
            out.push_str(node.kind.label());
            out.push('\n');
            content_line(out, depth + 1, content);
        }
        NodeKind::ProcessingInstruction { target, data } => {
            let _ = writeln!(out, "PI {target}");
            if let Some(data) = data {
                content_line(out, depth + 1, data);
            }
        }
        NodeKind::EntityRef { name } => {
            let _ = writeln!(out, "ENTITY_REF({name})");
        }
        NodeKind::Document | NodeKind::DocumentFragment => {
            out.push_str(node.kind.label());
            out.push('\n');
            for child in doc.children(id) {
                dump_node(doc, child, depth + 1, out);
            }
        }
    }
}
