//! xmllint-compatible CLI tool.
//!
//! Parses each input file, reports problems the way libxml2's `xmllint`
//! does, and writes the tree back out (or dumps its structure with
//! `--debug`). `--push N` feeds the input through the push parser in
//! `N`-byte chunks, which must produce the same tree as a one-shot parse.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use libxml2_rs::error::ParseError;
use libxml2_rs::parser::{self, ParseOptions, ParserContext};
use libxml2_rs::tree::dump::debug_dump;
use libxml2_rs::tree::{Document, NodeId, NodeKind, ValuePart};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// xmllint -- parse XML files and check that they are well-formed.
#[derive(Parser, Debug)]
#[command(name = "xmllint", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// XML files to process (use `-` for stdin).
    #[arg(required = true)]
    files: Vec<String>,

    /// Recover from parsing errors (produce partial tree).
    #[arg(long)]
    recover: bool,

    /// Feed the input to the push parser in chunks of this many bytes.
    #[arg(long, value_name = "N")]
    push: Option<usize>,

    /// Remove ignorable blank (whitespace-only) text nodes.
    #[arg(long)]
    noblanks: bool,

    /// Do not output the result tree.
    #[arg(long)]
    noout: bool,

    /// Print a debug representation of the document tree.
    #[arg(long)]
    debug: bool,

    /// Decode the input with this encoding, ignoring any declaration.
    #[arg(long, value_name = "ENC")]
    encoding: Option<String>,

    /// Relax hard-coded parser limits (depth, name length).
    #[arg(long)]
    huge: bool,

    /// Print timing information for reading and parsing.
    #[arg(long)]
    timing: bool,
}

// ---------------------------------------------------------------------------
// Exit codes (matching libxml2 xmllint conventions)
// ---------------------------------------------------------------------------

const EXIT_SUCCESS: u8 = 0;
const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_READ_ERROR: u8 = 2;

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut worst_exit: u8 = EXIT_SUCCESS;

    for file in &cli.files {
        let exit = process_file(&cli, file);
        if exit > worst_exit {
            worst_exit = exit;
        }
    }

    ExitCode::from(worst_exit)
}

/// Processes a single input file and returns an exit code.
fn process_file(cli: &Cli, filename: &str) -> u8 {
    let start_read = Instant::now();
    let input = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_READ_ERROR;
        }
    };
    if cli.timing {
        eprintln!("Reading file {filename} took {:?}", start_read.elapsed());
    }

    let start_parse = Instant::now();
    let options = parse_options(cli, filename);
    let parsed = match cli.push {
        Some(chunk) => parse_pushed(&input, chunk, &options),
        None => parser::parse_bytes_with_options(&input, &options),
    };
    if cli.timing {
        eprintln!("Parsing took {:?}", start_parse.elapsed());
    }

    let doc = match parsed {
        Ok(doc) => doc,
        Err(err) => {
            for diag in &err.diagnostics {
                eprintln!("{filename}:{diag}");
            }
            eprintln!("{filename}: {}", err.error);
            return EXIT_PARSE_ERROR;
        }
    };
    for diag in &doc.diagnostics {
        eprintln!("{filename}:{diag}");
    }
    let exit_code = if doc.well_formed {
        EXIT_SUCCESS
    } else {
        EXIT_PARSE_ERROR
    };

    if cli.debug {
        write_output(&debug_dump(&doc));
    } else if !cli.noout {
        write_output(&serialize_document(&doc));
    }
    exit_code
}

fn parse_options(cli: &Cli, filename: &str) -> ParseOptions {
    let mut options = ParseOptions::default()
        .recover(cli.recover)
        .no_blanks(cli.noblanks)
        .huge(cli.huge);
    if let Some(enc) = &cli.encoding {
        options = options.encoding(enc.as_str());
    }
    if filename != "-" {
        options = options.base_url(filename);
    }
    options
}

// ---------------------------------------------------------------------------
// Input reading and parsing
// ---------------------------------------------------------------------------

/// Reads input from a file or stdin (when filename is `-`).
fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}

/// Feeds `input` through a push context, `chunk` bytes at a time.
fn parse_pushed(input: &[u8], chunk: usize, options: &ParseOptions) -> Result<Document, ParseError> {
    let mut ctx = ParserContext::new_push(options.clone())?;
    let fail = |ctx: &ParserContext<'_>, error| ParseError {
        error,
        diagnostics: ctx.diagnostics().to_vec(),
    };
    for piece in input.chunks(chunk.max(1)) {
        ctx.feed_chunk(piece).map_err(|e| fail(&ctx, e))?;
    }
    ctx.terminate().map_err(|e| fail(&ctx, e))?;
    ctx.take_document()
        .ok_or_else(|| fail(&ctx, libxml2_rs::XmlError::InvalidArgument("no document".into())))
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Writes the document back out as XML.
fn serialize_document(doc: &Document) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<?xml version=\"{}\"",
        doc.version.as_deref().unwrap_or("1.0")
    );
    if let Some(enc) = &doc.encoding {
        let _ = write!(out, " encoding=\"{enc}\"");
    }
    if let Some(standalone) = doc.standalone {
        let _ = write!(out, " standalone=\"{}\"", if standalone { "yes" } else { "no" });
    }
    out.push_str("?>\n");
    for child in doc.children(doc.root()) {
        serialize_node_recursive(doc, child, &mut out);
        out.push('\n');
    }
    out
}

/// Recursively serializes a node and its subtree.
fn serialize_node_recursive(doc: &Document, id: NodeId, out: &mut String) {
    match &doc.node(id).kind {
        NodeKind::Element { name, prefix, .. } => {
            let qname = match prefix {
                Some(pfx) => format!("{pfx}:{name}"),
                None => name.clone(),
            };
            out.push('<');
            out.push_str(&qname);
            for &ns in doc.ns_defs(id) {
                let ns = doc.namespace(ns);
                match &ns.prefix {
                    Some(p) => {
                        let _ = write!(out, " xmlns:{p}=\"");
                    }
                    None => out.push_str(" xmlns=\""),
                }
                escape_into(out, ns.href.as_deref().unwrap_or(""), true);
                out.push('"');
            }
            for &attr in doc.attributes(id) {
                let attr = doc.attr(attr);
                let _ = write!(out, " {}=\"", attr.qualified_name());
                for part in &attr.value {
                    match part {
                        ValuePart::Text(text) => escape_into(out, text, true),
                        ValuePart::EntityRef(name) => {
                            let _ = write!(out, "&{name};");
                        }
                    }
                }
                out.push('"');
            }
            if doc.first_child(id).is_none() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in doc.children(id) {
                    serialize_node_recursive(doc, child, out);
                }
                let _ = write!(out, "</{qname}>");
            }
        }
        NodeKind::Text { content } => escape_into(out, content, false),
        NodeKind::CData { content } => {
            let _ = write!(out, "<![CDATA[{content}]]>");
        }
        NodeKind::Comment { content } => {
            let _ = write!(out, "<!--{content}-->");
        }
        NodeKind::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(d) = data {
                out.push(' ');
                out.push_str(d);
            }
            out.push_str("?>");
        }
        NodeKind::EntityRef { name } => {
            let _ = write!(out, "&{name};");
        }
        NodeKind::DocumentFragment | NodeKind::Document => {
            for child in doc.children(id) {
                serialize_node_recursive(doc, child, out);
            }
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            c => out.push(c),
        }
    }
}

/// Writes output to stdout.
fn write_output(content: &str) {
    print!("{content}");
    // Flush stdout to ensure output is complete, especially when piped.
    let _ = io::stdout().flush();
}
