//! Resumable tokenizer for decoded XML text.
//!
//! The [`Scanner`] turns UTF-8 text into structural [`Token`]s. Input may
//! arrive in arbitrary pieces: [`Scanner::feed`] appends text, and
//! [`Scanner::next_token`] returns [`Scan::NeedMore`] whenever the buffered
//! text ends inside a construct. The construct's start, the position scanning
//! stopped at and its lexical state (open quote, bracket depth, whether an
//! internal-subset comment is open) are recorded in a pending record, so the
//! next call picks up from the exact byte where the previous one gave up.
//!
//! Character data is only emitted once it is terminated by markup or by the
//! end of input. Token boundaries therefore never depend on how the input was
//! split.
//!
//! Line endings are normalized (`\r\n` and lone `\r` become `\n`) as text is
//! fed, and all offsets refer to the normalized stream.

use memchr::memmem;

use crate::error::{SourceLocation, SyntaxKind, XmlError};
use crate::parser::input::{
    decode_char_ref, is_name, is_name_char, is_name_start_char, is_xml_char, is_xml_whitespace,
    predefined_entity,
};

/// Consumed text is dropped from the buffer once it exceeds this size.
const COMPACT_THRESHOLD: usize = 8 * 1024;

/// A structural token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// The body of an `<?xml ...?>` declaration at the very start of input.
    XmlDecl(String),
    /// A start tag or empty-element tag.
    StartTag {
        /// The qualified element name.
        name: String,
        /// Everything between the name and the closing `>` or `/>`.
        attrs_raw: String,
        /// `true` for `<name/>`.
        empty: bool,
    },
    /// An end tag, carrying the qualified name.
    EndTag(String),
    /// Character data with predefined and numeric references decoded.
    Text(String),
    /// The content of a comment.
    Comment(String),
    /// The content of a CDATA section.
    CData(String),
    /// A processing instruction.
    Pi {
        /// The PI target.
        target: String,
        /// The PI data, `None` if there was none.
        data: Option<String>,
    },
    /// A complete `<!DOCTYPE ...>` declaration. No node is built for it;
    /// only the entity declarations it carries are kept.
    DoctypeSkip(DoctypeDecls),
    /// A reference to an entity other than the five predefined ones.
    EntityRef(String),
}

impl Token {
    /// Short label used in trace logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::XmlDecl(_) => "xml-decl",
            Self::StartTag { .. } => "start-tag",
            Self::EndTag(_) => "end-tag",
            Self::Text(_) => "text",
            Self::Comment(_) => "comment",
            Self::CData(_) => "cdata",
            Self::Pi { .. } => "pi",
            Self::DoctypeSkip(_) => "doctype",
            Self::EntityRef(_) => "entity-ref",
        }
    }
}

/// Entity declarations visible through a DOCTYPE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctypeDecls {
    /// General entities declared in the internal subset.
    pub entities: Vec<String>,
    /// An external subset or a parameter-entity reference may declare
    /// entities the internal subset does not show.
    pub open_ended: bool,
}

impl DoctypeDecls {
    /// Whether a reference to `name` may be to a declared entity.
    #[must_use]
    pub fn may_declare(&self, name: &str) -> bool {
        self.open_ended || self.entities.iter().any(|e| e == name)
    }

    /// Collects the declarations of a complete `<!DOCTYPE ...>` text.
    fn collect(decl: &str) -> Self {
        let bytes = decl.as_bytes();
        let mut decls = Self::default();
        let mut quote = None;
        let mut subset = None;
        for (i, &b) in bytes.iter().enumerate().skip(9) {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'[' => {
                    subset = Some(i + 1);
                    break;
                }
                None => {}
            }
        }
        let header = &decl[9..subset.map_or(decl.len(), |s| s - 1)];
        let keyword = header.split_ascii_whitespace().nth(1);
        decls.open_ended = matches!(keyword, Some("SYSTEM" | "PUBLIC"));
        if let Some(start) = subset {
            decls.scan_subset(decl, start);
        }
        decls
    }

    fn scan_subset(&mut self, decl: &str, mut i: usize) {
        let bytes = decl.as_bytes();
        let skip_past = |from: usize, delim: &[u8]| {
            memmem::find(&bytes[from..], delim).map_or(bytes.len(), |off| from + off + delim.len())
        };
        while i < bytes.len() {
            let rest = &bytes[i..];
            if rest.starts_with(b"<!--") {
                i = skip_past(i + 4, b"-->");
            } else if rest.starts_with(b"<?") {
                i = skip_past(i + 2, b"?>");
            } else if rest.starts_with(b"<!ENTITY") {
                i += 8;
                while i < bytes.len() && is_xml_whitespace(bytes[i]) {
                    i += 1;
                }
                if bytes.get(i) == Some(&b'%') {
                    i += 1;
                    continue;
                }
                let end = bytes[i..]
                    .iter()
                    .position(|&b| is_xml_whitespace(b) || matches!(b, b'"' | b'\'' | b'>'))
                    .map_or(bytes.len(), |n| i + n);
                if end > i {
                    self.entities.push(decl[i..end].to_string());
                }
                i = end;
            } else {
                match rest[0] {
                    q @ (b'"' | b'\'') => i = skip_past(i + 1, &[q]),
                    b'%' if rest.get(1).is_some_and(|&c| !is_xml_whitespace(c)) => {
                        self.open_ended = true;
                        i += 1;
                    }
                    b']' => return,
                    _ => i += 1,
                }
            }
        }
    }
}

/// A token together with where it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Location of the token's first character.
    pub location: SourceLocation,
}

/// The outcome of one [`Scanner::next_token`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// A complete token.
    Token(Spanned),
    /// The buffered text ends inside a construct; feed more input.
    NeedMore,
    /// All input has been consumed and the end was signalled.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    /// Markup whose kind is not known yet.
    Markup,
    Text,
    StartTag,
    EndTag,
    Comment,
    CData,
    Pi,
    XmlDecl,
    Doctype,
}

impl Construct {
    /// Length of the opening delimiter.
    fn header_len(self) -> usize {
        match self {
            Self::Markup | Self::Text => 0,
            Self::StartTag => 1,
            Self::EndTag | Self::Pi => 2,
            Self::Comment => 4,
            Self::XmlDecl => 5,
            Self::CData | Self::Doctype => 9,
        }
    }

    /// What a premature end of input inside this construct is missing.
    fn eof_kind(self) -> SyntaxKind {
        match self {
            Self::Markup => SyntaxKind::MarkupDecl,
            Self::Text => SyntaxKind::Reference,
            Self::StartTag => SyntaxKind::TagClose,
            Self::EndTag => SyntaxKind::EndTagClose,
            Self::Comment => SyntaxKind::CommentClose,
            Self::CData => SyntaxKind::CDataClose,
            Self::Pi => SyntaxKind::PiClose,
            Self::XmlDecl => SyntaxKind::XmlDecl,
            Self::Doctype => SyntaxKind::Doctype,
        }
    }
}

/// Record of a construct that the buffered text ended inside of.
///
/// All positions are relative to the construct's first byte, which is
/// always the scanner's consumption point.
#[derive(Debug, Clone, Copy)]
struct Pending {
    construct: Construct,
    /// How far scanning has progressed.
    cursor: usize,
    /// Open quote character inside a tag or DOCTYPE.
    quote: Option<u8>,
    /// `[`/`]` nesting inside a DOCTYPE.
    depth: u32,
    /// Inside a comment within the DOCTYPE internal subset.
    in_comment: bool,
}

impl Pending {
    fn new(construct: Construct) -> Self {
        Self {
            construct,
            cursor: construct.header_len(),
            quote: None,
            depth: 0,
            in_comment: false,
        }
    }
}

type Step = Result<Option<(Token, usize)>, XmlError>;

/// Incremental XML tokenizer.
#[derive(Debug)]
pub struct Scanner {
    buf: String,
    /// Index of the first unconsumed byte in `buf`.
    pos: usize,
    /// Absolute offset of `buf[0]` in the normalized stream.
    base: usize,
    line: u32,
    column: u32,
    pending: Option<Pending>,
    /// Decoded character data of a pending text construct.
    text: String,
    /// The previous fed piece ended with `\r`.
    pending_cr: bool,
    eof: bool,
    failed: Option<XmlError>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Creates an empty scanner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            pos: 0,
            base: 0,
            line: 1,
            column: 1,
            pending: None,
            text: String::new(),
            pending_cr: false,
            eof: false,
            failed: None,
        }
    }

    /// Appends decoded text to the buffer, normalizing line endings.
    pub fn feed(&mut self, text: &str) {
        self.compact();
        let mut rest = text;
        if self.pending_cr {
            self.pending_cr = false;
            rest = rest.strip_prefix('\n').unwrap_or(rest);
        }
        while let Some(i) = memchr::memchr(b'\r', rest.as_bytes()) {
            self.buf.push_str(&rest[..i]);
            self.buf.push('\n');
            let after = &rest[i + 1..];
            if after.is_empty() {
                self.pending_cr = true;
            }
            rest = after.strip_prefix('\n').unwrap_or(after);
        }
        self.buf.push_str(rest);
    }

    /// Signals that no more input will arrive.
    pub fn finish(&mut self) {
        self.eof = true;
    }

    /// Returns `true` once [`finish`](Self::finish) has been called.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.eof
    }

    /// Number of buffered bytes not yet returned as tokens.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Absolute offset of the next unconsumed byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Current location (start of the next token).
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.offset(),
        }
    }

    /// Produces the next token.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Syntax`] for input that cannot be tokenized. The
    /// error is sticky: later calls return it again.
    pub fn next_token(&mut self) -> Result<Scan, XmlError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        let result = self.step();
        if let Err(err) = &result {
            self.failed = Some(err.clone());
        }
        result
    }

    fn step(&mut self) -> Result<Scan, XmlError> {
        let mut pending = match self.pending.take() {
            Some(p) => p,
            None => {
                if self.pos == self.buf.len() {
                    return Ok(if self.eof { Scan::End } else { Scan::NeedMore });
                }
                let construct = if self.rest().first() == Some(&b'<') {
                    Construct::Markup
                } else {
                    Construct::Text
                };
                Pending::new(construct)
            }
        };

        if pending.construct == Construct::Markup {
            match self.classify()? {
                Some(construct) => pending = Pending::new(construct),
                None => {
                    self.pending = Some(pending);
                    return Ok(Scan::NeedMore);
                }
            }
        }

        let step = match pending.construct {
            Construct::Text => self.scan_text(&mut pending),
            Construct::StartTag => self.scan_start_tag(&mut pending),
            Construct::EndTag => self.scan_end_tag(&mut pending),
            Construct::Comment => self.scan_comment(&mut pending),
            Construct::CData => self.scan_cdata(&mut pending),
            Construct::Pi => self.scan_pi(&mut pending),
            Construct::XmlDecl => self.scan_xml_decl(&mut pending),
            Construct::Doctype => self.scan_doctype(&mut pending),
            Construct::Markup => Ok(None),
        }?;

        match step {
            Some((token, len)) => {
                let location = self.location();
                self.consume(len);
                log::trace!("token {} at {location}", token.label());
                Ok(Scan::Token(Spanned { token, location }))
            }
            None if self.eof => Err(self.syntax(0, pending.construct.eof_kind())),
            None => {
                self.pending = Some(pending);
                Ok(Scan::NeedMore)
            }
        }
    }

    fn rest(&self) -> &[u8] {
        &self.buf.as_bytes()[self.pos..]
    }

    fn syntax(&self, rel: usize, kind: SyntaxKind) -> XmlError {
        XmlError::Syntax {
            offset: self.offset() + rel,
            kind,
        }
    }

    fn consume(&mut self, len: usize) {
        let slice = &self.buf[self.pos..self.pos + len];
        match memchr::memrchr(b'\n', slice.as_bytes()) {
            Some(last) => {
                let newlines = memchr::memchr_iter(b'\n', slice.as_bytes()).count();
                self.line = self
                    .line
                    .saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
                self.column = 1 + count_chars(&slice[last + 1..]);
            }
            None => self.column = self.column.saturating_add(count_chars(slice)),
        }
        self.pos += len;
    }

    fn compact(&mut self) {
        if self.pos >= COMPACT_THRESHOLD && self.pos * 2 >= self.buf.len() {
            self.buf.drain(..self.pos);
            self.base += self.pos;
            self.pos = 0;
        }
    }

    /// Decides what kind of markup starts at the consumption point.
    fn classify(&self) -> Result<Option<Construct>, XmlError> {
        const DECLS: [(&[u8], Construct); 3] = [
            (b"<!--", Construct::Comment),
            (b"<![CDATA[", Construct::CData),
            (b"<!DOCTYPE", Construct::Doctype),
        ];

        let avail = self.rest();
        if avail.len() < 2 {
            return if self.eof {
                Err(self.syntax(1, SyntaxKind::Name))
            } else {
                Ok(None)
            };
        }
        match avail[1] {
            b'/' => Ok(Some(Construct::EndTag)),
            b'?' => {
                if self.offset() == 0 {
                    if avail.len() < 6 && !self.eof && b"<?xml".starts_with(&avail[..avail.len().min(5)]) {
                        return Ok(None);
                    }
                    if avail.len() >= 6 && avail.starts_with(b"<?xml") && is_xml_whitespace(avail[5]) {
                        return Ok(Some(Construct::XmlDecl));
                    }
                }
                Ok(Some(Construct::Pi))
            }
            b'!' => {
                for (prefix, construct) in DECLS {
                    if avail.starts_with(prefix) {
                        return Ok(Some(construct));
                    }
                    if !self.eof && avail.len() < prefix.len() && prefix.starts_with(avail) {
                        return Ok(None);
                    }
                }
                Err(self.syntax(0, SyntaxKind::MarkupDecl))
            }
            _ => Ok(Some(Construct::StartTag)),
        }
    }

    fn scan_text(&mut self, p: &mut Pending) -> Step {
        loop {
            let start = self.pos + p.cursor;
            let rest = &self.buf.as_bytes()[start..];
            let Some(i) = memchr::memchr2(b'<', b'&', rest) else {
                let mut take = rest.len();
                if !self.eof {
                    // Keep trailing `]` so that a `]]>` split over two
                    // pieces is still seen whole.
                    take -= rest.iter().rev().take(2).take_while(|&&b| b == b']').count();
                }
                self.append_text(p.cursor, take)?;
                p.cursor += take;
                if self.eof {
                    return Ok(Some((Token::Text(std::mem::take(&mut self.text)), p.cursor)));
                }
                return Ok(None);
            };

            self.append_text(p.cursor, i)?;
            let at = p.cursor + i;
            p.cursor = at;
            if self.buf.as_bytes()[self.pos + at] == b'<' {
                return Ok(Some((Token::Text(std::mem::take(&mut self.text)), at)));
            }

            let Some((reference, len)) = self.read_reference(at)? else {
                return Ok(None);
            };
            match reference {
                Reference::Char(c) => self.text.push(c),
                Reference::Entity(name) => {
                    if at == 0 {
                        return Ok(Some((Token::EntityRef(name), len)));
                    }
                    return Ok(Some((Token::Text(std::mem::take(&mut self.text)), at)));
                }
            }
            p.cursor = at + len;
        }
    }

    /// Appends `len` raw bytes at relative offset `rel` to the text buffer.
    fn append_text(&mut self, rel: usize, len: usize) -> Result<(), XmlError> {
        let start = self.pos + rel;
        let segment = &self.buf[start..start + len];
        if let Some(bad) = segment.char_indices().find(|&(_, c)| !is_xml_char(c)) {
            return Err(self.syntax(rel + bad.0, SyntaxKind::Char));
        }
        if let Some(bad) = memmem::find(segment.as_bytes(), b"]]>") {
            return Err(self.syntax(rel + bad, SyntaxKind::Char));
        }
        self.text.push_str(segment);
        Ok(())
    }

    /// Reads a reference starting with `&` at relative offset `rel`.
    ///
    /// Returns `None` if the buffer ends before the terminating `;`.
    fn read_reference(&self, rel: usize) -> Result<Option<(Reference, usize)>, XmlError> {
        let body_start = self.pos + rel + 1;
        let body = &self.buf[body_start..];
        let char_ref = body.starts_with('#');
        let mut end = None;
        for (i, c) in body.char_indices() {
            if c == ';' {
                end = Some(i);
                break;
            }
            let ok = if char_ref {
                i == 0 || c.is_ascii_alphanumeric()
            } else if i == 0 {
                is_name_start_char(c)
            } else {
                is_name_char(c)
            };
            if !ok {
                return Err(self.syntax(rel, SyntaxKind::Reference));
            }
        }
        let Some(end) = end else {
            return Ok(None);
        };
        let len = end + 2;
        if char_ref {
            let c = decode_char_ref(&body[1..end]).ok_or_else(|| self.syntax(rel, SyntaxKind::CharRef))?;
            return Ok(Some((Reference::Char(c), len)));
        }
        if end == 0 {
            return Err(self.syntax(rel, SyntaxKind::Reference));
        }
        let name = &body[..end];
        Ok(Some(match predefined_entity(name) {
            Some(c) => (Reference::Char(c), len),
            None => (Reference::Entity(name.to_string()), len),
        }))
    }

    fn scan_start_tag(&mut self, p: &mut Pending) -> Step {
        let bytes = self.rest();
        let mut i = p.cursor;
        let end = loop {
            let found = match p.quote {
                Some(q) => memchr::memchr(q, &bytes[i..]),
                None => memchr::memchr3(b'>', b'"', b'\'', &bytes[i..]),
            };
            let Some(off) = found else {
                p.cursor = bytes.len();
                return Ok(None);
            };
            let at = i + off;
            i = at + 1;
            match (p.quote, bytes[at]) {
                (Some(_), _) => p.quote = None,
                (None, b'>') => break at,
                (None, q) => p.quote = Some(q),
            }
        };

        let mut inner = &self.buf[self.pos + 1..self.pos + end];
        let empty = inner.ends_with('/');
        if empty {
            inner = &inner[..inner.len() - 1];
        }
        let name_end = inner
            .bytes()
            .position(is_xml_whitespace)
            .unwrap_or(inner.len());
        let name = &inner[..name_end];
        if !is_name(name) {
            return Err(self.syntax(1, SyntaxKind::Name));
        }
        Ok(Some((
            Token::StartTag {
                name: name.to_string(),
                attrs_raw: inner[name_end..].to_string(),
                empty,
            },
            end + 1,
        )))
    }

    fn scan_end_tag(&mut self, p: &mut Pending) -> Step {
        let bytes = self.rest();
        let Some(off) = memchr::memchr(b'>', &bytes[p.cursor..]) else {
            p.cursor = bytes.len();
            return Ok(None);
        };
        let end = p.cursor + off;
        let inner = &self.buf[self.pos + 2..self.pos + end];
        let name = inner.trim_end_matches([' ', '\t', '\n']);
        if !is_name(name) {
            let kind = if name.chars().next().is_some_and(is_name_start_char) {
                SyntaxKind::EndTagClose
            } else {
                SyntaxKind::Name
            };
            return Err(self.syntax(2, kind));
        }
        Ok(Some((Token::EndTag(name.to_string()), end + 1)))
    }

    fn scan_comment(&mut self, p: &mut Pending) -> Step {
        let bytes = self.rest();
        let Some(off) = memmem::find(&bytes[p.cursor..], b"--") else {
            p.cursor = p.cursor.max(bytes.len().saturating_sub(1));
            return Ok(None);
        };
        let dashes = p.cursor + off;
        match bytes.get(dashes + 2) {
            None => {
                p.cursor = dashes;
                Ok(None)
            }
            Some(b'>') => {
                let content = &self.buf[self.pos + 4..self.pos + dashes];
                self.check_chars(4, content)?;
                Ok(Some((Token::Comment(content.to_string()), dashes + 3)))
            }
            Some(_) => Err(self.syntax(dashes, SyntaxKind::CommentClose)),
        }
    }

    fn scan_cdata(&mut self, p: &mut Pending) -> Step {
        let Some(end) = self.find_delimiter(p, b"]]>") else {
            return Ok(None);
        };
        let content = &self.buf[self.pos + 9..self.pos + end];
        self.check_chars(9, content)?;
        Ok(Some((Token::CData(content.to_string()), end + 3)))
    }

    fn scan_pi(&mut self, p: &mut Pending) -> Step {
        let Some(end) = self.find_delimiter(p, b"?>") else {
            return Ok(None);
        };
        let content = &self.buf[self.pos + 2..self.pos + end];
        let target_end = content
            .bytes()
            .position(is_xml_whitespace)
            .unwrap_or(content.len());
        let target = &content[..target_end];
        if !is_name(target) {
            return Err(self.syntax(2, SyntaxKind::Name));
        }
        if target.eq_ignore_ascii_case("xml") {
            return Err(self.syntax(2, SyntaxKind::XmlDecl));
        }
        let data = content[target_end..].trim_start_matches([' ', '\t', '\n']);
        self.check_chars(2 + target_end, data)?;
        Ok(Some((
            Token::Pi {
                target: target.to_string(),
                data: (!data.is_empty()).then(|| data.to_string()),
            },
            end + 2,
        )))
    }

    fn scan_xml_decl(&mut self, p: &mut Pending) -> Step {
        let Some(end) = self.find_delimiter(p, b"?>") else {
            return Ok(None);
        };
        let body = &self.buf[self.pos + 5..self.pos + end];
        Ok(Some((Token::XmlDecl(body.to_string()), end + 2)))
    }

    fn scan_doctype(&mut self, p: &mut Pending) -> Step {
        let bytes = self.rest();
        if bytes.len() <= 9 {
            return Ok(None);
        }
        if !is_xml_whitespace(bytes[9]) {
            return Err(self.syntax(9, SyntaxKind::Doctype));
        }
        let mut i = p.cursor;
        while i < bytes.len() {
            if p.in_comment {
                let Some(off) = memmem::find(&bytes[i..], b"-->") else {
                    p.cursor = i.max(bytes.len().saturating_sub(2));
                    return Ok(None);
                };
                i += off + 3;
                p.in_comment = false;
                continue;
            }
            let b = bytes[i];
            match p.quote {
                Some(q) if b == q => p.quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => p.quote = Some(b),
                    b'[' => p.depth += 1,
                    b']' => p.depth = p.depth.saturating_sub(1),
                    b'<' if p.depth > 0 => {
                        if bytes.len() < i + 4 {
                            p.cursor = i;
                            return Ok(None);
                        }
                        if &bytes[i..i + 4] == b"<!--" {
                            p.in_comment = true;
                            i += 4;
                            continue;
                        }
                    }
                    b'>' if p.depth == 0 => {
                        let decls = DoctypeDecls::collect(&self.buf[self.pos..self.pos + i]);
                        return Ok(Some((Token::DoctypeSkip(decls), i + 1)));
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        p.cursor = i;
        Ok(None)
    }

    /// Finds `delim` at or after the pending cursor, returning its relative
    /// offset, or records how far it is safe to skip next time.
    fn find_delimiter(&self, p: &mut Pending, delim: &[u8]) -> Option<usize> {
        let bytes = self.rest();
        match memmem::find(&bytes[p.cursor..], delim) {
            Some(off) => Some(p.cursor + off),
            None => {
                p.cursor = p
                    .cursor
                    .max(bytes.len().saturating_sub(delim.len() - 1));
                None
            }
        }
    }

    fn check_chars(&self, rel: usize, content: &str) -> Result<(), XmlError> {
        match content.char_indices().find(|&(_, c)| !is_xml_char(c)) {
            Some((i, _)) => Err(self.syntax(rel + i, SyntaxKind::Char)),
            None => Ok(()),
        }
    }
}

enum Reference {
    Char(char),
    Entity(String),
}

fn count_chars(s: &str) -> u32 {
    u32::try_from(s.chars().count()).unwrap_or(u32::MAX)
}
