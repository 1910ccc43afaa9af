//! One-shot parsing entry points and parser context lifecycle.

// Parameter names follow the legacy header (`URL`).
#![allow(non_snake_case)]

use std::ffi::CString;
use std::fs::File;
use std::io::{BufReader, Read};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use super::document::{export_document, free_document};
use super::strings::{buffer_arg, doc_arg, str_arg};
use super::types::{
    xmlChar, xmlDoc, xmlInputCloseCallback, xmlInputReadCallback, xmlParserCtxt,
};
use super::{clear_last_error, fail, fail_status, parser_init, set_last_error};
use crate::error::{ParseError, XmlError};
use crate::parser::{
    finished_document, parse_bytes_with_options, parse_file, parse_reader, read_into,
    ParseOptions, ParserContext, XML_PARSE_RECOVER,
};
use crate::tree::Document;

/// Heap block behind every `xmlParserCtxt*` handed to C.
///
/// The public record comes first, so the caller's pointer is also a
/// pointer to the whole block.
#[repr(C)]
pub(crate) struct CtxtBox {
    pub(crate) ctxt: xmlParserCtxt,
    pub(crate) inner: ParserContext<'static>,
    /// Input supplied at creation and not parsed yet.
    pub(crate) input: Vec<u8>,
    base_url: Option<CString>,
    encoding: Option<CString>,
}

impl CtxtBox {
    pub(crate) fn create(
        options: ParseOptions,
        push: bool,
        input: Vec<u8>,
    ) -> Result<*mut xmlParserCtxt, XmlError> {
        let inner = if push {
            ParserContext::new_push(options)?
        } else {
            ParserContext::new(options)?
        };
        let mut block = Box::new(CtxtBox {
            ctxt: xmlParserCtxt {
                doc: ptr::null_mut(),
                wellFormed: 1,
                options: 0,
                input: ptr::null(),
                input_size: 0,
                base_url: ptr::null(),
                encoding: ptr::null(),
            },
            inner,
            input,
            base_url: None,
            encoding: None,
        });
        block.sync();
        Ok(Box::into_raw(block).cast())
    }

    /// Borrows the block behind a caller's context pointer.
    ///
    /// # Safety
    ///
    /// `ctxt` must be null or come from [`CtxtBox::create`] and be live.
    pub(crate) unsafe fn from_raw<'a>(ctxt: *mut xmlParserCtxt) -> Result<&'a mut CtxtBox, XmlError> {
        if ctxt.is_null() {
            return Err(XmlError::InvalidArgument("null parser context".into()));
        }
        // SAFETY: `ctxt` is the first field of a live `CtxtBox`.
        Ok(unsafe { &mut *ctxt.cast::<CtxtBox>() })
    }

    /// Copies the Rust-side state into the public record.
    pub(crate) fn sync(&mut self) {
        let options = self.inner.options();
        self.ctxt.wellFormed = c_int::from(self.inner.well_formed());
        self.ctxt.options = options.to_bits();
        self.base_url = options.base_url.as_deref().and_then(|u| CString::new(u).ok());
        self.encoding = options.encoding.as_deref().and_then(|e| CString::new(e).ok());
        self.ctxt.base_url = self.base_url.as_ref().map_or(ptr::null(), |c| c.as_ptr());
        self.ctxt.encoding = self.encoding.as_ref().map_or(ptr::null(), |c| c.as_ptr());
        if self.input.is_empty() {
            self.ctxt.input = ptr::null();
            self.ctxt.input_size = 0;
        } else {
            self.ctxt.input = self.input.as_ptr().cast();
            self.ctxt.input_size = c_int::try_from(self.input.len()).unwrap_or(c_int::MAX);
        }
    }

    /// Frees a document left in `doc` and returns the context to ready
    /// with `options`.
    fn restart(&mut self, options: ParseOptions) -> Result<(), XmlError> {
        self.release_doc();
        self.input.clear();
        let result = self.inner.reset_with(options);
        self.sync();
        result
    }

    fn release_doc(&mut self) {
        if !self.ctxt.doc.is_null() {
            // SAFETY: `doc` was exported by this context and not handed out
            // through a return value.
            unsafe { free_document(self.ctxt.doc) };
            self.ctxt.doc = ptr::null_mut();
        }
    }

    /// Exports the finished document, if any, into `doc`.
    pub(crate) fn publish(&mut self) {
        if let Some(doc) = self.inner.take_document() {
            note_recovered_errors(&doc);
            self.ctxt.doc = export_document(&doc);
        }
        self.sync();
    }

    /// Takes the finished document and returns it to the caller.
    fn hand_out(&mut self, parsed: Result<(), ParseError>) -> *mut xmlDoc {
        let result = parsed.and_then(|()| finished_document(&mut self.inner));
        self.sync();
        into_doc(result)
    }
}

/// Builds options from the legacy arguments shared by the read functions.
unsafe fn read_options(
    url: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> Result<ParseOptions, XmlError> {
    let mut opts = ParseOptions::from_bits(options);
    // SAFETY: both are null or NUL-terminated per the caller contract.
    unsafe {
        opts.base_url = str_arg(url, "URL")?.map(str::to_string);
        opts.encoding = str_arg(encoding, "encoding")?.map(str::to_string);
    }
    Ok(opts)
}

fn note_recovered_errors(doc: &Document) {
    if !doc.well_formed {
        if let Some(first) = doc.diagnostics.first() {
            set_last_error(&first.to_string());
        }
    }
}

fn into_doc(result: Result<Document, ParseError>) -> *mut xmlDoc {
    match result {
        Ok(doc) => {
            note_recovered_errors(&doc);
            export_document(&doc)
        }
        Err(e) => fail(&e.error),
    }
}

/// Adapts a C read/close callback pair to [`Read`]. The close callback
/// runs when the adapter is dropped, so exactly once.
struct CallbackReader {
    read: unsafe extern "C" fn(*mut c_void, *mut c_char, c_int) -> c_int,
    close: xmlInputCloseCallback,
    context: *mut c_void,
}

impl Read for CallbackReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = c_int::try_from(buf.len()).unwrap_or(c_int::MAX);
        // SAFETY: `buf` is writable for `len` bytes; the callback contract
        // is the caller's.
        let n = unsafe { (self.read)(self.context, buf.as_mut_ptr().cast(), len) };
        usize::try_from(n)
            .map(|n| n.min(buf.len()))
            .map_err(|_| std::io::Error::other(format!("read callback returned {n}")))
    }
}

impl Drop for CallbackReader {
    fn drop(&mut self) {
        if let Some(close) = self.close {
            // SAFETY: the caller handed us `context` for this pair.
            unsafe { close(self.context) };
        }
    }
}

fn callback_reader(
    ioread: xmlInputReadCallback,
    ioclose: xmlInputCloseCallback,
    ioctx: *mut c_void,
) -> Result<CallbackReader, XmlError> {
    let read = ioread.ok_or_else(|| XmlError::InvalidArgument("null read callback".into()))?;
    Ok(CallbackReader {
        read,
        close: ioclose,
        context: ioctx,
    })
}

#[cfg(unix)]
fn with_fd<T>(fd: c_int, f: impl FnOnce(&File) -> T) -> Result<T, XmlError> {
    use std::mem::ManuallyDrop;
    use std::os::unix::io::FromRawFd;

    if fd < 0 {
        return Err(XmlError::InvalidArgument(format!("invalid file descriptor {fd}")));
    }
    // SAFETY: `fd` is an open descriptor per the caller contract; the
    // caller keeps ownership, so it is never closed here.
    let file = ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    Ok(f(&*file))
}

fn open_file(path: &str) -> Result<File, XmlError> {
    File::open(path).map_err(|e| XmlError::InvalidArgument(format!("cannot open {path}: {e}")))
}

// --- One-shot reads ---

/// Parses `size` bytes at `buffer`.
///
/// Returns the document, or null on error. In recovery mode
/// (`XML_PARSE_RECOVER`) a document is returned for malformed input too,
/// with `XML_DOC_WELLFORMED` cleared.
#[no_mangle]
pub unsafe extern "C" fn xmlReadMemory(
    buffer: *const c_char,
    size: c_int,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let result = unsafe { buffer_arg(buffer, size) }
        .and_then(|bytes| Ok((bytes, unsafe { read_options(URL, encoding, options) }?)));
    match result {
        Ok((bytes, opts)) => into_doc(parse_bytes_with_options(bytes, &opts)),
        Err(e) => fail(&e),
    }
}

/// Parses a file. The path becomes the document URL.
#[no_mangle]
pub unsafe extern "C" fn xmlReadFile(
    filename: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { str_arg(filename, "filename") }.and_then(|name| {
        let name = name.ok_or_else(|| XmlError::InvalidArgument("null filename".into()))?;
        // SAFETY: as above.
        let opts = unsafe { read_options(ptr::null(), encoding, options) }?;
        Ok((name, opts))
    });
    match prepared {
        Ok((name, opts)) => into_doc(parse_file(name, &opts)),
        Err(e) => fail(&e),
    }
}

/// Parses everything readable from `fd`. The descriptor is not closed.
#[cfg(unix)]
#[no_mangle]
pub unsafe extern "C" fn xmlReadFd(
    fd: c_int,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let opts = match unsafe { read_options(URL, encoding, options) } {
        Ok(opts) => opts,
        Err(e) => return fail(&e),
    };
    match with_fd(fd, |file| parse_reader(file, &opts)) {
        Ok(result) => into_doc(result),
        Err(e) => fail(&e),
    }
}

/// Parses a NUL-terminated document string.
#[no_mangle]
pub unsafe extern "C" fn xmlReadDoc(
    cur: *const xmlChar,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let result = unsafe { doc_arg(cur) }
        .and_then(|bytes| Ok((bytes, unsafe { read_options(URL, encoding, options) }?)));
    match result {
        Ok((bytes, opts)) => into_doc(parse_bytes_with_options(bytes, &opts)),
        Err(e) => fail(&e),
    }
}

/// Parses input pulled through `ioread`. `ioclose`, if given, is called
/// exactly once when reading ends, whether or not parsing succeeded.
#[no_mangle]
pub unsafe extern "C" fn xmlReadIO(
    ioread: xmlInputReadCallback,
    ioclose: xmlInputCloseCallback,
    ioctx: *mut c_void,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    let reader = match callback_reader(ioread, ioclose, ioctx) {
        Ok(reader) => reader,
        Err(e) => return fail(&e),
    };
    // SAFETY: arguments follow the documented contract.
    let opts = match unsafe { read_options(URL, encoding, options) } {
        Ok(opts) => opts,
        Err(e) => return fail(&e),
    };
    into_doc(parse_reader(reader, &opts))
}

// --- Context-bound reads ---

/// Like [`xmlReadMemory`], reusing `ctxt`. Any document still held in
/// `ctxt->doc` is freed first.
#[no_mangle]
pub unsafe extern "C" fn xmlCtxtReadMemory(
    ctxt: *mut xmlParserCtxt,
    buffer: *const c_char,
    size: c_int,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| {
        // SAFETY: as above.
        let bytes = unsafe { buffer_arg(buffer, size) }?;
        // SAFETY: as above.
        block.restart(unsafe { read_options(URL, encoding, options) }?)?;
        Ok((block, bytes))
    });
    match prepared {
        Ok((block, bytes)) => {
            let parsed = block.inner.parse_bytes(bytes);
            block.hand_out(parsed)
        }
        Err(e) => fail(&e),
    }
}

/// Like [`xmlReadFile`], reusing `ctxt`.
#[no_mangle]
pub unsafe extern "C" fn xmlCtxtReadFile(
    ctxt: *mut xmlParserCtxt,
    filename: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| {
        // SAFETY: as above.
        let name = unsafe { str_arg(filename, "filename") }?
            .ok_or_else(|| XmlError::InvalidArgument("null filename".into()))?;
        // SAFETY: as above.
        let mut opts = unsafe { read_options(ptr::null(), encoding, options) }?;
        opts.base_url = Some(name.to_string());
        let file = open_file(name)?;
        block.restart(opts)?;
        Ok((block, file))
    });
    match prepared {
        Ok((block, file)) => {
            let parsed = read_into(&mut block.inner, BufReader::new(file));
            block.hand_out(parsed)
        }
        Err(e) => fail(&e),
    }
}

/// Like [`xmlReadFd`], reusing `ctxt`.
#[cfg(unix)]
#[no_mangle]
pub unsafe extern "C" fn xmlCtxtReadFd(
    ctxt: *mut xmlParserCtxt,
    fd: c_int,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| {
        // SAFETY: as above.
        block.restart(unsafe { read_options(URL, encoding, options) }?)?;
        Ok(block)
    });
    let block = match prepared {
        Ok(block) => block,
        Err(e) => return fail(&e),
    };
    match with_fd(fd, |file| read_into(&mut block.inner, file)) {
        Ok(parsed) => block.hand_out(parsed),
        Err(e) => fail(&e),
    }
}

/// Like [`xmlReadDoc`], reusing `ctxt`.
#[no_mangle]
pub unsafe extern "C" fn xmlCtxtReadDoc(
    ctxt: *mut xmlParserCtxt,
    cur: *const xmlChar,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| {
        // SAFETY: as above.
        let bytes = unsafe { doc_arg(cur) }?;
        // SAFETY: as above.
        block.restart(unsafe { read_options(URL, encoding, options) }?)?;
        Ok((block, bytes))
    });
    match prepared {
        Ok((block, bytes)) => {
            let parsed = block.inner.parse_bytes(bytes);
            block.hand_out(parsed)
        }
        Err(e) => fail(&e),
    }
}

/// Like [`xmlReadIO`], reusing `ctxt`. `ioclose` runs exactly once, also
/// when `ctxt` or the options are rejected.
#[no_mangle]
pub unsafe extern "C" fn xmlCtxtReadIO(
    ctxt: *mut xmlParserCtxt,
    ioread: xmlInputReadCallback,
    ioclose: xmlInputCloseCallback,
    ioctx: *mut c_void,
    URL: *const c_char,
    encoding: *const c_char,
    options: c_int,
) -> *mut xmlDoc {
    parser_init();
    clear_last_error();
    let reader = match callback_reader(ioread, ioclose, ioctx) {
        Ok(reader) => reader,
        Err(e) => return fail(&e),
    };
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| {
        // SAFETY: as above.
        block.restart(unsafe { read_options(URL, encoding, options) }?)?;
        Ok(block)
    });
    match prepared {
        Ok(block) => {
            let parsed = read_into(&mut block.inner, reader);
            block.hand_out(parsed)
        }
        Err(e) => fail(&e),
    }
}

// --- Recovery shorthands ---

/// [`xmlReadMemory`] with `XML_PARSE_RECOVER`.
#[no_mangle]
pub unsafe extern "C" fn xmlRecoverMemory(buffer: *const c_char, size: c_int) -> *mut xmlDoc {
    // SAFETY: same contract as `xmlReadMemory`.
    unsafe { xmlReadMemory(buffer, size, ptr::null(), ptr::null(), XML_PARSE_RECOVER) }
}

/// [`xmlReadDoc`] with `XML_PARSE_RECOVER`.
#[no_mangle]
pub unsafe extern "C" fn xmlRecoverDoc(cur: *const xmlChar) -> *mut xmlDoc {
    // SAFETY: same contract as `xmlReadDoc`.
    unsafe { xmlReadDoc(cur, ptr::null(), ptr::null(), XML_PARSE_RECOVER) }
}

/// [`xmlReadFile`] with `XML_PARSE_RECOVER`.
#[no_mangle]
pub unsafe extern "C" fn xmlRecoverFile(filename: *const c_char) -> *mut xmlDoc {
    // SAFETY: same contract as `xmlReadFile`.
    unsafe { xmlReadFile(filename, ptr::null(), XML_PARSE_RECOVER) }
}

// --- Context lifecycle ---

/// Creates a context with default options and no input.
#[no_mangle]
pub extern "C" fn xmlNewParserCtxt() -> *mut xmlParserCtxt {
    parser_init();
    clear_last_error();
    CtxtBox::create(ParseOptions::default(), false, Vec::new()).unwrap_or_else(|e| fail(&e))
}

/// Creates a context over a copy of `size` bytes at `buffer`, to be parsed
/// by [`xmlParseDocument`].
#[no_mangle]
pub unsafe extern "C" fn xmlCreateMemoryParserCtxt(
    buffer: *const c_char,
    size: c_int,
) -> *mut xmlParserCtxt {
    parser_init();
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    unsafe { buffer_arg(buffer, size) }
        .and_then(|bytes| CtxtBox::create(ParseOptions::default(), false, bytes.to_vec()))
        .unwrap_or_else(|e| fail(&e))
}

/// Parses the context's input into `ctxt->doc`.
///
/// Returns 0 for a well-formed document and -1 otherwise. In recovery
/// mode `ctxt->doc` is set even when -1 is returned. The caller owns the
/// document and must free it.
#[no_mangle]
pub unsafe extern "C" fn xmlParseDocument(ctxt: *mut xmlParserCtxt) -> c_int {
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let block = match unsafe { CtxtBox::from_raw(ctxt) } {
        Ok(block) => block,
        Err(e) => return fail_status(&e),
    };
    let input = std::mem::take(&mut block.input);
    let parsed = block.inner.parse_bytes(&input);
    block.publish();
    match parsed {
        Ok(()) if block.ctxt.wellFormed != 0 => 0,
        Ok(()) => -1,
        Err(e) => fail_status(&e.error),
    }
}

/// Sets the option bits of a context that has not started parsing.
///
/// Returns 0, or -1 if the context is busy or the options are rejected.
#[no_mangle]
pub unsafe extern "C" fn xmlCtxtUseOptions(ctxt: *mut xmlParserCtxt, options: c_int) -> c_int {
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let result = unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| {
        if block.inner.state() != crate::parser::ParserState::Ready {
            return Err(XmlError::InvalidArgument(format!(
                "cannot change options of a parser that is {}",
                block.inner.state()
            )));
        }
        let current = block.inner.options();
        let mut opts = ParseOptions::from_bits(options);
        opts.base_url.clone_from(&current.base_url);
        opts.encoding.clone_from(&current.encoding);
        block.inner.reset_with(opts)?;
        block.sync();
        Ok(())
    });
    match result {
        Ok(()) => 0,
        Err(e) => fail_status(&e),
    }
}

/// Returns the context to its initial state, freeing `ctxt->doc` and any
/// pending input.
#[no_mangle]
pub unsafe extern "C" fn xmlCtxtReset(ctxt: *mut xmlParserCtxt) {
    // SAFETY: arguments follow the documented contract.
    if let Ok(block) = unsafe { CtxtBox::from_raw(ctxt) } {
        block.release_doc();
        block.input.clear();
        block.inner.reset();
        block.sync();
    }
}

/// Frees a context. A document left in `ctxt->doc` is NOT freed; it
/// belongs to the caller.
#[no_mangle]
pub unsafe extern "C" fn xmlFreeParserCtxt(ctxt: *mut xmlParserCtxt) {
    if !ctxt.is_null() {
        // SAFETY: `ctxt` is the first field of a block made by `create`.
        unsafe { drop(Box::from_raw(ctxt.cast::<CtxtBox>())) };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ffi::types::{xmlElementType, XML_DOC_WELLFORMED};
    use crate::ffi::xmlGetLastErrorMessage;
    use crate::parser::XML_PARSE_NOERROR;
    use pretty_assertions::assert_eq;
    use std::ffi::CStr;

    fn name_of(p: *const xmlChar) -> String {
        // SAFETY: test pointers are live NUL-terminated strings.
        unsafe { CStr::from_ptr(p.cast()) }.to_str().unwrap().to_string()
    }

    fn last_error() -> String {
        let p = xmlGetLastErrorMessage();
        assert!(!p.is_null());
        // SAFETY: checked non-null; valid until the next call.
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn test_read_memory() {
        let xml = b"<root><child/></root>";
        // SAFETY: `xml` is a live buffer of the given length.
        unsafe {
            let doc = xmlReadMemory(xml.as_ptr().cast(), 21, ptr::null(), ptr::null(), 0);
            assert!(!doc.is_null());
            let root = (*doc).children;
            assert_eq!(name_of((*root).name), "root");
            assert_eq!(name_of((*(*root).children).name), "child");
            super::super::document::xmlFreeDoc(doc);
        }
    }

    #[test]
    fn test_read_memory_argument_checks() {
        // SAFETY: invalid arguments are rejected before any access.
        unsafe {
            let doc = xmlReadMemory(ptr::null(), 4, ptr::null(), ptr::null(), 0);
            assert!(doc.is_null());
            assert!(last_error().contains("null buffer"));
            let xml = b"<a/>";
            let doc = xmlReadMemory(xml.as_ptr().cast(), -1, ptr::null(), ptr::null(), 0);
            assert!(doc.is_null());
            assert!(last_error().contains("negative"));
        }
    }

    #[test]
    fn test_strict_vs_recover() {
        let xml = b"<a><b></a>";
        // SAFETY: `xml` is a live buffer of the given length.
        unsafe {
            let strict = xmlReadMemory(xml.as_ptr().cast(), 10, ptr::null(), ptr::null(), 0);
            assert!(strict.is_null());
            assert!(last_error().contains("mismatch"));

            let doc = xmlRecoverMemory(xml.as_ptr().cast(), 10);
            assert!(!doc.is_null());
            assert_eq!((*doc).properties & XML_DOC_WELLFORMED, 0);
            assert_eq!((*doc).parseFlags, XML_PARSE_RECOVER);
            super::super::document::xmlFreeDoc(doc);
        }
    }

    #[test]
    fn test_read_doc_with_url() {
        let xml = b"<r/>\0";
        let url = b"mem.xml\0";
        // SAFETY: both strings are NUL-terminated.
        unsafe {
            let doc = xmlReadDoc(xml.as_ptr(), url.as_ptr().cast(), ptr::null(), XML_PARSE_NOERROR);
            assert_eq!(name_of((*doc).URL), "mem.xml");
            assert_eq!((*doc).parseFlags, XML_PARSE_NOERROR);
            super::super::document::xmlFreeDoc(doc);
        }
    }

    #[test]
    fn test_parse_document_lifecycle() {
        let xml = b"<r>text</r>";
        // SAFETY: `xml` is a live buffer of the given length.
        unsafe {
            let ctxt = xmlCreateMemoryParserCtxt(xml.as_ptr().cast(), 11);
            assert_eq!((*ctxt).input_size, 11);
            assert_eq!(xmlParseDocument(ctxt), 0);
            assert_eq!((*ctxt).wellFormed, 1);
            let doc = (*ctxt).doc;
            assert!(!doc.is_null());
            let text = (*(*doc).children).children;
            assert_eq!((*text).type_, xmlElementType::XML_TEXT_NODE);
            (*ctxt).doc = ptr::null_mut();
            xmlFreeParserCtxt(ctxt);
            super::super::document::xmlFreeDoc(doc);
        }
    }

    #[test]
    fn test_parse_document_twice_is_rejected() {
        let xml = b"<r/>";
        // SAFETY: `xml` is a live buffer of the given length.
        unsafe {
            let ctxt = xmlCreateMemoryParserCtxt(xml.as_ptr().cast(), 4);
            assert_eq!(xmlParseDocument(ctxt), 0);
            assert_eq!(xmlParseDocument(ctxt), -1);
            xmlCtxtReset(ctxt);
            assert!((*ctxt).doc.is_null());
            xmlFreeParserCtxt(ctxt);
        }
    }

    #[test]
    fn test_ctxt_read_reuses_context() {
        // SAFETY: buffers are live for the given lengths.
        unsafe {
            let ctxt = xmlNewParserCtxt();
            let first = xmlCtxtReadMemory(ctxt, b"<a/>".as_ptr().cast(), 4, ptr::null(), ptr::null(), 0);
            assert!(!first.is_null());
            let bad = xmlCtxtReadMemory(ctxt, b"<a>".as_ptr().cast(), 3, ptr::null(), ptr::null(), 0);
            assert!(bad.is_null());
            assert_eq!((*ctxt).wellFormed, 0);
            let second = xmlCtxtReadMemory(
                ctxt,
                b"<b/>".as_ptr().cast(),
                4,
                ptr::null(),
                ptr::null(),
                XML_PARSE_RECOVER,
            );
            assert_eq!(name_of((*(*second).children).name), "b");
            assert_eq!((*ctxt).options, XML_PARSE_RECOVER);
            assert_eq!((*ctxt).wellFormed, 1);
            super::super::document::xmlFreeDoc(first);
            super::super::document::xmlFreeDoc(second);
            xmlFreeParserCtxt(ctxt);
        }
    }

    #[test]
    fn test_use_options_before_parse() {
        // SAFETY: buffers are live for the given lengths.
        unsafe {
            let ctxt = xmlCreateMemoryParserCtxt(b"<a><b></a>".as_ptr().cast(), 10);
            assert_eq!(xmlCtxtUseOptions(ctxt, XML_PARSE_RECOVER), 0);
            assert_eq!(xmlParseDocument(ctxt), -1);
            let doc = (*ctxt).doc;
            assert!(!doc.is_null());
            assert_eq!(xmlCtxtUseOptions(ctxt, 0), -1);
            xmlCtxtReset(ctxt);
            xmlFreeParserCtxt(ctxt);
        }
    }

    unsafe extern "C" fn read_two_chunks(context: *mut c_void, buffer: *mut c_char, len: c_int) -> c_int {
        // SAFETY: `context` points at the test's state tuple.
        let (calls, _) = unsafe { &mut *context.cast::<(usize, usize)>() };
        let chunk: &[u8] = match *calls {
            0 => b"<doc><a/>",
            1 => b"<b/></doc>",
            _ => b"",
        };
        *calls += 1;
        let n = chunk.len().min(usize::try_from(len).unwrap_or(0));
        // SAFETY: the parser's buffer has room for `len` bytes.
        unsafe { ptr::copy_nonoverlapping(chunk.as_ptr(), buffer.cast::<u8>(), n) };
        c_int::try_from(n).unwrap_or(-1)
    }

    unsafe extern "C" fn read_fails(_: *mut c_void, _: *mut c_char, _: c_int) -> c_int {
        -1
    }

    unsafe extern "C" fn count_close(context: *mut c_void) -> c_int {
        // SAFETY: `context` points at the test's state tuple.
        let (_, closes) = unsafe { &mut *context.cast::<(usize, usize)>() };
        *closes += 1;
        0
    }

    #[test]
    fn test_read_io_closes_once() {
        let mut state = (0usize, 0usize);
        // SAFETY: callbacks only touch `state`, which outlives the call.
        unsafe {
            let doc = xmlReadIO(
                Some(read_two_chunks),
                Some(count_close),
                ptr::addr_of_mut!(state).cast(),
                ptr::null(),
                ptr::null(),
                0,
            );
            assert!(!doc.is_null());
            assert_eq!(state.1, 1);
            let root = (*doc).children;
            assert_eq!(name_of((*(*root).last).name), "b");
            super::super::document::xmlFreeDoc(doc);
        }
    }

    #[test]
    fn test_read_io_error_still_closes_once() {
        let mut state = (0usize, 0usize);
        // SAFETY: as above.
        unsafe {
            let doc = xmlReadIO(
                Some(read_fails),
                Some(count_close),
                ptr::addr_of_mut!(state).cast(),
                ptr::null(),
                ptr::null(),
                0,
            );
            assert!(doc.is_null());
            assert_eq!(state.1, 1);
            assert!(last_error().contains("read"));

            let doc = xmlCtxtReadIO(
                ptr::null_mut(),
                Some(read_two_chunks),
                Some(count_close),
                ptr::addr_of_mut!(state).cast(),
                ptr::null(),
                ptr::null(),
                0,
            );
            assert!(doc.is_null());
            assert_eq!(state.1, 2);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_read_fd_leaves_descriptor_open() {
        use std::io::{Seek, Write};
        use std::os::unix::io::AsRawFd;

        let path = std::env::temp_dir().join(format!("libxml2-rs-fd-{}.xml", std::process::id()));
        let mut file = File::options()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.write_all(b"<fd/>").unwrap();
        file.rewind().unwrap();
        // SAFETY: the descriptor stays open for the whole call.
        unsafe {
            let doc = xmlReadFd(file.as_raw_fd(), ptr::null(), ptr::null(), 0);
            assert_eq!(name_of((*(*doc).children).name), "fd");
            super::super::document::xmlFreeDoc(doc);
            assert!(xmlReadFd(-1, ptr::null(), ptr::null(), 0).is_null());
        }
        // Still ours: seeking works after the parse.
        assert!(file.rewind().is_ok());
        drop(file);
        let _ = std::fs::remove_file(path);
    }
}
