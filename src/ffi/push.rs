//! Push (incremental) parsing entry points.

use std::os::raw::{c_char, c_int, c_void};

use super::parser::CtxtBox;
use super::strings::{buffer_arg, str_arg};
use super::types::xmlParserCtxt;
use super::{clear_last_error, fail, fail_status, parser_init};
use crate::error::XmlError;
use crate::parser::{ParseOptions, ParserState};

/// Creates a push parser context.
///
/// `chunk`/`size` optionally provide the first bytes of input; they are
/// parsed by the first [`xmlParseChunk`] call, so options can still be set
/// with [`xmlCtxtUseOptions`](super::parser::xmlCtxtUseOptions).
/// `filename` becomes the document URL. Custom SAX tables are not
/// supported here: a non-null `sax` is rejected.
///
/// Returns null on error. The context must be freed with
/// [`xmlFreeParserCtxt`](super::parser::xmlFreeParserCtxt).
#[no_mangle]
pub unsafe extern "C" fn xmlCreatePushParserCtxt(
    sax: *mut c_void,
    _user_data: *mut c_void,
    chunk: *const c_char,
    size: c_int,
    filename: *const c_char,
) -> *mut xmlParserCtxt {
    parser_init();
    clear_last_error();
    if !sax.is_null() {
        return fail(&XmlError::InvalidArgument(
            "custom SAX handlers are not supported through the C API".into(),
        ));
    }
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { buffer_arg(chunk, size) }.and_then(|initial| {
        // SAFETY: as above.
        let url = unsafe { str_arg(filename, "filename") }?;
        let mut options = ParseOptions::default();
        options.base_url = url.map(str::to_string);
        Ok((initial.to_vec(), options))
    });
    prepared
        .and_then(|(initial, options)| CtxtBox::create(options, true, initial))
        .unwrap_or_else(|e| fail(&e))
}

/// Feeds `size` bytes to a push context. A non-zero `terminate` ends the
/// input and publishes the document in `ctxt->doc`.
///
/// Returns 0 on success and -1 when the context refuses the chunk
/// (stopped, finished or failed) or a fatal error occurs. A refused chunk
/// leaves the context unchanged. Recovered errors only clear
/// `ctxt->wellFormed`.
#[no_mangle]
pub unsafe extern "C" fn xmlParseChunk(
    ctxt: *mut xmlParserCtxt,
    chunk: *const c_char,
    size: c_int,
    terminate: c_int,
) -> c_int {
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    let prepared = unsafe { CtxtBox::from_raw(ctxt) }
        .and_then(|block| Ok((unsafe { buffer_arg(chunk, size) }?, block)));
    let (bytes, block) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => return fail_status(&e),
    };
    let mut result = Ok(());
    if !block.input.is_empty() {
        result = block.inner.feed_chunk(&block.input);
        // A stopped context refuses input without consuming it.
        if block.inner.state() != ParserState::Stopped {
            block.input.clear();
        }
    }
    result = result.and_then(|()| block.inner.feed_chunk(bytes));
    if terminate != 0 {
        result = result.and_then(|()| block.inner.terminate());
    }
    if block.inner.state() == ParserState::Finished {
        block.publish();
    } else {
        block.sync();
    }
    match result {
        Ok(()) => 0,
        Err(e) => fail_status(&e),
    }
}

/// Suspends a push parse; later chunks are refused until
/// [`xmlResumeParser`].
#[no_mangle]
pub unsafe extern "C" fn xmlStopParser(ctxt: *mut xmlParserCtxt) {
    // SAFETY: arguments follow the documented contract.
    match unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| block.inner.stop()) {
        Ok(()) => {}
        Err(e) => log::debug!("xmlStopParser ignored: {e}"),
    }
}

/// Continues a stopped parse. Returns 0, or -1 if the context was not
/// stopped.
#[no_mangle]
pub unsafe extern "C" fn xmlResumeParser(ctxt: *mut xmlParserCtxt) -> c_int {
    clear_last_error();
    // SAFETY: arguments follow the documented contract.
    match unsafe { CtxtBox::from_raw(ctxt) }.and_then(|block| block.inner.resume()) {
        Ok(()) => 0,
        Err(e) => fail_status(&e),
    }
}
