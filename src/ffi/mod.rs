//! The legacy C ABI.
//!
//! Exposes the parsing core under the historical libxml2 symbol names and
//! record layouts, so existing C callers can link against this crate
//! unchanged.
//!
//! # Error Handling
//!
//! Functions that can fail return null pointers (for pointer types) or -1
//! (for status codes). The message of the last failure is stored in
//! thread-local storage and can be read with [`xmlGetLastErrorMessage`].
//!
//! # Ownership
//!
//! Documents returned by the `xmlRead*`, `xmlCtxtRead*` and `xmlRecover*`
//! functions, and documents taken from a context's `doc` field, belong to
//! the caller and must be released with [`xmlFreeDoc`](document::xmlFreeDoc)
//! exactly once. Contexts are released with
//! [`xmlFreeParserCtxt`](parser::xmlFreeParserCtxt).
//!
//! # Safety
//!
//! All `extern "C"` functions in this module are inherently unsafe because
//! they accept raw pointers from C callers.

// FFI functions require unsafe blocks throughout.
#![allow(unsafe_code, clippy::missing_safety_doc)]

pub mod document;
pub mod parser;
pub mod push;
mod strings;
pub mod types;

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::XmlError;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set by the first entry point after start-up or a cleanup.
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Explicit `xmlInitParser` calls since the last cleanup.
static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Stores an error message in thread-local storage.
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(msg.replace('\0', " ")).ok();
    });
}

/// Clears the thread-local error.
fn clear_last_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

/// Records `err` as the last error and returns null.
fn fail<T>(err: &XmlError) -> *mut T {
    log::debug!("C API call failed: {err}");
    set_last_error(&err.to_string());
    std::ptr::null_mut()
}

/// Records `err` as the last error and returns -1.
fn fail_status(err: &XmlError) -> c_int {
    log::debug!("C API call failed: {err}");
    set_last_error(&err.to_string());
    -1
}

/// Entry points initialize lazily, as `xmlInitParser` would. Only the
/// first call after start-up or a cleanup does any work.
fn parser_init() {
    if INITIALIZED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        log::debug!("parser initialized");
    }
}

/// Returns `true` between an initialization and the next cleanup.
#[must_use]
pub fn parser_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Initializes the library. Safe to call any number of times, from any
/// thread.
#[no_mangle]
pub extern "C" fn xmlInitParser() {
    let calls = INIT_CALLS.fetch_add(1, Ordering::AcqRel) + 1;
    log::trace!("xmlInitParser call {calls}");
    parser_init();
}

/// Releases process-wide state. Documents and contexts that are still
/// alive stay valid; the next entry point initializes again.
#[no_mangle]
pub extern "C" fn xmlCleanupParser() {
    INIT_CALLS.store(0, Ordering::Release);
    if INITIALIZED.swap(false, Ordering::AcqRel) {
        log::debug!("parser cleaned up");
    }
}

/// Returns the message of the last failed call on this thread, or null.
///
/// The returned string is owned by the library and must NOT be freed
/// by the caller. It is valid until the next FFI call on the same thread.
#[no_mangle]
pub extern "C" fn xmlGetLastErrorMessage() -> *const c_char {
    LAST_ERROR.with(|cell| {
        let borrow = cell.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => std::ptr::null(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::ffi::CStr;

    #[test]
    fn test_last_error_round_trip() {
        clear_last_error();
        assert!(xmlGetLastErrorMessage().is_null());
        let p: *mut u8 = fail(&XmlError::InvalidArgument("bad size".into()));
        assert!(p.is_null());
        // SAFETY: the slot holds a live CString until the next call.
        let msg = unsafe { CStr::from_ptr(xmlGetLastErrorMessage()) };
        assert!(msg.to_str().unwrap_or_default().contains("bad size"));
        clear_last_error();
    }

    fn explicit_init_calls() -> usize {
        INIT_CALLS.load(Ordering::Acquire)
    }

    // The only test that calls `xmlInitParser` or `xmlCleanupParser`, so the
    // explicit count is not disturbed by tests running alongside it.
    #[test]
    fn test_init_and_cleanup() {
        xmlCleanupParser();
        xmlCleanupParser();
        assert_eq!(explicit_init_calls(), 0);

        // Entry points initialize without counting as an explicit call.
        // SAFETY: a null version selects the default; the document is
        // freed once.
        unsafe { document::xmlFreeDoc(document::xmlNewDoc(std::ptr::null())) };
        assert!(parser_initialized());
        assert_eq!(explicit_init_calls(), 0);

        xmlInitParser();
        xmlInitParser();
        assert!(parser_initialized());
        assert_eq!(explicit_init_calls(), 2);
        xmlCleanupParser();
        assert_eq!(explicit_init_calls(), 0);

        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| xmlInitParser()))
            .collect();
        for h in handles {
            assert!(h.join().is_ok());
        }
        assert!(parser_initialized());
        assert_eq!(explicit_init_calls(), 4);
        xmlCleanupParser();
        assert_eq!(explicit_init_calls(), 0);
    }
}
