//! String and buffer conversion at the C boundary.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

use super::types::xmlChar;
use crate::error::XmlError;

/// Converts `s` into a NUL-terminated string owned by the tree.
///
/// Tree text never contains NUL (the scanner rejects it), but hand-built
/// trees can; such strings are cut at the first NUL.
pub(crate) fn to_xml_char(s: &str) -> *mut xmlChar {
    let head = s.split('\0').next().unwrap_or_default();
    match CString::new(head) {
        Ok(cs) => cs.into_raw().cast(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Like [`to_xml_char`], but `None` and the empty string become null.
pub(crate) fn to_xml_char_opt(s: Option<&str>) -> *mut xmlChar {
    match s {
        Some(s) if !s.is_empty() => to_xml_char(s),
        _ => std::ptr::null_mut(),
    }
}

/// Frees a string made by [`to_xml_char`]. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or come from [`to_xml_char`] and not be freed yet.
pub(crate) unsafe fn free_xml_char(ptr: *const xmlChar) {
    if !ptr.is_null() {
        // SAFETY: `ptr` was created by `CString::into_raw` in `to_xml_char`.
        unsafe {
            drop(CString::from_raw(ptr.cast_mut().cast::<c_char>()));
        }
    }
}

/// Reads an optional string argument such as a URL or encoding name.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<Option<&'a str>, XmlError> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let cstr = unsafe { CStr::from_ptr(ptr) };
    cstr.to_str()
        .map(Some)
        .map_err(|_| XmlError::InvalidArgument(format!("{what} is not valid UTF-8")))
}

/// Borrows a `(buffer, size)` pair as a byte slice.
///
/// A null buffer is accepted only with size 0; a negative size is refused.
///
/// # Safety
///
/// A non-null `buffer` must point to `size` readable bytes that outlive `'a`.
pub(crate) unsafe fn buffer_arg<'a>(buffer: *const c_char, size: c_int) -> Result<&'a [u8], XmlError> {
    let len = usize::try_from(size)
        .map_err(|_| XmlError::InvalidArgument(format!("negative buffer size {size}")))?;
    if buffer.is_null() {
        if len == 0 {
            return Ok(&[]);
        }
        return Err(XmlError::InvalidArgument(format!(
            "null buffer with size {size}"
        )));
    }
    // SAFETY: non-null and `len` bytes long per the caller contract.
    Ok(unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), len) })
}

/// Borrows a NUL-terminated document string (without the terminator).
///
/// # Safety
///
/// `cur` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn doc_arg<'a>(cur: *const xmlChar) -> Result<&'a [u8], XmlError> {
    if cur.is_null() {
        return Err(XmlError::InvalidArgument("null document string".into()));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    Ok(unsafe { CStr::from_ptr(cur.cast::<c_char>()) }.to_bytes())
}
