//! Every record an exported tree allocates is released by `xmlFreeDoc`.
//!
//! A counting global allocator tracks live allocations made on the test
//! thread; after a read and a free the balance must be back where it
//! started.

#![cfg(feature = "ffi")]
#![allow(unsafe_code, clippy::unwrap_used)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::os::raw::c_int;
use std::ptr;

use pretty_assertions::assert_eq;

use libxml2_rs::ffi::document::{xmlFreeDoc, xmlNewDoc};
use libxml2_rs::ffi::parser::{xmlCtxtReadMemory, xmlFreeParserCtxt, xmlNewParserCtxt, xmlReadMemory};
use libxml2_rs::ffi::push::{xmlCreatePushParserCtxt, xmlParseChunk};
use libxml2_rs::parser::XML_PARSE_RECOVER;

struct Counting;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

fn adjust(delta: isize) {
    // The slot may already be gone while the thread shuts down.
    let _ = LIVE.try_with(|live| live.set(live.get() + delta));
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        adjust(1);
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        adjust(-1);
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        adjust(1);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn live() -> isize {
    LIVE.with(Cell::get)
}

const SAMPLE: &str = "<?xml version='1.0' encoding='UTF-8' standalone='no'?>\n\
    <!DOCTYPE r>\n\
    <r xmlns='urn:d' xmlns:p='urn:p' xml:lang='en'>\n\
      <p:a k='v' p:q='1&amp;2' e='x&ent;y'>text<!--c--><?pi d?></p:a>\n\
      <b><![CDATA[cdata]]>&ent;</b>\n\
      <q:c/>\n\
    </r>";

fn read_and_free(xml: &str, options: c_int) {
    let len = c_int::try_from(xml.len()).unwrap();
    // SAFETY: `xml` is live for `len` bytes; the result is freed once.
    unsafe {
        let doc = xmlReadMemory(xml.as_ptr().cast(), len, ptr::null(), ptr::null(), options);
        assert!(!doc.is_null());
        xmlFreeDoc(doc);
    }
}

fn balance_of(f: impl Fn()) -> isize {
    // Warm-up: thread-local slots and lazy statics allocate once.
    f();
    let before = live();
    f();
    live() - before
}

#[test]
fn test_exported_trees_release_everything() {
    // Undeclared `q` and the unknown entity keep a recovered, namespaced
    // tree with entity-reference children and a stray namespace record.
    assert_eq!(balance_of(|| read_and_free(SAMPLE, XML_PARSE_RECOVER)), 0);
    assert_eq!(balance_of(|| read_and_free("<only/>", 0)), 0);

    assert_eq!(
        balance_of(|| unsafe {
            let doc = xmlNewDoc(ptr::null());
            xmlFreeDoc(doc);
        }),
        0
    );

    assert_eq!(
        balance_of(|| unsafe {
            let ctxt = xmlNewParserCtxt();
            for _ in 0..3 {
                let doc = xmlCtxtReadMemory(ctxt, b"<x a='1'/>".as_ptr().cast(), 10, ptr::null(), ptr::null(), 0);
                assert!(!doc.is_null());
                xmlFreeDoc(doc);
            }
            xmlFreeParserCtxt(ctxt);
        }),
        0
    );

    assert_eq!(
        balance_of(|| unsafe {
            let ctxt = xmlCreatePushParserCtxt(
                ptr::null_mut(),
                ptr::null_mut(),
                b"<r><a>".as_ptr().cast(),
                6,
                b"push.xml\0".as_ptr().cast(),
            );
            assert_eq!(xmlParseChunk(ctxt, b"t</a></r>".as_ptr().cast(), 9, 1), 0);
            let doc = (*ctxt).doc;
            (*ctxt).doc = ptr::null_mut();
            xmlFreeParserCtxt(ctxt);
            xmlFreeDoc(doc);
        }),
        0
    );
}
