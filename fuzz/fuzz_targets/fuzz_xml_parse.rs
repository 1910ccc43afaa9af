#![no_main]
use libfuzzer_sys::fuzz_target;
use libxml2_rs::parser::{parse_bytes_with_options, ParseOptions};

fuzz_target!(|data: &[u8]| {
    // Strict mode: never panics, whatever the bytes.
    let _ = parse_bytes_with_options(data, &ParseOptions::default());
    // Recovery mode: a document comes back unless input is undecodable.
    let _ = parse_bytes_with_options(data, &ParseOptions::default().recover(true));
});
