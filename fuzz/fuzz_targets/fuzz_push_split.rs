#![no_main]
use libfuzzer_sys::fuzz_target;
use libxml2_rs::parser::{parse_bytes_with_options, ParseOptions, ParserContext};
use libxml2_rs::tree::dump::debug_dump;

// The first byte picks the chunk size; the rest is the document. Pushing
// it in chunks must give the same outcome as parsing it in one go.
fuzz_target!(|data: &[u8]| {
    let Some((&split, input)) = data.split_first() else {
        return;
    };
    let options = ParseOptions::default().recover(true);
    let one_shot = parse_bytes_with_options(input, &options);

    let Ok(mut ctx) = ParserContext::new_push(options) else {
        return;
    };
    let mut pushed = Ok(());
    for chunk in input.chunks(usize::from(split).max(1)) {
        pushed = ctx.feed_chunk(chunk);
        if pushed.is_err() {
            break;
        }
    }
    let pushed = pushed.and_then(|()| ctx.terminate()).map(|()| ctx.take_document());

    match (one_shot, pushed) {
        (Ok(a), Ok(Some(b))) => {
            assert_eq!(debug_dump(&a), debug_dump(&b));
            assert_eq!(a.well_formed, b.well_formed);
        }
        (Err(a), Err(b)) => assert_eq!(a.error, b),
        (a, b) => panic!("one-shot {a:?} vs pushed {b:?}"),
    }
});
