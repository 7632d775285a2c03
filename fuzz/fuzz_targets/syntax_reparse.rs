#![no_main]

use epochscript_syntax::{parse, reparse, Edit};
use libfuzzer_sys::fuzz_target;
use text_size::{TextRange, TextSize};

const MAX_SOURCE_BYTES: usize = 4096;

fn decode_source(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(MAX_SOURCE_BYTES)];
    String::from_utf8_lossy(capped).into_owned()
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // Layout: [start seed, length seed, split, old text..., inserted text...]
    let split = 3 + usize::from(data[2]) % (data.len() - 2);
    let old_text = decode_source(&data[3..split]);
    let inserted = decode_source(&data[split..]);

    let start = if old_text.is_empty() {
        0
    } else {
        floor_char_boundary(&old_text, usize::from(data[0]) % (old_text.len() + 1))
    };
    let end = floor_char_boundary(&old_text, start + usize::from(data[1]) % 8).max(start);

    let range = TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32));
    let edit = Edit::replace(&old_text, range, &inserted);
    let new_text = edit.apply(&old_text, &inserted);

    let old = parse(&old_text);
    let result = reparse(&old, &edit, &new_text);
    let fresh = parse(&new_text);
    assert_eq!(result.parse.green(), fresh.green(), "{:?}", result.strategy);
    assert_eq!(result.parse.errors(), fresh.errors(), "{:?}", result.strategy);
});
