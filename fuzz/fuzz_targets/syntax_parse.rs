#![no_main]

use epochscript_syntax::tree::leaves_text;
use epochscript_syntax::{parse, SyntaxKind};
use libfuzzer_sys::fuzz_target;

const MAX_SOURCE_BYTES: usize = 4096;

fn decode_source(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(MAX_SOURCE_BYTES)];
    String::from_utf8_lossy(capped).into_owned()
}

fuzz_target!(|data: &[u8]| {
    let source = decode_source(data);
    let parsed = parse(&source);
    let root = parsed.syntax();

    assert_eq!(root.text().to_string(), source);
    assert_eq!(leaves_text(&root), source);

    let mut layout = 0i64;
    for token in root.descendants_with_tokens().filter_map(|e| e.into_token()) {
        match token.kind() {
            SyntaxKind::Indent => layout += 1,
            SyntaxKind::Dedent => layout -= 1,
            _ => {}
        }
        assert!(layout >= 0, "dedent without indent in {source:?}");
    }
    assert_eq!(layout, 0, "unbalanced layout in {source:?}");

    let mut last = None;
    for error in parsed.errors() {
        assert!(error.range.end() <= root.text_range().end());
        let key = (error.range.start(), error.range.end());
        assert!(last.map_or(true, |prev| prev <= key), "errors out of order");
        last = Some(key);
    }
});
