#![no_main]

use lexer::{GrammarKind, Lexer, MinifyRules};
use libfuzzer_sys::fuzz_target;

// First byte picks grammar and rules, second the split stride; the rest is
// the document. Splitting must never change the output.
fuzz_target!(|data: &[u8]| {
    let [selector, stride, doc @ ..] = data else {
        return;
    };
    let kind = match selector % 3 {
        0 => GrammarKind::Css,
        1 => GrammarKind::Html,
        _ => GrammarKind::Js,
    };
    let rules = MinifyRules {
        remove_space: selector & 0x04 != 0,
        remove_comments: selector & 0x08 != 0,
    };
    let stride = usize::from(*stride).max(1);
    // Keep every token inside the set-aside so splitting is lossless.
    let max_setaside = doc.len().max(1);

    let whole = {
        let mut out = Vec::new();
        let mut lexer = Lexer::with_heap(kind, &mut out);
        lexer.set_minify_rules(rules);
        lexer.set_max_setaside(max_setaside);
        lexer.scan(doc, true).expect("scan into Vec");
        drop(lexer);
        out
    };

    let mut out = Vec::new();
    let mut lexer = Lexer::with_heap(kind, &mut out);
    lexer.set_minify_rules(rules);
    lexer.set_max_setaside(max_setaside);
    for chunk in doc.chunks(stride) {
        assert_eq!(lexer.scan(chunk, false).expect("scan into Vec"), chunk.len());
        assert!(!lexer.setaside_overflowed());
    }
    lexer.scan(&[], true).expect("scan into Vec");
    drop(lexer);
    assert_eq!(out, whole);

    if rules.is_noop() {
        assert_eq!(whole, doc);
    }
});
