use std::thread;

use lexer::{
    AllocError, CdnifyRule, DEFAULT_MAX_SETASIDE, GrammarKind, HeapPool, IoOutputStream, LexError,
    Lexer, LexerConfig, MinifyRules, TrackingPool, minify,
};
use lexer_test_support::chunker::ChunkPlan;
use lexer_test_support::corpus::html_blocks;
use lexer_test_support::harness::{FailingStream, LimitedStream, RunConfig, run_chunked};

#[test]
fn oversized_token_is_flushed_without_losing_bytes() {
    let input = b"a{}/* this comment is longer than eight */  b  c {}";
    let config = RunConfig::new(GrammarKind::Css, MinifyRules::ALL).with_max_setaside(8);
    let out = run_chunked(config, input, &ChunkPlan::fixed(4));
    assert!(out.overflowed);
    assert!(out.stats.setaside_overflows >= 1);
    assert!(!out.failsafe);
    // The comment goes out verbatim; tokenizing resumes after it.
    assert_eq!(
        String::from_utf8(out.bytes).unwrap(),
        "a{}/* this comment is longer than eight */b  c{}"
    );
}

#[test]
fn overflow_flag_is_per_call() {
    let mut out = Vec::new();
    let mut lexer = Lexer::with_heap(GrammarKind::Js, &mut out);
    lexer.set_max_setaside(4);
    lexer.scan(b"a /* long", false).unwrap();
    assert!(lexer.setaside_overflowed());
    lexer.scan(b" comment */ b", false).unwrap();
    assert!(!lexer.setaside_overflowed());
    lexer.scan(b"", true).unwrap();
    drop(lexer);
    assert_eq!(out, b"a /* long comment */ b");
}

#[test]
fn failsafe_passes_everything_after_it_through() {
    let mut out = Vec::new();
    let mut lexer = Lexer::with_heap(GrammarKind::Html, &mut out);
    lexer.set_minify_rules(MinifyRules::ALL);

    lexer.scan(b"<p>a   b</p>  <b <i>", false).unwrap();
    assert!(lexer.is_failsafe());
    let location = lexer.error().expect("failsafe location");
    assert_eq!(location.buffer_index, 17);
    assert_eq!(location.document_offset, 17);
    let before = lexer.bytes_out();

    lexer.scan(b"  x   <!-- y -->  ", false).unwrap();
    assert!(lexer.error().is_none(), "error is reported by the entering call only");
    lexer.set_minify_rules(MinifyRules::NONE);
    lexer.scan(b"\n\n z ", true).unwrap();
    assert!(lexer.is_failsafe());
    assert_eq!(lexer.stats().failsafe_entries, 1);
    let after = lexer.bytes_out() - before;
    drop(lexer);

    let tail = b"  x   <!-- y -->  \n\n z ";
    assert_eq!(after, tail.len() as u64);
    assert!(out.ends_with(tail));
    assert_eq!(out, b"<p>a b</p> <b <i>  x   <!-- y -->  \n\n z ");
}

#[test]
fn error_location_is_relative_to_the_failing_call() {
    let mut lexer = Lexer::with_heap(GrammarKind::Css, Vec::new());
    lexer.scan(b"a{} b", false).unwrap();
    assert!(lexer.error().is_none());
    lexer.scan(b"\0{}", true).unwrap();
    let location = lexer.error().expect("failsafe location");
    assert_eq!(location.buffer_index, 0);
    assert_eq!(location.document_offset, 5);
}

#[test]
fn counters_match_input_and_output() {
    let doc = html_blocks(50);
    let mut out = Vec::new();
    let mut lexer = Lexer::with_heap(GrammarKind::Html, &mut out);
    lexer.set_minify_rules(MinifyRules::ALL);
    let mut last_time = lexer.processing_time();
    for chunk in doc.chunks(37) {
        assert_eq!(lexer.scan(chunk, false).unwrap(), chunk.len());
        assert!(lexer.processing_time() >= last_time);
        last_time = lexer.processing_time();
    }
    lexer.scan(&[], true).unwrap();
    assert_eq!(lexer.bytes_in(), doc.len() as u64);
    let bytes_out = lexer.bytes_out();
    let stats = lexer.stats();
    drop(lexer);
    assert_eq!(bytes_out, out.len() as u64);
    assert!(out.len() < doc.len());
    assert!(stats.tokens_emitted > 0);
    assert_eq!(stats.setaside_overflows, 0);
}

#[test]
fn memory_is_bounded_by_the_setaside() {
    let pool = TrackingPool::new(HeapPool);
    let doc = html_blocks(2_000);
    let mut out = Vec::new();
    let mut lexer = Lexer::new(GrammarKind::Html, &pool, &mut out);
    lexer.set_minify_rules(MinifyRules::ALL);
    for chunk in doc.chunks(7) {
        lexer.scan(chunk, false).unwrap();
    }
    lexer.scan(&[], true).unwrap();
    assert_eq!(pool.allocations(), 1);
    assert!(pool.peak_bytes() <= DEFAULT_MAX_SETASIDE);
    drop(lexer);
    assert_eq!(pool.live_bytes(), 0);
}

#[test]
fn setaside_limit_sizes_the_pool_allocation() {
    let pool = TrackingPool::new(HeapPool);
    let mut lexer = Lexer::new(GrammarKind::Css, &pool, Vec::new());
    lexer.set_max_setaside(64);
    lexer.scan(b"a { color", false).unwrap();
    assert_eq!(pool.peak_bytes(), 64);
}

#[test]
fn shrinking_the_setaside_mid_token_keeps_the_held_token() {
    let pool = TrackingPool::new(HeapPool);
    let mut out = Vec::new();
    let mut lexer = Lexer::new(GrammarKind::Css, &pool, &mut out);
    lexer.set_minify_rules(MinifyRules::ALL);
    lexer.set_max_setaside(16);
    lexer.scan(b"a{}/* ab", false).unwrap();
    lexer.set_max_setaside(4);
    assert_eq!(lexer.max_setaside(), 4);
    lexer.scan(b" */b{}", true).unwrap();
    assert!(!lexer.setaside_overflowed());
    assert_eq!(pool.peak_bytes(), 16);
    drop(lexer);
    assert_eq!(out, b"a{}b{}");
    assert_eq!(pool.live_bytes(), 0);
}

#[test]
fn pool_failure_is_a_hard_error() {
    let pool = TrackingPool::with_limit(HeapPool, 0);
    let mut lexer = Lexer::new(GrammarKind::Css, &pool, Vec::new());
    let err = lexer.scan(b"abc", false).unwrap_err();
    assert!(
        matches!(
            err,
            LexError::Alloc(AllocError {
                size: DEFAULT_MAX_SETASIDE
            })
        ),
        "unexpected error: {err:?}"
    );
}

#[test]
fn short_write_is_a_hard_error() {
    let mut lexer = Lexer::with_heap(GrammarKind::Css, LimitedStream::new(3));
    let err = lexer.scan(b"abcdef{}", true).unwrap_err();
    assert!(
        matches!(err, LexError::ShortWrite { written: 3, len: 6 }),
        "unexpected error: {err:?}"
    );
    assert_eq!(lexer.bytes_out(), 3);
    assert_eq!(lexer.output().written, b"abc");
}

#[test]
fn failing_stream_surfaces_the_io_error() {
    let mut lexer = Lexer::with_heap(GrammarKind::Js, FailingStream);
    let err = lexer.scan(b"a b", true).unwrap_err();
    assert!(matches!(err, LexError::Output(_)), "unexpected error: {err:?}");
}

#[test]
fn io_output_stream_writes_through() {
    let mut lexer = Lexer::with_heap(GrammarKind::Css, IoOutputStream::new(Vec::new()));
    lexer.set_minify_rules(MinifyRules::ALL);
    lexer.scan(b"a { b : c }", true).unwrap();
    assert_eq!(lexer.output().get_ref(), b"a{b:c}");
}

#[test]
fn config_applies_rules_limit_and_cdnify() {
    let config = LexerConfig {
        rules: MinifyRules::ALL,
        max_setaside: 128,
        cdnify: vec![CdnifyRule {
            prefix: "/static/".into(),
            replacement: Some("https://cdn.example/".into()),
        }],
    };
    let mut lexer = Lexer::with_heap(GrammarKind::Html, Vec::new()).with_config(config);
    lexer.add_cdnify_rule("/private/", None);
    assert_eq!(lexer.minify_rules(), MinifyRules::ALL);
    assert_eq!(lexer.max_setaside(), 128);
    let prefixes: Vec<&str> = lexer
        .cdnify_rules()
        .iter()
        .map(|rule| rule.prefix.as_str())
        .collect();
    assert_eq!(prefixes, ["/static/", "/private/"]);
    assert_eq!(lexer.cdnify_rules()[1].replacement, None);
}

#[test]
fn independent_documents_minify_in_parallel() {
    let doc = html_blocks(200);
    let expected = minify(GrammarKind::Html, MinifyRules::ALL, &doc).unwrap();
    thread::scope(|scope| {
        let handles: Vec<_> = (1..=4)
            .map(|step| {
                let doc = &doc;
                scope.spawn(move || {
                    let mut out = Vec::new();
                    let mut lexer = Lexer::with_heap(GrammarKind::Html, &mut out);
                    lexer.set_minify_rules(MinifyRules::ALL);
                    for chunk in doc.chunks(step * 13) {
                        lexer.scan(chunk, false).unwrap();
                    }
                    lexer.scan(&[], true).unwrap();
                    drop(lexer);
                    out
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
