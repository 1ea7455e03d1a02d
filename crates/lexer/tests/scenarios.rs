use lexer::{GrammarKind, HeapPool, Lexer, MinifyRules, minify};
use lexer_test_support::harness::{RunConfig, run_chunks};

fn run(kind: GrammarKind, rules: MinifyRules, input: &str) -> String {
    String::from_utf8(minify(kind, rules, input.as_bytes()).expect("minify")).expect("utf-8")
}

const SPACE_ONLY: MinifyRules = MinifyRules {
    remove_space: true,
    remove_comments: false,
};

#[test]
fn css_comment_and_optional_space_are_dropped() {
    assert_eq!(
        run(GrammarKind::Css, MinifyRules::ALL, "/* c */  a{color:red}"),
        "a{color:red}"
    );
}

#[test]
fn html_text_whitespace_collapses() {
    assert_eq!(run(GrammarKind::Html, SPACE_ONLY, "<p>a   b</p>"), "<p>a b</p>");
    assert_eq!(run(GrammarKind::Html, SPACE_ONLY, "<p>a\n\nb</p>"), "<p>a\nb</p>");
}

#[test]
fn html_conditional_comment_is_kept() {
    let rules = MinifyRules {
        remove_space: false,
        remove_comments: true,
    };
    let input = "<!--[if IE]>x<![endif]-->";
    assert_eq!(run(GrammarKind::Html, rules, input), input);
}

#[test]
fn js_blank_lines_between_identifiers_keep_one_newline() {
    assert_eq!(run(GrammarKind::Js, SPACE_ONLY, "a\n\nb"), "a\nb");
}

#[test]
fn js_line_comment_turns_into_a_newline() {
    // The newline survives only where it could end a statement.
    assert_eq!(
        run(GrammarKind::Js, MinifyRules::ALL, "x = a // hi\ny = 2"),
        "x=a\ny=2"
    );
    // After `;` nothing depends on it.
    assert_eq!(
        run(GrammarKind::Js, MinifyRules::ALL, "x = 1; // hi\ny = 2;"),
        "x=1;y=2;"
    );
}

#[test]
fn js_html_comment_markers_split_across_buffers() {
    let config = RunConfig::new(GrammarKind::Js, MinifyRules::ALL);
    let chunks = [&b"<!"[..], &b"-"[..], &b"- hidden\nx = 1;\n-"[..], &b"-> gone\n"[..]];
    let split = run_chunks(config, &chunks);
    assert_eq!(split.bytes, b"x=1;");
    assert!(!split.overflowed);
    let input = "<!--\nx = 1;\n-->\n";
    assert_eq!(run(GrammarKind::Js, MinifyRules::NONE, input), input);
}

#[test]
fn css_split_inside_comment_matches_whole() {
    let config = RunConfig::new(GrammarKind::Css, MinifyRules::ALL);
    let split = run_chunks(config, &[&b"/* c"[..], &b" */  a{color:red}"[..]]);
    assert_eq!(split.bytes, b"a{color:red}");
    assert!(!split.overflowed);
}

#[test]
fn noop_rules_echo_every_grammar() {
    let documents = [
        (GrammarKind::Css, "/* c */\n a  >  b { color : red }  "),
        (GrammarKind::Html, "<p  a = 'b' >x   <!-- y --></p >\n"),
        (GrammarKind::Js, "var  a = 1; // c\n/* d */ b()\n"),
    ];
    for (kind, input) in documents {
        assert_eq!(run(kind, MinifyRules::NONE, input), input, "{kind}");
    }
}

#[test]
fn unknown_content_type_has_no_lexer() {
    let lexer = Lexer::for_content_type("image/png", HeapPool, Vec::new());
    assert!(lexer.is_none());
    let lexer = Lexer::for_content_type(" Text/HTML ; charset=utf-8", HeapPool, Vec::new())
        .expect("html lexer");
    assert_eq!(lexer.grammar(), GrammarKind::Html);
}
