use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn squeeze(args: &[&str], stdin: Option<&[u8]>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_squeeze"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn squeeze");
    {
        let mut pipe = child.stdin.take().expect("stdin");
        if let Some(data) = stdin {
            pipe.write_all(data).expect("write stdin");
        }
    }
    child.wait_with_output().expect("wait for squeeze")
}

fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("squeeze_cli");
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn minifies_a_file_chosen_by_extension() {
    let path = temp_file("basic.css", b"/* c */  a{color:red}");
    let out = squeeze(&["--minify", path.to_str().unwrap()], None);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, b"a{color:red}");
    assert!(
        stderr(&out).contains("21 bytes in, 12 bytes out, "),
        "{}",
        stderr(&out)
    );
    assert!(stderr(&out).contains("nsec/byte)"));
}

#[test]
fn reads_stdin_with_an_explicit_grammar() {
    let out = squeeze(&["--html", "--remove-space"], Some(b"<p>a   b</p>"));
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, b"<p>a b</p>");
}

#[test]
fn empty_input_prints_no_summary() {
    let out = squeeze(&["--css", "--minify"], Some(b""));
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(out.stdout.is_empty());
    assert!(!stderr(&out).contains("bytes in"), "{}", stderr(&out));
}

#[test]
fn tiny_blocks_give_the_same_output() {
    let input = b"<p class = \"a\">a   b</p>\n\n<!-- c --><style> p { x : y } </style>";
    let path = temp_file("blocks.html", input);
    let whole = squeeze(&["--minify", path.to_str().unwrap()], None);
    let tiny = squeeze(&["--minify", "--block-size=1", path.to_str().unwrap()], None);
    assert!(whole.status.success() && tiny.status.success());
    assert_eq!(whole.stdout, tiny.stdout);
}

#[test]
fn without_rules_input_is_echoed() {
    let input = b"var  a = 1; // c\n/* d */ b()\n";
    let path = temp_file("echo.js", input);
    let out = squeeze(&[path.to_str().unwrap()], None);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, input);
}

#[test]
fn failsafe_location_is_reported() {
    let out = squeeze(&["--css", "--minify"], Some(b"a { }  b\0c  d"));
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, b"a{}b\0c  d");
    assert!(
        stderr(&out).contains("parsing error detected near '\0c  d'"),
        "{}",
        stderr(&out)
    );
}

#[test]
fn config_file_supplies_rules() {
    let config = temp_file(
        "rules.toml",
        b"block_size = 3\n[minify]\nremove_comments = true\nremove_space = true\n",
    );
    let out = squeeze(
        &["--css", "--config", config.to_str().unwrap()],
        Some(b"/* c */  a{color:red}"),
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, b"a{color:red}");
}

#[test]
fn exit_codes_follow_the_failure() {
    assert_eq!(squeeze(&[], None).status.code(), Some(1));

    let a = temp_file("one.css", b"a{}");
    let b = temp_file("two.css", b"b{}");
    let out = squeeze(&[a.to_str().unwrap(), b.to_str().unwrap()], None);
    assert_eq!(out.status.code(), Some(1));

    let txt = temp_file("notes.txt", b"hello");
    let out = squeeze(&[txt.to_str().unwrap()], None);
    assert_eq!(out.status.code(), Some(2));

    let missing = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("squeeze_cli/missing.css");
    let out = squeeze(&[missing.to_str().unwrap()], None);
    assert_eq!(out.status.code(), Some(3));

    let bad = temp_file("bad.toml", b"remove_space = 1\n");
    let out = squeeze(&["--css", "--config", bad.to_str().unwrap()], Some(b""));
    assert_eq!(out.status.code(), Some(4));

    let out = squeeze(&["--css", "--block-size=0"], Some(b""));
    assert_eq!(out.status.code(), Some(1));
}
