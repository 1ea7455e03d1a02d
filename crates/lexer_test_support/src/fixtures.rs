//! Golden minification fixtures.
//!
//! Layout: `<root>/<case>/case.toml`, `<root>/<case>/input` and
//! `<root>/<case>/expected`. `case.toml` names the grammar and the rules:
//!
//! ```toml
//! grammar = "css"
//! remove_space = true
//! remove_comments = true
//! status = "active"   # or "xfail" / "skip", which need a `reason`
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use lexer::{GrammarKind, MinifyRules};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStatus {
    #[default]
    Active,
    Xfail,
    Skip,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseFile {
    grammar: String,
    #[serde(default)]
    remove_space: bool,
    #[serde(default)]
    remove_comments: bool,
    #[serde(default)]
    status: FixtureStatus,
    reason: Option<String>,
    max_setaside: Option<usize>,
}

#[derive(Debug)]
pub struct Fixture {
    pub name: String,
    pub path: PathBuf,
    pub kind: GrammarKind,
    pub rules: MinifyRules,
    pub status: FixtureStatus,
    pub reason: Option<String>,
    pub max_setaside: Option<usize>,
    pub input: Vec<u8>,
    pub expected: Vec<u8>,
}

/// Load every fixture directory under `root`, sorted by name.
pub fn load_fixtures(root: &Path) -> Vec<Fixture> {
    let mut entries: Vec<_> = fs::read_dir(root)
        .unwrap_or_else(|err| panic!("failed to read fixture root {root:?}: {err}"))
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut fixtures = Vec::new();
    for entry in entries {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if name != name.trim() {
            panic!("fixture directory has leading/trailing whitespace: '{name}'");
        }
        fixtures.push(load_fixture(name, path));
    }
    fixtures
}

fn load_fixture(name: String, path: PathBuf) -> Fixture {
    let case_path = path.join("case.toml");
    let case_text = fs::read_to_string(&case_path)
        .unwrap_or_else(|err| panic!("failed to read {case_path:?}: {err}"));
    let case: CaseFile = toml::from_str(&case_text)
        .unwrap_or_else(|err| panic!("invalid case file {case_path:?}: {err}"));

    let kind = GrammarKind::from_extension(&case.grammar)
        .unwrap_or_else(|| panic!("unknown grammar '{}' in {case_path:?}", case.grammar));
    if matches!(case.status, FixtureStatus::Xfail | FixtureStatus::Skip)
        && case.reason.as_deref().unwrap_or("").is_empty()
    {
        panic!("non-active fixture missing reason in {case_path:?}");
    }

    let read = |file: &str| {
        let file_path = path.join(file);
        fs::read(&file_path).unwrap_or_else(|err| panic!("failed to read {file_path:?}: {err}"))
    };
    let input = read("input");
    let expected = read("expected");

    Fixture {
        name,
        kind,
        rules: MinifyRules {
            remove_space: case.remove_space,
            remove_comments: case.remove_comments,
        },
        status: case.status,
        reason: case.reason,
        max_setaside: case.max_setaside,
        input,
        expected,
        path,
    }
}
