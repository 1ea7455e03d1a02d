//! Optional TOML configuration for the command-line driver.
//!
//! ```toml
//! max_setaside = 2048
//! block_size = 4096
//!
//! [minify]
//! remove_space = true
//! remove_comments = true
//!
//! [[cdnify]]
//! prefix = "/static/"
//! replacement = "https://cdn.example.com/static/"
//! ```

use std::fs;
use std::io;
use std::path::Path;

use lexer::{CdnifyRule, DEFAULT_MAX_SETASIDE, LexerConfig, MinifyRules};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BLOCK_SIZE: usize = 8192;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Read(#[from] io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub minify: MinifySection,
    pub max_setaside: Option<usize>,
    pub block_size: Option<usize>,
    #[serde(default)]
    pub cdnify: Vec<CdnifyEntry>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MinifySection {
    #[serde(default)]
    pub remove_space: bool,
    #[serde(default)]
    pub remove_comments: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CdnifyEntry {
    pub prefix: String,
    /// Absent means links under `prefix` are never rewritten.
    pub replacement: Option<String>,
}

/// Values given on the command line. `None` and `false` defer to the file.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overrides {
    pub remove_space: bool,
    pub remove_comments: bool,
    pub max_setaside: Option<usize>,
    pub block_size: Option<usize>,
}

/// Everything the driver needs after flags and file are merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub lexer: LexerConfig,
    pub block_size: usize,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Flags win over the file; the file wins over defaults.
    pub fn resolve(self, overrides: Overrides) -> Settings {
        let rules = MinifyRules {
            remove_space: overrides.remove_space || self.minify.remove_space,
            remove_comments: overrides.remove_comments || self.minify.remove_comments,
        };
        let cdnify = self
            .cdnify
            .into_iter()
            .map(|entry| CdnifyRule {
                prefix: entry.prefix,
                replacement: entry.replacement,
            })
            .collect();
        Settings {
            lexer: LexerConfig {
                rules,
                max_setaside: overrides
                    .max_setaside
                    .or(self.max_setaside)
                    .unwrap_or(DEFAULT_MAX_SETASIDE),
                cdnify,
            },
            block_size: overrides
                .block_size
                .or(self.block_size)
                .unwrap_or(DEFAULT_BLOCK_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BLOCK_SIZE, FileConfig, Overrides};
    use lexer::{DEFAULT_MAX_SETASIDE, MinifyRules};

    #[test]
    fn empty_file_gives_defaults() {
        let settings = FileConfig::parse("").unwrap().resolve(Overrides::default());
        assert_eq!(settings.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(settings.lexer.max_setaside, DEFAULT_MAX_SETASIDE);
        assert_eq!(settings.lexer.rules, MinifyRules::NONE);
        assert!(settings.lexer.cdnify.is_empty());
    }

    #[test]
    fn flags_override_file_values() {
        let file = FileConfig::parse(
            "max_setaside = 64\nblock_size = 16\n[minify]\nremove_comments = true\n",
        )
        .unwrap();
        let settings = file.resolve(Overrides {
            remove_space: true,
            max_setaside: Some(128),
            ..Overrides::default()
        });
        assert_eq!(settings.lexer.rules, MinifyRules::ALL);
        assert_eq!(settings.lexer.max_setaside, 128);
        assert_eq!(settings.block_size, 16);
    }

    #[test]
    fn cdnify_tables_keep_order() {
        let file = FileConfig::parse(
            "[[cdnify]]\nprefix = \"/a/\"\nreplacement = \"https://cdn/a/\"\n\n[[cdnify]]\nprefix = \"/b/\"\n",
        )
        .unwrap();
        let settings = file.resolve(Overrides::default());
        let rules = &settings.lexer.cdnify;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].prefix, "/a/");
        assert_eq!(rules[0].replacement.as_deref(), Some("https://cdn/a/"));
        assert_eq!(rules[1].prefix, "/b/");
        assert_eq!(rules[1].replacement, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("remove_space = true\n").is_err());
    }
}
