/// Default upper bound for bytes carried between `scan` calls.
pub const DEFAULT_MAX_SETASIDE: usize = 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinifyRules {
    pub remove_space: bool,
    pub remove_comments: bool,
}

impl MinifyRules {
    pub const NONE: Self = Self {
        remove_space: false,
        remove_comments: false,
    };

    pub const ALL: Self = Self {
        remove_space: true,
        remove_comments: true,
    };

    pub fn is_noop(self) -> bool {
        !self.remove_space && !self.remove_comments
    }
}

/// Link rewriting rule. Registered and kept in order, but no transform consults
/// it yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CdnifyRule {
    pub prefix: String,
    /// `None` marks links under `prefix` as never to be rewritten.
    pub replacement: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexerConfig {
    pub rules: MinifyRules,
    pub max_setaside: usize,
    pub cdnify: Vec<CdnifyRule>,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            rules: MinifyRules::default(),
            max_setaside: DEFAULT_MAX_SETASIDE,
            cdnify: Vec::new(),
        }
    }
}
