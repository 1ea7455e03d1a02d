use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    Css,
    Html,
    Js,
}

const CONTENT_TYPES: &[(&str, GrammarKind)] = &[
    ("text/css", GrammarKind::Css),
    ("text/html", GrammarKind::Html),
    ("text/javascript", GrammarKind::Js),
    ("application/javascript", GrammarKind::Js),
    ("application/x-javascript", GrammarKind::Js),
];

const EXTENSIONS: &[(&str, GrammarKind)] = &[
    ("css", GrammarKind::Css),
    ("htm", GrammarKind::Html),
    ("html", GrammarKind::Html),
    ("js", GrammarKind::Js),
];

impl GrammarKind {
    /// Resolve a MIME type such as `text/html; charset=utf-8`.
    ///
    /// Matching is ASCII case-insensitive and ignores parameters after the
    /// first `;`. Anything else yields `None` and should be passed through
    /// untouched.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = match content_type.split_once(';') {
            Some((essence, _)) => essence,
            None => content_type,
        };
        let essence = essence.trim();
        CONTENT_TYPES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(essence))
            .map(|&(_, kind)| kind)
    }

    /// Resolve a file extension without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        EXTENSIONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(ext))
            .map(|&(_, kind)| kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GrammarKind::Css => "css",
            GrammarKind::Html => "html",
            GrammarKind::Js => "js",
        }
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
