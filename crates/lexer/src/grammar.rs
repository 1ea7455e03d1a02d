use crate::content_type::GrammarKind;
use crate::css::CssGrammar;
use crate::error::LexError;
use crate::html::HtmlGrammar;
use crate::js::JsGrammar;
use crate::scan::{ScanContext, Scanned, Transform};

/// One content-type grammar: a resumable tokenizer plus the transform it feeds.
pub(crate) trait Grammar {
    /// Consume `data`, emitting every token that completes inside it. On
    /// `is_eof` the trailing partial token is completed too.
    fn tokenize(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        is_eof: bool,
    ) -> Result<Scanned, LexError>;

    /// Transform used for bytes the tokenizer never classifies (failsafe and
    /// overflow flushes).
    fn transform(&mut self) -> &mut dyn Transform;
}

#[derive(Debug)]
pub(crate) enum GrammarState {
    Css(CssGrammar),
    Html(Box<HtmlGrammar>),
    Js(JsGrammar),
}

impl GrammarState {
    pub(crate) fn new(kind: GrammarKind) -> Self {
        match kind {
            GrammarKind::Css => GrammarState::Css(CssGrammar::default()),
            GrammarKind::Html => GrammarState::Html(Box::default()),
            GrammarKind::Js => GrammarState::Js(JsGrammar::default()),
        }
    }

    pub(crate) fn as_grammar(&mut self) -> &mut dyn Grammar {
        match self {
            GrammarState::Css(grammar) => grammar,
            GrammarState::Html(grammar) => grammar.as_mut(),
            GrammarState::Js(grammar) => grammar,
        }
    }
}
