mod scanner;
mod transform;

pub(crate) use scanner::{CssScanner, is_space};
pub(crate) use transform::CssTransform;

use crate::error::LexError;
use crate::grammar::Grammar;
use crate::scan::{ScanContext, Scanned, Step, Transform};

#[derive(Debug, Default)]
pub(crate) struct CssGrammar {
    scanner: CssScanner,
    transform: CssTransform,
}

impl Grammar for CssGrammar {
    fn tokenize(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        is_eof: bool,
    ) -> Result<Scanned, LexError> {
        let mut i = 0;
        while i < data.len() {
            match self.scanner.step(ctx, data, i, &mut self.transform)? {
                Step::Advance(n) => i += n,
                Step::Retry => {}
                Step::Malformed => return Ok(Scanned::Malformed { at: i }),
            }
        }
        if is_eof {
            self.scanner.finish(ctx, data, &mut self.transform)?;
        }
        Ok(Scanned::Complete)
    }

    fn transform(&mut self) -> &mut dyn Transform {
        &mut self.transform
    }
}
