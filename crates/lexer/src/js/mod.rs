mod scanner;
mod transform;

use scanner::JsScanner;
use transform::JsTransform;

use crate::error::LexError;
use crate::grammar::Grammar;
use crate::scan::{ScanContext, Scanned, Step, Transform};

#[derive(Debug, Default)]
pub(crate) struct JsGrammar {
    scanner: JsScanner,
    transform: JsTransform,
}

impl Grammar for JsGrammar {
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
