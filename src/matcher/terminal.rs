use super::{Match, MatchContext, holds, own_boxes};
use crate::error::ConstraintError;
use crate::geom::RangedBox;
use crate::grammar::Pattern;
use std::collections::BTreeSet;
use std::sync::Arc;

/// One match per cell classified with the pattern's content type.
pub(crate) struct TerminalMatcher<'a> {
    pattern: &'a Pattern,
    content_type: &'a str,
    ctx: MatchContext<'a>,
}

impl<'a> TerminalMatcher<'a> {
    pub fn new(pattern: &'a Pattern, content_type: &'a str, ctx: MatchContext<'a>) -> Self {
        TerminalMatcher { pattern, content_type, ctx }
    }

    pub fn find_all(&self, region: Option<&RangedBox>) -> Result<Vec<Arc<Match>>, ConstraintError> {
        let threshold = self.ctx.options.precision_threshold;
        let own: Vec<_> = self.pattern.own_constraints().cloned().collect();
        let mut found = Vec::new();

        for classified in self.ctx.cells {
            let rect = classified.cell.rect;
            if region.is_some_and(|r| !r.may_contain(&rect)) {
                continue;
            }
            let Some(class) = classified.classes.iter().find(|c| c.content_type == self.content_type) else {
                continue;
            };
            if class.confidence <= 0.0 || class.confidence < threshold {
                continue;
            }
            if !holds(&own, &own_boxes(rect), &BTreeSet::new())? {
                continue;
            }
            found.push(Arc::new(Match::cell(
                &self.pattern.name,
                rect,
                classified.cell.text.clone(),
                self.content_type,
                class.confidence,
            )));
        }
        Ok(found)
    }
}
