use super::{
    ComponentBoxes, Match, MatchContext, arbitrate, component_weights, composite_constraints, holds, may_hold,
    mean_precision,
};
use crate::constraints::{Constraint, THIS};
use crate::error::ConstraintError;
use crate::geom::{Point, RangedBox, Rect};
use crate::grammar::{Pattern, PatternComponent, Role};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type Candidate = (Arc<Match>, BTreeSet<Point>);

/// Partially assembled structure.
#[derive(Debug, Clone, Default)]
struct Partial {
    bound: BTreeMap<String, Vec<Arc<Match>>>,
    boxes: ComponentBoxes,
    occupied: BTreeSet<Point>,
    score: f64,
}

impl Partial {
    fn with(&self, name: &str, members: &[&Candidate], weight: f64) -> Partial {
        let mut next = self.clone();
        let found: Vec<Arc<Match>> = members.iter().map(|(m, _)| Arc::clone(m)).collect();
        next.score += weight * mean_precision(&found);
        next.boxes.insert(name.to_string(), found.iter().map(|m| m.rect).collect());
        next.bound.insert(name.to_string(), found);
        for (_, points) in members {
            next.occupied.extend(points.iter().copied());
        }
        next
    }
}

/// Pairwise disjoint candidates in order, up to the component's maximum;
/// `None` when fewer than its minimum (or none at all) fit.
fn gather<'c>(component: &PatternComponent, viable: &[&'c Candidate]) -> Option<Vec<&'c Candidate>> {
    let mut taken: Vec<&Candidate> = Vec::new();
    let mut occupied: BTreeSet<Point> = BTreeSet::new();
    for candidate in viable {
        if taken.len() >= component.max_count() {
            break;
        }
        if occupied.is_disjoint(&candidate.1) {
            occupied.extend(candidate.1.iter().copied());
            taken.push(*candidate);
        }
    }
    (!taken.is_empty() && component.admits_count(taken.len())).then_some(taken)
}

/// Chain matching of a fixed structure: components are bound one at a time,
/// in declaration order, keeping every partial match the constraints still
/// allow. A repeated component binds every candidate that fits, top-left
/// first, up to its maximum.
pub(crate) struct StructureMatcher<'a> {
    pattern: &'a Pattern,
    ctx: MatchContext<'a>,
}

impl<'a> StructureMatcher<'a> {
    pub fn new(pattern: &'a Pattern, ctx: MatchContext<'a>) -> Self {
        StructureMatcher { pattern, ctx }
    }

    pub fn find_all(&self, region: Option<&RangedBox>) -> Result<Vec<Arc<Match>>, ConstraintError> {
        let constraints = composite_constraints(self.pattern, &self.ctx);
        let cutoff = self.ctx.options.cutoff_ratio;
        let mut partials = vec![Partial::default()];

        for component in &self.pattern.components {
            let candidates: Vec<Candidate> = self
                .ctx
                .candidates(&component.pattern, region)
                .into_iter()
                .map(|m| {
                    let points = m.points();
                    (m, points)
                })
                .collect();

            let mut next = Vec::new();
            for partial in &partials {
                let before = next.len();
                let viable: Vec<&Candidate> = candidates
                    .iter()
                    .filter(|(candidate, points)| {
                        if !partial.occupied.is_disjoint(points) {
                            return false;
                        }
                        let mut boxes = partial.boxes.clone();
                        boxes.insert(component.name.clone(), vec![candidate.rect]);
                        may_hold(&constraints, &boxes)
                    })
                    .collect();

                if component.is_repeated() {
                    if let Some(members) = gather(component, &viable) {
                        next.push(partial.with(&component.name, &members, component.weight));
                    }
                } else {
                    for candidate in viable {
                        next.push(partial.with(&component.name, &[candidate], component.weight));
                    }
                }
                if next.len() == before && component.is_optional() {
                    next.push(partial.clone());
                }
            }

            if next.is_empty() {
                tracing::debug!(pattern = %self.pattern.name, component = %component.name, "no candidate fits");
                return Ok(Vec::new());
            }
            let top = next.iter().map(|p| p.score).fold(f64::NEG_INFINITY, f64::max);
            next.retain(|p| p.score >= top * cutoff);
            partials = next;
        }

        let weights = component_weights(&self.pattern.components);
        let mut found = Vec::new();
        for partial in partials {
            if let Some(m) = self.finish(partial, &constraints, &weights, region)? {
                found.push(Arc::new(m));
            }
        }
        tracing::debug!(pattern = %self.pattern.name, candidates = found.len(), "structure candidates");
        Ok(arbitrate(found, self.ctx.options.element_limit))
    }

    fn finish(
        &self,
        mut partial: Partial,
        constraints: &[Constraint],
        weights: &BTreeMap<String, f64>,
        region: Option<&RangedBox>,
    ) -> Result<Option<Match>, ConstraintError> {
        let inner = self
            .pattern
            .components
            .iter()
            .filter(|c| c.role == Role::Inner)
            .filter_map(|c| partial.boxes.get(&c.name))
            .flatten();
        let Some(rect) = Rect::union(inner) else {
            return Ok(None);
        };
        if region.is_some_and(|r| !r.may_contain(&rect)) {
            return Ok(None);
        }
        partial.boxes.insert(THIS.to_string(), vec![rect]);

        let absent: BTreeSet<&str> = self
            .pattern
            .components
            .iter()
            .filter(|c| !partial.bound.contains_key(&c.name))
            .map(|c| c.name.as_str())
            .collect();
        if !holds(constraints, &partial.boxes, &absent)? {
            return Ok(None);
        }
        Ok(Some(Match::components(&self.pattern.name, rect, partial.bound, weights.clone())))
    }
}
