use super::array::ArrayMatcher;
use super::{
    ComponentBoxes, Match, MatchContext, arbitrate, component_weights, composite_constraints, holds, may_hold,
};
use crate::constraints::{Constraint, THIS};
use crate::error::ConstraintError;
use crate::geom::{Point, RangedBox, Rect};
use crate::grammar::{ArraySpec, Pattern, PatternComponent, PatternKind, Role};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A candidate for one component, with the parent box positions it allows.
struct Candidate {
    found: Arc<Match>,
    points: BTreeSet<Point>,
    parent: RangedBox,
}

struct Slot<'a> {
    component: &'a PatternComponent,
    /// Set for array-in-context components, re-matched against the partial
    /// area's range.
    in_context: Option<(&'a Pattern, &'a ArraySpec)>,
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone)]
struct Partial {
    bound: BTreeMap<String, Vec<Arc<Match>>>,
    boxes: ComponentBoxes,
    occupied: BTreeSet<Point>,
    range: RangedBox,
    extent: Option<Rect>,
}

impl Partial {
    fn empty() -> Self {
        Partial {
            bound: BTreeMap::new(),
            boxes: ComponentBoxes::new(),
            occupied: BTreeSet::new(),
            range: RangedBox::unbounded(),
            extent: None,
        }
    }

    fn with(&self, name: &str, members: &[&Candidate], range: RangedBox) -> Partial {
        let mut next = self.clone();
        for candidate in members {
            let rect = candidate.found.rect;
            next.bound.entry(name.to_string()).or_default().push(Arc::clone(&candidate.found));
            next.boxes.entry(name.to_string()).or_default().push(rect);
            next.occupied.extend(candidate.points.iter().copied());
            next.extent = Some(next.extent.map_or(rect, |e| Rect::union([&e, &rect]).unwrap_or(rect)));
        }
        next.range = range;
        next
    }
}

/// Components float inside ranges relative to the area. The search binds
/// components most-constrained first and, at every step, only tries the
/// candidates closest to what is already bound. A repeated component binds
/// all of its nearest-first candidates that still fit, up to its maximum.
pub(crate) struct AreaMatcher<'a> {
    pattern: &'a Pattern,
    ctx: MatchContext<'a>,
}

impl<'a> AreaMatcher<'a> {
    pub fn new(pattern: &'a Pattern, ctx: MatchContext<'a>) -> Self {
        AreaMatcher { pattern, ctx }
    }

    pub fn find_all(&self, region: Option<&RangedBox>) -> Result<Vec<Arc<Match>>, ConstraintError> {
        let constraints = composite_constraints(self.pattern, &self.ctx);
        let mut slots: Vec<Slot<'_>> = self.pattern.components.iter().map(|c| self.slot(c, region)).collect();
        slots.sort_by_key(|s| (s.component.is_optional(), s.component.role == Role::Outer, s.candidates.len()));

        if let Some(missing) = slots.iter().find(|s| !s.component.is_optional() && s.candidates.is_empty()) {
            tracing::debug!(pattern = %self.pattern.name, component = %missing.component.name, "required component has no candidates");
            return Ok(Vec::new());
        }

        let search = Search { matcher: self, slots: &slots, constraints: &constraints, limit: self.ctx.options.max_area_results };
        let mut partials = Vec::new();
        let Some(first) = slots.first() else {
            return Ok(Vec::new());
        };
        let entries = search.step(0, &Partial::empty())?;
        if entries.is_empty() && first.component.is_optional() {
            search.extend(1, Partial::empty(), &mut partials)?;
        }
        // each entry point gets its own result budget
        for entry in entries {
            let mut results = Vec::new();
            search.extend(1, entry, &mut results)?;
            partials.extend(results);
        }

        let weights = component_weights(&self.pattern.components);
        let mut seen: BTreeSet<Vec<(String, Rect)>> = BTreeSet::new();
        let mut found = Vec::new();
        for partial in partials {
            let key: Vec<(String, Rect)> =
                partial.bound.iter().flat_map(|(k, members)| members.iter().map(|m| (k.clone(), m.rect))).collect();
            if !seen.insert(key) {
                continue;
            }
            if let Some(m) = self.finish(partial, &constraints, &weights, region)? {
                found.push(Arc::new(m));
            }
        }
        tracing::debug!(pattern = %self.pattern.name, candidates = found.len(), "area candidates");
        Ok(arbitrate(found, self.ctx.options.element_limit))
    }

    fn slot<'s>(&'s self, component: &'s PatternComponent, region: Option<&RangedBox>) -> Slot<'s> {
        let in_context = self.ctx.pattern(&component.pattern).and_then(|p| match &p.kind {
            PatternKind::ArrayInContext(spec) => Some((p, spec)),
            _ => None,
        });
        let candidates = self.candidates(component, self.ctx.candidates(&component.pattern, region));
        Slot { component, in_context, candidates }
    }

    /// Attach parent ranges; candidates no parent could accept are dropped.
    fn candidates(&self, component: &PatternComponent, found: Vec<Arc<Match>>) -> Vec<Candidate> {
        found
            .into_iter()
            .filter_map(|m| {
                let parent = component
                    .locations()
                    .try_fold(RangedBox::unbounded(), |acc, loc| acc.combine(&loc.parent_range(&m.rect)?))?;
                let points = m.points();
                Some(Candidate { found: m, points, parent })
            })
            .collect()
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
        if region.is_some_and(|r| !r.may_contain(&rect)) || !partial.range.admits(&rect) {
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

struct Search<'s, 'a> {
    matcher: &'s AreaMatcher<'a>,
    slots: &'s [Slot<'s>],
    constraints: &'s [Constraint],
    limit: usize,
}

impl Search<'_, '_> {
    /// Depth-first over the nearest candidates; stops once `limit` complete
    /// partials are collected.
    fn extend(&self, depth: usize, partial: Partial, results: &mut Vec<Partial>) -> Result<(), ConstraintError> {
        if results.len() >= self.limit {
            return Ok(());
        }
        if depth == self.slots.len() {
            results.push(partial);
            return Ok(());
        }
        let next = self.step(depth, &partial)?;
        if next.is_empty() {
            if self.slots[depth].component.is_optional() {
                self.extend(depth + 1, partial, results)?;
            }
            return Ok(());
        }
        for child in next {
            self.extend(depth + 1, child, results)?;
            if results.len() >= self.limit {
                break;
            }
        }
        Ok(())
    }

    /// Partials binding slot `depth`, nearest first.
    fn step(&self, depth: usize, partial: &Partial) -> Result<Vec<Partial>, ConstraintError> {
        let slot = &self.slots[depth];
        let rematched;
        let candidates: &[Candidate] = match slot.in_context {
            Some((pattern, spec)) if partial.range.minimal().is_some() => {
                let ctx = self.matcher.ctx;
                let found = ArrayMatcher::new(pattern, spec, true, ctx).find_all(Some(&partial.range))?;
                rematched = self.matcher.candidates(slot.component, found);
                &rematched
            }
            _ => &slot.candidates,
        };

        let mut viable: Vec<(i64, &Candidate, RangedBox)> = Vec::new();
        for candidate in candidates {
            if !partial.occupied.is_disjoint(&candidate.points) {
                continue;
            }
            let Some(range) = partial.range.combine(&candidate.parent) else {
                continue;
            };
            let mut boxes = partial.boxes.clone();
            boxes.insert(slot.component.name.clone(), vec![candidate.found.rect]);
            if !may_hold(self.constraints, &boxes) {
                continue;
            }
            let distance = partial.extent.map_or(0, |e| e.manhattan_distance_to_touch(&candidate.found.rect));
            viable.push((distance, candidate, range));
        }

        viable.sort_by(|(da, a, _), (db, b, _)| {
            da.cmp(db).then_with(|| b.found.precision().total_cmp(&a.found.precision())).then_with(|| {
                (a.found.rect.left() + a.found.rect.top()).cmp(&(b.found.rect.left() + b.found.rect.top()))
            })
        });

        let name = &slot.component.name;
        if slot.component.is_repeated() {
            let gathered = Self::gather(slot.component, partial, viable);
            return Ok(gathered.map(|(members, range)| partial.with(name, &members, range)).into_iter().collect());
        }

        let Some(nearest) = viable.first().map(|(d, _, _)| *d) else {
            return Ok(Vec::new());
        };
        // touching candidates also admit the ones a single cell away
        let cutoff = nearest.max(1);
        Ok(viable
            .into_iter()
            .take_while(|(d, _, _)| *d <= cutoff)
            .map(|(_, c, range)| partial.with(name, &[c], range))
            .collect())
    }

    /// Members of a repeated slot: viable candidates in order, skipping those
    /// overlapping an earlier pick or narrowing the range to nothing.
    fn gather<'c>(
        component: &PatternComponent,
        partial: &Partial,
        viable: Vec<(i64, &'c Candidate, RangedBox)>,
    ) -> Option<(Vec<&'c Candidate>, RangedBox)> {
        let mut range = partial.range;
        let mut occupied: BTreeSet<Point> = BTreeSet::new();
        let mut members = Vec::new();
        for (_, candidate, _) in viable {
            if members.len() >= component.max_count() {
                break;
            }
            if !occupied.is_disjoint(&candidate.points) {
                continue;
            }
            let Some(narrowed) = range.combine(&candidate.parent) else {
                continue;
            };
            range = narrowed;
            occupied.extend(candidate.points.iter().copied());
            members.push(candidate);
        }
        (!members.is_empty() && component.admits_count(members.len())).then_some((members, range))
    }
}
