//! Grammar matching engine.
//!
//! ## How the parts work together
//!
//! ```text
//! grid ── CellClassifier ──▶ classified cells
//!                                 │
//!          Grammar::waves()       v
//!   wave 0 ─ TerminalMatcher  (cell patterns)
//!   wave 1 ─ ArrayMatcher     (rows, columns, filled areas)
//!   wave n ─ StructureMatcher / AreaMatcher
//!                                 │   each wave's matches are registered
//!                                 v   in the MatchRegistry afterwards
//!                          root pattern matches
//! ```
//!
//! Every matcher reads only matches of patterns from earlier waves. Composite
//! matchers may produce overlapping candidates; these are arbitrated through
//! the clash resolver with the occupied grid points as clash components, and
//! the best-scoring arrangement wins.
//!
//! ## Responsibilities by module
//!
//! - `registry.rs`: `MatchRegistry`, indexed by pattern and by position.
//! - `terminal.rs`: one match per classified cell.
//! - `structure.rs`: chain matching of fixed named components.
//! - `array.rs`: clustering of repeated items, breakdown of oversized clusters.
//! - `area.rs`: best-first search over floating components.
//! - `metrics.rs`: per-wave timing and counts.
//!
//! ## Debugging
//!
//! Matchers emit `tracing` events at `debug` level; count mismatches against a
//! pattern's `count_in_document` are `warn`ings.

#[path = "matcher/area.rs"]
mod area;
#[path = "matcher/array.rs"]
mod array;
#[path = "matcher/metrics.rs"]
mod metrics;
#[path = "matcher/registry.rs"]
mod registry;
#[path = "matcher/structure.rs"]
mod structure;
#[path = "matcher/terminal.rs"]
mod terminal;
#[cfg(test)]
#[path = "matcher/tests.rs"]
mod tests;

pub use metrics::{MatchRun, PatternMetrics, RunMetrics, WaveMetrics};
pub use registry::MatchRegistry;

use crate::api::Options;
use crate::clash::{ClashResolver, Conflict};
use crate::classify::{CellClassifier, Classification, RegexClassifier};
use crate::constraints::{Constraint, ExprEvaluator, PARENT, THIS};
use crate::error::{ConstraintError, Error, GrammarError};
use crate::geom::{Point, RangedBox, Rect};
use crate::grammar::{Grammar, Pattern, PatternComponent, PatternKind};
use crate::grid::{Cell, Grid};
use once_cell::sync::OnceCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use area::AreaMatcher;
use array::ArrayMatcher;
use structure::StructureMatcher;
use terminal::TerminalMatcher;

// --- Matches -----------------------------------------------------------------

/// A pattern bound to a grid box.
#[derive(Debug)]
pub struct Match {
    pub pattern: String,
    pub rect: Rect,
    pub data: MatchData,
    precision: OnceCell<f64>,
}

#[derive(Debug, Clone)]
pub enum MatchData {
    Cell {
        text: String,
        content_type: String,
        confidence: f64,
    },
    Array {
        items: Vec<Arc<Match>>,
    },
    Components {
        /// Matches bound per component; repeated components hold several.
        bound: BTreeMap<String, Vec<Arc<Match>>>,
        /// Weight of every declared component, bound or not.
        weights: BTreeMap<String, f64>,
    },
}

impl Match {
    pub fn cell(
        pattern: impl Into<String>,
        rect: Rect,
        text: impl Into<String>,
        content_type: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self::new(
            pattern,
            rect,
            MatchData::Cell { text: text.into(), content_type: content_type.into(), confidence },
        )
    }

    /// Items are stored row-major; the box is their union.
    pub fn array(pattern: impl Into<String>, mut items: Vec<Arc<Match>>) -> Self {
        items.sort_by_key(|m| (m.rect.top(), m.rect.left()));
        let rect = Rect::union(items.iter().map(|m| &m.rect)).unwrap_or_default();
        Self::new(pattern, rect, MatchData::Array { items })
    }

    pub fn components(
        pattern: impl Into<String>,
        rect: Rect,
        bound: BTreeMap<String, Vec<Arc<Match>>>,
        weights: BTreeMap<String, f64>,
    ) -> Self {
        Self::new(pattern, rect, MatchData::Components { bound, weights })
    }

    fn new(pattern: impl Into<String>, rect: Rect, data: MatchData) -> Self {
        Match { pattern: pattern.into(), rect, data, precision: OnceCell::new() }
    }

    /// Score over maximum score, in `[0, 1]`; computed once.
    pub fn precision(&self) -> f64 {
        *self.precision.get_or_init(|| match &self.data {
            MatchData::Cell { confidence, .. } => *confidence,
            MatchData::Array { items } if items.is_empty() => 0.0,
            MatchData::Array { items } => items.iter().map(|m| m.precision()).sum::<f64>() / items.len() as f64,
            MatchData::Components { bound, weights } => {
                let max: f64 = weights.values().sum();
                if max <= 0.0 {
                    return if bound.is_empty() { 0.0 } else { 1.0 };
                }
                let score: f64 = bound
                    .iter()
                    .map(|(name, members)| weights.get(name).copied().unwrap_or(0.0) * mean_precision(members))
                    .sum();
                score / max
            }
        })
    }

    /// First match bound to component `name`.
    pub fn component(&self, name: &str) -> Option<&Arc<Match>> {
        self.component_matches(name).first()
    }

    /// Every match bound to component `name`, top-left first.
    pub fn component_matches(&self, name: &str) -> &[Arc<Match>] {
        match &self.data {
            MatchData::Components { bound, .. } => bound.get(name).map(Vec::as_slice).unwrap_or_default(),
            _ => &[],
        }
    }

    pub fn items(&self) -> &[Arc<Match>] {
        match &self.data {
            MatchData::Array { items } => items,
            _ => &[],
        }
    }

    /// Cell matches underneath, row-major.
    pub fn leaves(&self) -> Vec<&Match> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out.sort_by_key(|m| (m.rect.top(), m.rect.left()));
        out
    }

    fn collect_leaves<'m>(&'m self, out: &mut Vec<&'m Match>) {
        match &self.data {
            MatchData::Cell { .. } => out.push(self),
            MatchData::Array { items } => items.iter().for_each(|m| m.collect_leaves(out)),
            MatchData::Components { bound, .. } => bound.values().flatten().for_each(|m| m.collect_leaves(out)),
        }
    }

    /// Leaf texts.
    pub fn content(&self) -> Vec<String> {
        self.leaves()
            .into_iter()
            .filter_map(|m| match &m.data {
                MatchData::Cell { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Leaf texts concatenated row-major.
    pub fn text(&self) -> String {
        self.content().concat()
    }

    /// Grid points occupied by the leaves (outer components included).
    pub fn points(&self) -> BTreeSet<Point> {
        self.leaves().iter().flat_map(|m| m.rect.points()).collect()
    }
}

/// Mean precision of a component's members; `0` when none are bound.
pub(crate) fn mean_precision(members: &[Arc<Match>]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    members.iter().map(|m| m.precision()).sum::<f64>() / members.len() as f64
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} p={:.3}", self.pattern, self.rect, self.precision())
    }
}

// --- Matching context --------------------------------------------------------

/// A grid cell with its classifications.
#[derive(Debug, Clone)]
pub(crate) struct ClassifiedCell {
    pub cell: Cell,
    pub classes: Vec<Classification>,
}

/// Read-only view shared by the matchers of one wave.
#[derive(Clone, Copy)]
pub(crate) struct MatchContext<'a> {
    pub grammar: &'a Grammar,
    pub registry: &'a MatchRegistry,
    pub options: &'a Options,
    pub cells: &'a [ClassifiedCell],
}

impl<'a> MatchContext<'a> {
    pub fn pattern(&self, name: &str) -> Option<&'a Pattern> {
        self.grammar.pattern(name)
    }

    /// Registered matches of `pattern` (extending patterns included).
    pub fn candidates(&self, pattern: &str, region: Option<&RangedBox>) -> Vec<Arc<Match>> {
        self.registry.matches_in(pattern, region)
    }
}

/// Closed set of per-kind matchers.
pub(crate) enum PatternMatcher<'a> {
    Terminal(TerminalMatcher<'a>),
    Structure(StructureMatcher<'a>),
    Array(ArrayMatcher<'a>),
    Area(AreaMatcher<'a>),
}

impl<'a> PatternMatcher<'a> {
    pub fn new(pattern: &'a Pattern, ctx: MatchContext<'a>) -> Self {
        match &pattern.kind {
            PatternKind::Cell { content_type } => PatternMatcher::Terminal(TerminalMatcher::new(pattern, content_type, ctx)),
            PatternKind::Structure => PatternMatcher::Structure(StructureMatcher::new(pattern, ctx)),
            PatternKind::Array(spec) => PatternMatcher::Array(ArrayMatcher::new(pattern, spec, false, ctx)),
            PatternKind::ArrayInContext(spec) => PatternMatcher::Array(ArrayMatcher::new(pattern, spec, true, ctx)),
            PatternKind::Area => PatternMatcher::Area(AreaMatcher::new(pattern, ctx)),
        }
    }

    /// Non-overlapping matches inside `region`, at most `match_limit`.
    pub fn find_all(
        &self,
        region: Option<&RangedBox>,
        match_limit: Option<usize>,
    ) -> Result<Vec<Arc<Match>>, ConstraintError> {
        let mut found = match self {
            PatternMatcher::Terminal(m) => m.find_all(region)?,
            PatternMatcher::Structure(m) => m.find_all(region)?,
            PatternMatcher::Array(m) => m.find_all(region)?,
            PatternMatcher::Area(m) => m.find_all(region)?,
        };
        found.sort_by_key(|m| (m.rect.top(), m.rect.left(), m.rect.height(), m.rect.width()));
        if let Some(limit) = match_limit {
            found.truncate(limit);
        }
        Ok(found)
    }
}

// --- Shared helpers ----------------------------------------------------------

/// Every constraint a composite pattern must satisfy, in the pattern's own
/// namespace: its own constraints plus each component's constraints (and the
/// component pattern's context constraints) bound under the component's name.
pub(crate) fn composite_constraints(pattern: &Pattern, ctx: &MatchContext<'_>) -> Vec<Constraint> {
    let mut all: Vec<Constraint> = pattern.own_constraints().cloned().collect();
    for component in &pattern.components {
        let inherited = ctx.pattern(&component.pattern).into_iter().flat_map(|p| p.context_constraints());
        for constraint in component.constraints.iter().chain(inherited) {
            all.push(constraint.bound_as(&component.name));
        }
    }
    all
}

/// Component name → boxes of its bound matches.
pub(crate) type ComponentBoxes = HashMap<String, Vec<Rect>>;

/// Every way of picking one box per component `constraint` mentions. A
/// constraint on a repeated component has to hold for each of its members.
fn assignments(constraint: &Constraint, boxes: &ComponentBoxes) -> Vec<HashMap<String, Rect>> {
    let mentioned: BTreeSet<String> = constraint.referenced_variables().into_iter().map(|v| v.component).collect();
    let mut out = vec![HashMap::new()];
    for name in mentioned {
        let Some(rects) = boxes.get(&name).filter(|r| !r.is_empty()) else { continue };
        let mut next = Vec::with_capacity(out.len() * rects.len());
        for base in &out {
            for rect in rects {
                let mut picked = base.clone();
                picked.insert(name.clone(), *rect);
                next.push(picked);
            }
        }
        out = next;
    }
    out
}

/// Three-valued check while a match is being assembled: only a definite
/// `false` rejects.
pub(crate) fn may_hold(constraints: &[Constraint], boxes: &ComponentBoxes) -> bool {
    constraints
        .iter()
        .all(|c| assignments(c, boxes).iter().all(|picked| c.eval_with_components_partial(picked) != Some(false)))
}

/// Strict check of a finished match. Constraints mentioning an absent optional
/// component are skipped; any other missing variable is an error.
pub(crate) fn holds(
    constraints: &[Constraint],
    boxes: &ComponentBoxes,
    absent: &BTreeSet<&str>,
) -> Result<bool, ConstraintError> {
    for constraint in constraints {
        let vars = constraint.referenced_variables();
        if vars.iter().any(|v| absent.contains(v.component.as_str()) || v.component == PARENT) {
            continue;
        }
        for picked in assignments(constraint, boxes) {
            if !constraint.eval_with_components(&picked)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Box map of a single match seen as `this`.
pub(crate) fn own_boxes(rect: Rect) -> ComponentBoxes {
    HashMap::from([(THIS.to_string(), vec![rect])])
}

/// Pick the non-overlapping subset maximizing total precision, then count,
/// then top-left-most placement.
pub(crate) fn arbitrate(candidates: Vec<Arc<Match>>, element_limit: Option<usize>) -> Vec<Arc<Match>> {
    if candidates.len() <= 1 {
        return candidates;
    }
    let resolver = ClashResolver::new(candidates, Conflict::components(|m: &Arc<Match>| m.points()))
        .element_limit(element_limit);
    resolver
        .best_by(|members| {
            let total: f64 = members.iter().map(|m| m.precision()).sum();
            let mut corners: Vec<(i64, i64)> = members.iter().map(|m| (m.rect.top(), m.rect.left())).collect();
            corners.sort();
            (total, members.len(), Reverse(corners))
        })
        .into_iter()
        .cloned()
        .collect()
}

/// Weights of all declared components.
pub(crate) fn component_weights(components: &[PatternComponent]) -> BTreeMap<String, f64> {
    components.iter().map(|c| (c.name.clone(), c.weight)).collect()
}

// --- Grammar matcher -------------------------------------------------------

/// Runs a grammar over grids.
pub struct GrammarMatcher {
    grammar: Grammar,
    options: Options,
    classifier: Box<dyn CellClassifier>,
    registry: MatchRegistry,
}

impl GrammarMatcher {
    /// Uses a [`RegexClassifier`] built from the grammar's cell types.
    pub fn new(grammar: Grammar, options: Options) -> Result<Self, GrammarError> {
        let classifier = RegexClassifier::new(grammar.cell_types())?;
        Ok(Self::with_classifier(grammar, options, classifier))
    }

    pub fn with_classifier(grammar: Grammar, options: Options, classifier: impl CellClassifier + 'static) -> Self {
        GrammarMatcher { grammar, options, classifier: Box::new(classifier), registry: MatchRegistry::new() }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Matches registered by the last run.
    pub fn registry(&self) -> &MatchRegistry {
        &self.registry
    }

    /// Root-pattern matches for `grid`.
    pub fn run_match(&mut self, grid: &Grid) -> Result<Vec<Arc<Match>>, Error> {
        Ok(self.run_with_metrics(grid)?.roots)
    }

    /// Matches of `pattern` from the last run, optionally restricted to `region`.
    pub fn get_pattern_matches(&self, pattern: &str, region: Option<&RangedBox>) -> Vec<Arc<Match>> {
        self.registry.matches_in(pattern, region)
    }

    pub fn run_with_metrics(&mut self, grid: &Grid) -> Result<MatchRun, Error> {
        let started = Instant::now();
        let mut metrics = RunMetrics::default();

        let classify_started = Instant::now();
        let cells: Vec<ClassifiedCell> = grid
            .cells()
            .map(|cell| ClassifiedCell { cell: cell.clone(), classes: self.classifier.classify(&cell.text) })
            .collect();
        metrics.classification = classify_started.elapsed();

        let mut registry = MatchRegistry::new();
        for (index, wave) in self.grammar.waves().iter().enumerate() {
            let wave_started = Instant::now();
            let mut wave_metrics = WaveMetrics { index, ..WaveMetrics::default() };
            let mut produced: Vec<(String, Vec<Arc<Match>>)> = Vec::with_capacity(wave.len());

            {
                let ctx = MatchContext { grammar: &self.grammar, registry: &registry, options: &self.options, cells: &cells };
                for name in wave {
                    let Some(pattern) = self.grammar.pattern(name) else { continue };
                    let pattern_started = Instant::now();
                    let found = PatternMatcher::new(pattern, ctx).find_all(None, self.options.match_limit)?;
                    let found = enforce_count(pattern, found);
                    tracing::debug!(pattern = %name, kind = pattern.kind.name(), found = found.len(), "pattern matched");
                    wave_metrics.patterns.push(PatternMetrics {
                        pattern: name.clone(),
                        duration: pattern_started.elapsed(),
                        produced: found.len(),
                        matches: found.clone(),
                    });
                    produced.push((name.clone(), found));
                }
            }

            for (name, found) in produced {
                let ancestors = self.grammar.ancestors(&name);
                wave_metrics.produced += found.len();
                for m in found {
                    registry.register(m, ancestors);
                }
            }
            wave_metrics.duration = wave_started.elapsed();
            metrics.waves.push(wave_metrics);
        }

        let roots = registry.matches(&self.grammar.root().name);
        self.registry = registry;
        metrics.total = started.elapsed();
        Ok(MatchRun { roots, metrics })
    }
}

/// Apply `count_in_document`: truncate above the maximum, only warn below the
/// minimum.
fn enforce_count(pattern: &Pattern, mut found: Vec<Arc<Match>>) -> Vec<Arc<Match>> {
    let count = pattern.count_in_document;
    if let Some(max) = count.stop() {
        let max = usize::try_from(max).unwrap_or(0);
        if found.len() > max {
            tracing::warn!(pattern = %pattern.name, found = found.len(), max, "too many matches; keeping the first");
            found.truncate(max);
        }
    }
    if let Some(min) = count.start() {
        if (found.len() as i64) < min {
            tracing::warn!(pattern = %pattern.name, found = found.len(), min, "fewer matches than expected");
        }
    }
    found
}
