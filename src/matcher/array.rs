//! Arrays: homogeneous items lined up in a row, a column, or a filled area.
//!
//! ```text
//! items ──▶ clusters ──▶ fit check ──┬─ fits ───────────────▶ match
//!          (row/column runs,         ├─ too small ──────────▶ dropped
//!           fill components)         └─ too large ─┬─ in context: trim
//!                                                  └─ breakdown:
//!                                                       grid quadrants (size)
//!                                                       connected pieces (count)
//! ```
//!
//! Quadrant breakdown overlays grids of decreasing cell size on the cluster.
//! For a quadrant size `g` the grid origin is shifted by `[-(g-1), 0]` on each
//! axis. Slicings where every slice fits are candidates; slices of different
//! offsets may overlap, so the final choice goes through the clash resolver,
//! ranked by covered items, then by fewer slices.

use super::{Match, MatchContext, arbitrate, holds, own_boxes};
use crate::clash::{ClashResolver, Conflict};
use crate::constraints::SizeConstraint;
use crate::error::ConstraintError;
use crate::geom::{Direction, OpenRange, RangedBox, Rect};
use crate::grammar::{ArrayDirection, ArraySpec, Pattern};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

type Cluster = Vec<Arc<Match>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    Fits,
    TooSmall,
    TooLarge,
}

pub(crate) struct ArrayMatcher<'a> {
    pattern: &'a Pattern,
    spec: &'a ArraySpec,
    in_context: bool,
    ctx: MatchContext<'a>,
}

impl<'a> ArrayMatcher<'a> {
    pub fn new(pattern: &'a Pattern, spec: &'a ArraySpec, in_context: bool, ctx: MatchContext<'a>) -> Self {
        ArrayMatcher { pattern, spec, in_context, ctx }
    }

    pub fn find_all(&self, region: Option<&RangedBox>) -> Result<Vec<Arc<Match>>, ConstraintError> {
        let items = self.ctx.candidates(&self.spec.item, region);
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let clusters = match self.spec.direction {
            ArrayDirection::Row => self.lines(&items, Direction::Right),
            ArrayDirection::Column => self.lines(&items, Direction::Down),
            ArrayDirection::Fill => self.fill(&items),
            ArrayDirection::Auto => {
                let rows = self.lines(&items, Direction::Right);
                let columns = self.lines(&items, Direction::Down);
                if columns.len() < rows.len() { columns } else { rows }
            }
        };

        let size = self.pattern.size();
        let mut accepted: Vec<Cluster> = Vec::new();
        for cluster in clusters {
            match self.fit(&cluster, size) {
                Fit::Fits => accepted.push(cluster),
                Fit::TooSmall => {
                    tracing::debug!(pattern = %self.pattern.name, items = cluster.len(), "cluster too small");
                }
                Fit::TooLarge if self.in_context => {
                    if let Some(trimmed) = self.trim(cluster, size, region) {
                        accepted.push(trimmed);
                    }
                }
                Fit::TooLarge if self.spec.allow_breakdown => {
                    let pieces = match size {
                        Some(size) => self.quadrant_breakdown(&cluster, size),
                        None => self.balanced_breakdown(&cluster),
                    };
                    tracing::debug!(pattern = %self.pattern.name, items = cluster.len(), pieces = pieces.len(), "cluster broken down");
                    accepted.extend(pieces);
                }
                Fit::TooLarge => {
                    tracing::debug!(pattern = %self.pattern.name, items = cluster.len(), "cluster too large");
                }
            }
        }

        let own: Vec<_> = self.pattern.own_constraints().cloned().collect();
        let mut found = Vec::new();
        for cluster in accepted {
            let m = Match::array(&self.pattern.name, cluster);
            if holds(&own, &own_boxes(m.rect), &BTreeSet::new())? {
                found.push(Arc::new(m));
            }
        }
        Ok(arbitrate(found, self.ctx.options.element_limit))
    }

    fn adjacent(&self, a: &Rect, b: &Rect, dir: Direction) -> bool {
        a.directional_gap(b, dir).is_some_and(|gap| self.spec.gap.contains(gap))
    }

    fn neighbours(&self, a: &Rect, b: &Rect) -> bool {
        Direction::ALL.iter().any(|d| self.adjacent(a, b, *d))
    }

    /// Items sharing a cross-axis coordinate, sorted along `dir`, split where
    /// neighbours are not adjacent.
    fn lines(&self, items: &[Arc<Match>], dir: Direction) -> Vec<Cluster> {
        let horizontal = dir.is_horizontal();
        let mut groups: BTreeMap<i64, Vec<Arc<Match>>> = BTreeMap::new();
        for item in items {
            let key = if horizontal { item.rect.top() } else { item.rect.left() };
            groups.entry(key).or_default().push(Arc::clone(item));
        }

        let mut clusters = Vec::new();
        for (_, mut line) in groups {
            line.sort_by_key(|m| if horizontal { m.rect.left() } else { m.rect.top() });
            let mut run: Cluster = Vec::new();
            for item in line {
                if let Some(last) = run.last() {
                    if !self.adjacent(&last.rect, &item.rect, dir) {
                        clusters.push(std::mem::take(&mut run));
                    }
                }
                run.push(item);
            }
            if !run.is_empty() {
                clusters.push(run);
            }
        }
        clusters
    }

    /// Connected components under the adjacency relation in any direction.
    /// Members come out in breadth-first order from the top-left-most item.
    fn fill(&self, items: &[Arc<Match>]) -> Vec<Cluster> {
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by_key(|&i| (items[i].rect.top(), items[i].rect.left()));

        let mut seen = vec![false; items.len()];
        let mut clusters = Vec::new();
        for start in order {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut cluster = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(i) = queue.pop_front() {
                cluster.push(Arc::clone(&items[i]));
                for j in 0..items.len() {
                    if !seen[j] && self.neighbours(&items[i].rect, &items[j].rect) {
                        seen[j] = true;
                        queue.push_back(j);
                    }
                }
            }
            clusters.push(cluster);
        }
        clusters
    }

    fn fit(&self, cluster: &[Arc<Match>], size: Option<&SizeConstraint>) -> Fit {
        let n = cluster.len() as i64;
        let count = self.spec.item_count;
        if count.stop().is_some_and(|max| n > max) {
            return Fit::TooLarge;
        }
        let Some(rect) = Rect::union(cluster.iter().map(|m| &m.rect)) else {
            return Fit::TooSmall;
        };
        if let Some(size) = size {
            let over = |range: Option<OpenRange>, v: i64| range.and_then(|r| r.stop()).is_some_and(|max| v > max);
            if over(size.width, rect.width()) || over(size.height, rect.height()) {
                return Fit::TooLarge;
            }
            if !size.admits(&rect) {
                return Fit::TooSmall;
            }
        }
        if !count.contains(n) {
            return Fit::TooSmall;
        }
        Fit::Fits
    }

    /// Remove members lying only in the probable part of `region` first, then
    /// truncate.
    fn trim(&self, mut cluster: Cluster, size: Option<&SizeConstraint>, region: Option<&RangedBox>) -> Option<Cluster> {
        if let Some(region) = region.filter(|r| r.minimal().is_some()) {
            while self.fit(&cluster, size) == Fit::TooLarge {
                let Some(pos) = cluster.iter().rposition(|m| region.is_probable_only(&m.rect)) else {
                    break;
                };
                cluster.remove(pos);
            }
        }
        while self.fit(&cluster, size) == Fit::TooLarge && !cluster.is_empty() {
            cluster.pop();
        }
        (self.fit(&cluster, size) == Fit::Fits).then_some(cluster)
    }

    fn quadrant_breakdown(&self, cluster: &[Arc<Match>], size: &SizeConstraint) -> Vec<Cluster> {
        let Some(bbox) = Rect::union(cluster.iter().map(|m| &m.rect)) else {
            return Vec::new();
        };
        let (min_w, min_h) = size.min_size();
        let max_w = size.width.and_then(|r| r.stop()).unwrap_or(bbox.width()).min(bbox.width());
        let max_h = size.height.and_then(|r| r.stop()).unwrap_or(bbox.height()).min(bbox.height());

        let mut quadrants: Vec<(i64, i64)> =
            (min_w..=max_w).flat_map(|w| (min_h..=max_h).map(move |h| (w, h))).collect();
        quadrants.sort_by_key(|&(w, h)| ((w - h).abs(), Reverse(w * h), Reverse(w)));

        for (qw, qh) in quadrants {
            let mut slices: BTreeSet<Vec<usize>> = BTreeSet::new();
            for ox in -(qw - 1)..=0 {
                for oy in -(qh - 1)..=0 {
                    let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
                    for (i, m) in cluster.iter().enumerate() {
                        let gx = (m.rect.left() - bbox.left() - ox).div_euclid(qw);
                        let gy = (m.rect.top() - bbox.top() - oy).div_euclid(qh);
                        cells.entry((gy, gx)).or_default().push(i);
                    }
                    let all_fit = cells.values().all(|members| {
                        let slice: Cluster = members.iter().map(|&i| Arc::clone(&cluster[i])).collect();
                        self.fit(&slice, Some(size)) == Fit::Fits
                    });
                    if all_fit {
                        slices.extend(cells.into_values());
                    }
                }
            }
            if slices.is_empty() {
                continue;
            }

            let slices: Vec<Vec<usize>> = slices.into_iter().collect();
            let resolver = ClashResolver::new(slices, Conflict::components(|s: &Vec<usize>| s.clone()))
                .element_limit(self.ctx.options.element_limit);
            let best = resolver.best_by(|chosen| {
                let covered: usize = chosen.iter().map(|s| s.len()).sum();
                (covered, Reverse(chosen.len()))
            });
            return best
                .into_iter()
                .map(|slice| slice.iter().map(|&i| Arc::clone(&cluster[i])).collect())
                .collect();
        }
        Vec::new()
    }

    /// Split into `ceil(n / max)` connected pieces of near-equal size. Each
    /// piece grows breadth-first from the top-left-most unassigned member.
    fn balanced_breakdown(&self, cluster: &[Arc<Match>]) -> Vec<Cluster> {
        let Some(max) = self.spec.item_count.stop().and_then(|m| usize::try_from(m).ok()).filter(|m| *m > 0) else {
            return Vec::new();
        };
        let n = cluster.len();
        let parts = n.div_ceil(max);
        let (base, extra) = (n / parts, n % parts);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| (cluster[i].rect.top(), cluster[i].rect.left()));
        let mut assigned = vec![false; n];
        let mut pieces: Vec<Cluster> = Vec::with_capacity(parts);
        while let Some(start) = order.iter().copied().find(|&i| !assigned[i]) {
            let target = if pieces.len() < parts { base + usize::from(pieces.len() < extra) } else { max };
            let mut piece = Vec::with_capacity(target);
            let mut queued = vec![false; n];
            queued[start] = true;
            let mut queue = VecDeque::from([start]);
            while let Some(i) = queue.pop_front() {
                if piece.len() == target {
                    break;
                }
                assigned[i] = true;
                piece.push(Arc::clone(&cluster[i]));
                for &j in &order {
                    if !assigned[j] && !queued[j] && self.neighbours(&cluster[i].rect, &cluster[j].rect) {
                        queued[j] = true;
                        queue.push_back(j);
                    }
                }
            }
            pieces.push(piece);
        }
        pieces.retain(|piece| self.fit(piece, None) == Fit::Fits);
        pieces
    }
}
