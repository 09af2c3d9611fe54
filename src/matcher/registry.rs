use super::Match;
use crate::geom::{Point, RangedBox, Rect};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// All matches found so far in a run.
///
/// Append-only: a wave's matches are registered once the whole wave is done,
/// so matchers of later waves read a stable view.
#[derive(Debug, Default, Clone)]
pub struct MatchRegistry {
    found: Vec<Arc<Match>>,
    by_pattern: HashMap<String, Vec<usize>>,
    /// Top-left corner → indices into `found`.
    by_position: BTreeMap<Point, Vec<usize>>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `found` under its own pattern and every name in `also_as`.
    pub fn register(&mut self, found: Arc<Match>, also_as: &[String]) {
        let id = self.found.len();
        for name in std::iter::once(&found.pattern).chain(also_as) {
            self.by_pattern.entry(name.clone()).or_default().push(id);
        }
        self.by_position.entry(found.rect.top_left()).or_default().push(id);
        self.found.push(found);
    }

    /// Matches of `pattern` in registration order.
    pub fn matches(&self, pattern: &str) -> Vec<Arc<Match>> {
        self.by_pattern.get(pattern).into_iter().flatten().map(|&id| Arc::clone(&self.found[id])).collect()
    }

    /// Matches of `pattern` lying inside the probable extent of `region`, in
    /// registration order.
    pub fn matches_in(&self, pattern: &str, region: Option<&RangedBox>) -> Vec<Arc<Match>> {
        let Some(region) = region else {
            return self.matches(pattern);
        };
        let Some(ids) = self.by_pattern.get(pattern) else {
            return Vec::new();
        };
        let near: Option<BTreeSet<usize>> = region.maximal().map(|extent| self.anchored_in(&extent).collect());
        ids.iter()
            .filter(|&&id| near.as_ref().is_none_or(|near| near.contains(&id)))
            .map(|id| &self.found[*id])
            .filter(|m| region.may_contain(&m.rect))
            .cloned()
            .collect()
    }

    /// Indices of matches whose top-left corner lies in `extent`.
    fn anchored_in(&self, extent: &Rect) -> impl Iterator<Item = usize> + '_ {
        let (top, bottom) = (extent.top(), extent.bottom());
        self.by_position
            .range(Point::new(extent.left(), i64::MIN)..Point::new(extent.right(), i64::MIN))
            .filter(move |(p, _)| p.y >= top && p.y < bottom)
            .flat_map(|(_, ids)| ids.iter().copied())
    }

    /// Distinct registered matches.
    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::OpenRange;

    #[test]
    fn indexes_by_pattern_alias_and_position() {
        let mut registry = MatchRegistry::new();
        let a = Arc::new(Match::cell("digit", Rect::cell(0, 1), "8", "digit", 1.0));
        let b = Arc::new(Match::cell("digit", Rect::cell(5, 5), "3", "digit", 1.0));
        registry.register(a, &["symbol".to_string()]);
        registry.register(b, &[]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.matches("digit").len(), 2);
        assert_eq!(registry.matches("symbol").len(), 1);
        assert!(registry.matches("nothing").is_empty());

        let near_origin = RangedBox::from_sides(
            OpenRange::at_least(0),
            OpenRange::at_least(0),
            OpenRange::at_most(3),
            OpenRange::at_most(3),
        );
        let inside = registry.matches_in("digit", Some(&near_origin));
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].rect, Rect::cell(0, 1));
        assert_eq!(registry.matches_in("symbol", Some(&near_origin)).len(), 1);
    }

    #[test]
    fn bounded_regions_use_the_position_index() {
        let mut registry = MatchRegistry::new();
        for (x, y) in [(0, 0), (2, 0), (2, 2), (4, 1), (2, 5)] {
            registry.register(Arc::new(Match::cell("x", Rect::cell(x, y), "x", "x", 1.0)), &[]);
        }
        // may grow from columns 1..3 out to 1..5, rows 0..3
        let region = RangedBox::from_extents(&Rect::new(1, 0, 2, 3), &Rect::new(1, 0, 4, 3)).unwrap();
        let points: Vec<Point> = registry.matches_in("x", Some(&region)).iter().map(|m| m.rect.top_left()).collect();
        assert_eq!(points, vec![Point::new(2, 0), Point::new(2, 2), Point::new(4, 1)]);
        assert!(registry.anchored_in(&Rect::new(3, 0, 0, 9)).next().is_none());
    }
}
