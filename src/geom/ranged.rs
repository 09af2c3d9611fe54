//! Boxes with uncertain edges.
//!
//! Every edge of a `RangedBox` is an [`OpenRange`] of possible coordinates.
//! Two realizations are derived from it:
//!
//! ```text
//!  maximal (probable): outermost edge positions   ┌─────────────┐
//!  minimal (definite): innermost edge positions   │   ┌─────┐   │
//!                                                 │   └─────┘   │
//!                                                 └─────────────┘
//! ```
//!
//! Combining two ranged boxes intersects edge ranges, which tightens the
//! maximal region and widens the minimal one without ever letting the minimal
//! region escape the maximal one.

use super::{OpenRange, Rect};

/// A 1D extent whose `start` and `stop` coordinates are ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RangedSegment {
    pub start: OpenRange,
    pub stop: OpenRange,
}

impl RangedSegment {
    pub fn new(start: OpenRange, stop: OpenRange) -> Self {
        RangedSegment { start, stop }
    }

    pub fn exact(start: i64, stop: i64) -> Self {
        RangedSegment { start: OpenRange::exact(start), stop: OpenRange::exact(stop) }
    }

    pub fn unbounded() -> Self {
        RangedSegment::default()
    }

    /// Definite extent: the latest start to the earliest stop.
    pub fn minimal(&self) -> Option<(i64, i64)> {
        let (start, stop) = (self.start.stop()?, self.stop.start()?);
        (start <= stop).then_some((start, stop))
    }

    /// Probable extent: the earliest start to the latest stop.
    pub fn maximal(&self) -> Option<(i64, i64)> {
        Some((self.start.start()?, self.stop.stop()?))
    }

    /// Tighten both edges; `None` when an edge becomes impossible.
    pub fn combine(&self, other: &RangedSegment) -> Option<RangedSegment> {
        let start = self.start.intersect(&other.start)?;
        let stop = self.stop.intersect(&other.stop)?;
        if let (Some(s), Some(e)) = (start.start(), stop.stop()) {
            if s > e {
                return None;
            }
        }
        Some(RangedSegment { start, stop })
    }

    pub fn admits(&self, start: i64, stop: i64) -> bool {
        self.start.contains(start) && self.stop.contains(stop)
    }
}

/// A rectangle whose four edges are ranges of possible coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RangedBox {
    pub horizontal: RangedSegment,
    pub vertical: RangedSegment,
}

impl RangedBox {
    pub fn new(horizontal: RangedSegment, vertical: RangedSegment) -> Self {
        RangedBox { horizontal, vertical }
    }

    pub fn from_sides(left: OpenRange, top: OpenRange, right: OpenRange, bottom: OpenRange) -> Self {
        RangedBox { horizontal: RangedSegment::new(left, right), vertical: RangedSegment::new(top, bottom) }
    }

    pub fn unbounded() -> Self {
        RangedBox::default()
    }

    /// A box whose minimal and maximal realizations are both `rect`.
    pub fn from_rect(rect: &Rect) -> Self {
        RangedBox {
            horizontal: RangedSegment::exact(rect.left(), rect.right()),
            vertical: RangedSegment::exact(rect.top(), rect.bottom()),
        }
    }

    /// A box that is definitely `definite` and probably reaches `probable`.
    pub fn from_extents(definite: &Rect, probable: &Rect) -> Option<Self> {
        let edge = |outer: i64, inner: i64| OpenRange::new(Some(outer.min(inner)), Some(outer.max(inner))).ok();
        Some(RangedBox::from_sides(
            edge(probable.left(), definite.left())?,
            edge(probable.top(), definite.top())?,
            edge(definite.right(), probable.right())?,
            edge(definite.bottom(), probable.bottom())?,
        ))
    }

    pub fn left(&self) -> OpenRange {
        self.horizontal.start
    }

    pub fn right(&self) -> OpenRange {
        self.horizontal.stop
    }

    pub fn top(&self) -> OpenRange {
        self.vertical.start
    }

    pub fn bottom(&self) -> OpenRange {
        self.vertical.stop
    }

    /// The region covered by every realization, if bounded and non-empty.
    pub fn minimal(&self) -> Option<Rect> {
        let (left, right) = self.horizontal.minimal()?;
        let (top, bottom) = self.vertical.minimal()?;
        Some(Rect::from_sides(left, top, right, bottom))
    }

    /// The region covered by some realization, if bounded.
    pub fn maximal(&self) -> Option<Rect> {
        let (left, right) = self.horizontal.maximal()?;
        let (top, bottom) = self.vertical.maximal()?;
        Some(Rect::from_sides(left, top, right, bottom))
    }

    /// Tighten with another ranged box; `None` when they are incompatible.
    pub fn combine(&self, other: &RangedBox) -> Option<RangedBox> {
        Some(RangedBox {
            horizontal: self.horizontal.combine(&other.horizontal)?,
            vertical: self.vertical.combine(&other.vertical)?,
        })
    }

    /// Whether `rect` is one of the realizations of this box.
    pub fn admits(&self, rect: &Rect) -> bool {
        self.horizontal.admits(rect.left(), rect.right()) && self.vertical.admits(rect.top(), rect.bottom())
    }

    /// Whether `rect` lies inside the probable region (unbounded sides admit anything).
    pub fn may_contain(&self, rect: &Rect) -> bool {
        self.left().start().is_none_or(|l| rect.left() >= l)
            && self.top().start().is_none_or(|t| rect.top() >= t)
            && self.right().stop().is_none_or(|r| rect.right() <= r)
            && self.bottom().stop().is_none_or(|b| rect.bottom() <= b)
    }

    /// Whether `rect` lies inside the definite region.
    pub fn surely_contains(&self, rect: &Rect) -> bool {
        self.minimal().is_some_and(|m| m.contains_rect(rect))
    }

    /// Inside the probable region but not the definite one.
    pub fn is_probable_only(&self, rect: &Rect) -> bool {
        self.may_contain(rect) && !self.surely_contains(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> OpenRange {
        s.parse().unwrap()
    }

    #[test]
    fn minimal_is_inside_maximal() {
        let b = RangedBox::from_sides(r("0..2"), r("0..1"), r("8..10"), r("5..6"));
        let (min, max) = (b.minimal().unwrap(), b.maximal().unwrap());
        assert_eq!(min, Rect::from_sides(2, 1, 8, 5));
        assert_eq!(max, Rect::from_sides(0, 0, 10, 6));
        assert!(max.contains_rect(&min));
    }

    #[test]
    fn combining_tightens_both_realizations() {
        let a = RangedBox::from_sides(r("0..2"), r("0..1"), r("8..10"), r("5..6"));
        let b = RangedBox::from_sides(r("1+"), r("*"), r("9-"), r("*"));
        let c = a.combine(&b).unwrap();
        assert_eq!(c.maximal().unwrap(), Rect::from_sides(1, 0, 9, 6));
        assert_eq!(c.minimal().unwrap(), Rect::from_sides(2, 1, 8, 5));
        assert!(c.maximal().unwrap().contains_rect(&c.minimal().unwrap()));
    }

    #[test]
    fn incompatible_boxes_do_not_combine() {
        let a = RangedBox::from_rect(&Rect::new(0, 0, 2, 2));
        let b = RangedBox::from_rect(&Rect::new(5, 0, 2, 2));
        assert_eq!(a.combine(&b), None);
        assert!(a.admits(&Rect::new(0, 0, 2, 2)));
    }

    #[test]
    fn probable_only_zone() {
        let b = RangedBox::from_extents(&Rect::new(2, 0, 4, 1), &Rect::new(0, 0, 8, 1)).unwrap();
        assert!(b.surely_contains(&Rect::cell(3, 0)));
        assert!(b.is_probable_only(&Rect::cell(0, 0)));
        assert!(!b.may_contain(&Rect::cell(9, 0)));
    }
}
