use super::{Direction, Point};
use std::fmt;

/// Immutable rectangle on integer grid coordinates.
///
/// Edges are half-open: the rectangle covers columns `left..right` and rows
/// `top..bottom`. `w` and `h` are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    /// Create a rectangle; negative sizes are clamped to zero.
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Rect { x, y, w: w.max(0), h: h.max(0) }
    }

    /// A single grid cell.
    pub fn cell(x: i64, y: i64) -> Self {
        Rect::new(x, y, 1, 1)
    }

    /// Rectangle spanning two corner points (in any order).
    pub fn from_2points(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn from_sides(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn left(&self) -> i64 {
        self.x
    }

    pub fn top(&self) -> i64 {
        self.y
    }

    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }

    pub fn width(&self) -> i64 {
        self.w
    }

    pub fn height(&self) -> i64 {
        self.h
    }

    pub fn area(&self) -> i64 {
        self.w * self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Coordinate of the side facing `dir`.
    pub fn side(&self, dir: Direction) -> i64 {
        match dir {
            Direction::Right => self.right(),
            Direction::Up => self.top(),
            Direction::Left => self.left(),
            Direction::Down => self.bottom(),
        }
    }

    pub fn translate(&self, dx: i64, dy: i64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Grid points (cells) covered by this rectangle, row-major.
    pub fn points(&self) -> impl Iterator<Item = Point> + use<> {
        let (left, right, top, bottom) = (self.left(), self.right(), self.top(), self.bottom());
        (top..bottom).flat_map(move |y| (left..right).map(move |x| Point::new(x, y)))
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Common area of both rectangles; `None` unless both axes intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let right = self.right().min(other.right());
        let top = self.top().max(other.top());
        let bottom = self.bottom().min(other.bottom());
        if left < right && top < bottom { Some(Rect::from_sides(left, top, right, bottom)) } else { None }
    }

    /// Minimal rectangle covering all of `rects`; `None` for an empty input.
    pub fn union<'r>(rects: impl IntoIterator<Item = &'r Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc: Option<Rect>, r| {
            Some(match acc {
                None => *r,
                Some(a) => Rect::from_sides(
                    a.left().min(r.left()),
                    a.top().min(r.top()),
                    a.right().max(r.right()),
                    a.bottom().max(r.bottom()),
                ),
            })
        })
    }

    /// Overlap test: a corner of one rectangle lies inside the other, or one
    /// rectangle crosses the other without containing a corner.
    pub fn overlaps(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let corners = |r: &Rect| {
            [
                Point::new(r.left(), r.top()),
                Point::new(r.right() - 1, r.top()),
                Point::new(r.left(), r.bottom() - 1),
                Point::new(r.right() - 1, r.bottom() - 1),
            ]
        };
        if corners(other).iter().any(|p| self.contains_point(*p)) || corners(self).iter().any(|p| other.contains_point(*p))
        {
            return true;
        }
        // Cross shape: each spans the other along one axis.
        let spans_x = |a: &Rect, b: &Rect| a.left() <= b.left() && a.right() >= b.right();
        let spans_y = |a: &Rect, b: &Rect| a.top() <= b.top() && a.bottom() >= b.bottom();
        (spans_x(self, other) && spans_y(other, self)) || (spans_x(other, self) && spans_y(self, other))
    }

    /// 1D outer gap between the projections on the axis of `dir` (negative when they overlap).
    fn axis_gap(&self, other: &Rect, horizontal: bool) -> i64 {
        if horizontal {
            (other.left() - self.right()).max(self.left() - other.right())
        } else {
            (other.top() - self.bottom()).max(self.top() - other.bottom())
        }
    }

    /// Manhattan distance needed for the rectangles to touch: `0` if they
    /// already touch or overlap.
    pub fn manhattan_distance_to_touch(&self, other: &Rect) -> i64 {
        self.axis_gap(other, true).max(0) + self.axis_gap(other, false).max(0)
    }

    /// Approximate distance to make one rectangle overlap the other: `0` when
    /// one contains the other, otherwise the smallest Manhattan distance
    /// between corresponding corners.
    pub fn manhattan_distance_to_overlap(&self, other: &Rect) -> i64 {
        if self.contains_rect(other) || other.contains_rect(self) {
            return 0;
        }
        let corners = |r: &Rect| {
            [
                Point::new(r.left(), r.top()),
                Point::new(r.right(), r.top()),
                Point::new(r.left(), r.bottom()),
                Point::new(r.right(), r.bottom()),
            ]
        };
        corners(self).iter().zip(corners(other).iter()).map(|(a, b)| a.manhattan_distance(*b)).min().unwrap_or(0)
    }

    /// Gap from this rectangle to `other` when moving in `dir`, provided the
    /// projections on the perpendicular axis overlap. `None` when `other` is
    /// not in line with this rectangle.
    pub fn directional_gap(&self, other: &Rect, dir: Direction) -> Option<i64> {
        let horizontal = dir.is_horizontal();
        if self.axis_gap(other, !horizontal) >= 0 {
            return None;
        }
        let gap = match dir {
            Direction::Right => other.left() - self.right(),
            Direction::Left => self.left() - other.right(),
            Direction::Down => other.top() - self.bottom(),
            Direction::Up => self.top() - other.bottom(),
        };
        Some(gap)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{} {}x{}]", self.x, self.y, self.w, self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_is_inside_both_operands() {
        let a = Rect::new(0, 0, 4, 3);
        let b = Rect::new(2, 1, 5, 5);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i, Rect::new(2, 1, 2, 2));
        assert!(a.contains_rect(&i) && b.contains_rect(&i));

        let u = Rect::union([&a, &b]).unwrap();
        assert!(u.contains_rect(&a) && u.contains_rect(&b));
        assert_eq!(u, Rect::from_sides(0, 0, 7, 6));
    }

    #[test]
    fn disjoint_axes_do_not_intersect() {
        let a = Rect::new(0, 0, 2, 2);
        assert_eq!(a.intersect(&Rect::new(2, 0, 2, 2)), None);
        assert_eq!(a.intersect(&Rect::new(0, 5, 2, 2)), None);
        assert_eq!(Rect::union(std::iter::empty()), None);
    }

    #[test]
    fn overlap_includes_cross_shapes() {
        let horizontal = Rect::new(0, 2, 10, 1);
        let vertical = Rect::new(4, 0, 1, 10);
        assert!(horizontal.overlaps(&vertical));
        assert!(Rect::new(0, 0, 3, 3).overlaps(&Rect::new(2, 2, 3, 3)));
        assert!(!Rect::new(0, 0, 3, 3).overlaps(&Rect::new(3, 0, 3, 3)));
    }

    #[test]
    fn distance_to_touch() {
        let a = Rect::cell(0, 0);
        assert_eq!(a.manhattan_distance_to_touch(&Rect::cell(1, 0)), 0);
        assert_eq!(a.manhattan_distance_to_touch(&Rect::cell(1, 1)), 0);
        assert_eq!(a.manhattan_distance_to_touch(&Rect::cell(3, 0)), 2);
        assert_eq!(a.manhattan_distance_to_touch(&Rect::cell(3, 4)), 5);
    }

    #[test]
    fn distance_to_overlap_pairs_corners() {
        let big = Rect::new(0, 0, 5, 5);
        assert_eq!(big.manhattan_distance_to_overlap(&Rect::new(1, 1, 2, 2)), 0);
        assert_eq!(Rect::new(0, 0, 2, 2).manhattan_distance_to_overlap(&Rect::new(3, 0, 2, 2)), 3);
    }

    #[test]
    fn directional_gap_requires_alignment() {
        let a = Rect::cell(0, 0);
        assert_eq!(a.directional_gap(&Rect::cell(1, 0), Direction::Right), Some(0));
        assert_eq!(a.directional_gap(&Rect::cell(0, 3), Direction::Down), Some(2));
        assert_eq!(a.directional_gap(&Rect::cell(1, 1), Direction::Right), None);
    }

    #[test]
    fn from_2points_normalizes_corners() {
        assert_eq!(Rect::from_2points(10, 10, -15, -15), Rect::new(-15, -15, 25, 25));
        assert_eq!(Rect::cell(2, 3).points().collect::<Vec<_>>(), vec![Point::new(2, 3)]);
        assert_eq!(Rect::new(0, 0, 2, 2).points().count(), 4);
    }
}
