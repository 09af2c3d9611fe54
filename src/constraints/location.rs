//! Location of a component relative to its parent.
//!
//! Two families of side constraints are supported:
//!
//! ```text
//!  inner (padding): how far a side is inset from the parent's same side
//!  ┌ parent ──────────────┐
//!  │  ←pad→┌ comp ┐       │       left padding  = comp.left - parent.left
//!  │       └──────┘       │       right padding = parent.right - comp.right
//!  └──────────────────────┘
//!
//!  outer (margin): how far the component sits beyond the parent's side
//!  ┌ comp ┐←margin→┌ parent ┐    left margin = parent.left - comp.right
//!  └──────┘        └────────┘
//! ```
//!
//! Sides are written as a comma separated list: `"bottom, right"` (flush,
//! range `0`), `"left=1+, top: 0..2"`.
//!
//! With implicit sides enabled:
//!
//! - inner constraints fill every unspecified side with `0+` (stay inside),
//! - outer constraints leave unspecified sides unconstrained (`*`), except that
//!   a single outer side gets the two orthogonal sides as `-1-` margins, which
//!   forces the projections to overlap (a component "above" must really be
//!   above, not diagonally off to the side).

use super::expr::{Arith, Expr, ExprEvaluator, rename_var};
use super::var::{Attr, PARENT, THIS, Var, VarValues};
use crate::error::ConstraintError;
use crate::geom::{Direction, OpenRange, RangedBox, Rect};
use bitflags::bitflags;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

bitflags! {
    /// Sides explicitly mentioned in a side string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sides: u8 {
        const LEFT   = 1 << 0;
        const TOP    = 1 << 1;
        const RIGHT  = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

impl Sides {
    pub fn of(dir: Direction) -> Sides {
        match dir {
            Direction::Left => Sides::LEFT,
            Direction::Up => Sides::TOP,
            Direction::Right => Sides::RIGHT,
            Direction::Down => Sides::BOTTOM,
        }
    }

    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(Sides::of(*d)))
    }

    /// Sides on the other axis.
    pub fn orthogonal(self) -> Sides {
        self.directions().flat_map(Direction::orthogonal).fold(Sides::empty(), |acc, d| acc | Sides::of(d))
    }
}

impl<'d> FromIterator<&'d Direction> for Sides {
    fn from_iter<I: IntoIterator<Item = &'d Direction>>(iter: I) -> Self {
        iter.into_iter().fold(Sides::empty(), |acc, d| acc | Sides::of(*d))
    }
}

/// Parse `"bottom, right=1+"` into per-side ranges; a bare side means `0`.
pub fn parse_sides(text: &str) -> Result<BTreeMap<Direction, OpenRange>, ConstraintError> {
    let mut sides = BTreeMap::new();
    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (side, range) = match entry.split_once(['=', ':']) {
            Some((side, range)) => (side.trim(), range.trim().parse::<OpenRange>()?),
            None => match entry.split_once(char::is_whitespace) {
                Some((side, range)) => (side.trim(), range.trim().parse::<OpenRange>()?),
                None => (entry, OpenRange::exact(0)),
            },
        };
        sides.insert(side.parse::<Direction>()?, range);
    }
    Ok(sides)
}

/// Per-side padding/margin constraint of `component` inside/around `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationConstraint {
    pub component: String,
    pub parent: String,
    pub inner: BTreeMap<Direction, OpenRange>,
    pub outer: BTreeMap<Direction, OpenRange>,
}

impl LocationConstraint {
    /// Build from optional inner and outer side strings.
    pub fn new(inner: Option<&str>, outer: Option<&str>, implicit_sides: bool) -> Result<Self, ConstraintError> {
        let inner = inner.map(parse_sides).transpose()?.unwrap_or_default();
        let outer = outer.map(parse_sides).transpose()?.unwrap_or_default();
        Ok(Self::from_sides(inner, outer, implicit_sides))
    }

    /// The component lies inside its parent.
    pub fn inside(sides: &str, implicit_sides: bool) -> Result<Self, ConstraintError> {
        Self::new(Some(sides), None, implicit_sides)
    }

    /// The component lies outside its parent.
    pub fn outside(sides: &str, implicit_sides: bool) -> Result<Self, ConstraintError> {
        Self::new(None, Some(sides), implicit_sides)
    }

    pub fn from_sides(
        mut inner: BTreeMap<Direction, OpenRange>,
        mut outer: BTreeMap<Direction, OpenRange>,
        implicit_sides: bool,
    ) -> Self {
        if implicit_sides {
            let declared: Sides = inner.keys().collect();
            if !declared.is_empty() {
                for dir in declared.complement().directions() {
                    inner.insert(dir, OpenRange::at_least(0));
                }
            }
            let declared: Sides = outer.keys().collect();
            if declared.bits().count_ones() == 1 {
                for dir in declared.orthogonal().directions() {
                    outer.insert(dir, OpenRange::at_most(-1));
                }
            }
        }
        LocationConstraint { component: THIS.to_string(), parent: PARENT.to_string(), inner, outer }
    }

    pub fn is_outer(&self) -> bool {
        !self.outer.is_empty() && self.inner.is_empty()
    }

    /// Inset of the component's `dir` side from the parent's `dir` side.
    pub fn padding(component: &Rect, parent: &Rect, dir: Direction) -> i64 {
        (parent.side(dir) - component.side(dir)) * dir.sign()
    }

    /// Distance from the parent's `dir` side outward to the component's facing side.
    pub fn margin(component: &Rect, parent: &Rect, dir: Direction) -> i64 {
        (component.side(dir.opposite()) - parent.side(dir)) * dir.sign()
    }

    /// Direct check against concrete rectangles.
    pub fn admits(&self, component: &Rect, parent: &Rect) -> bool {
        self.inner.iter().all(|(dir, range)| range.contains(Self::padding(component, parent, *dir)))
            && self.outer.iter().all(|(dir, range)| range.contains(Self::margin(component, parent, *dir)))
    }

    /// Legal positions of the parent's edges given where the component sits.
    /// `None` when the constraints cannot be met by any parent.
    pub fn parent_range(&self, component: &Rect) -> Option<RangedBox> {
        let mut edges: BTreeMap<Direction, OpenRange> = BTreeMap::new();
        let mut restrict = |dir: Direction, range: OpenRange| -> Option<()> {
            let current = edges.entry(dir).or_insert(OpenRange::unbounded());
            *current = current.intersect(&range)?;
            Some(())
        };
        for (dir, pad) in &self.inner {
            // parent.side = comp.side + sign * padding
            let offset = if dir.sign() > 0 { *pad } else { -*pad };
            restrict(*dir, offset + component.side(*dir))?;
        }
        for (dir, margin) in &self.outer {
            // parent.side = comp.opposite_side - sign * margin
            let offset = if dir.sign() > 0 { -*margin } else { *margin };
            restrict(*dir, offset + component.side(dir.opposite()))?;
        }
        let edge = |dir: Direction| edges.get(&dir).copied().unwrap_or_default();
        let ranged =
            RangedBox::from_sides(edge(Direction::Left), edge(Direction::Up), edge(Direction::Right), edge(Direction::Down));
        ranged.combine(&RangedBox::unbounded())
    }

    /// Equivalent expression over `[component_]side` variables.
    pub fn to_expr(&self) -> Expr {
        let side = |component: &str, dir: Direction| {
            let attr = match dir {
                Direction::Left => Attr::Left,
                Direction::Up => Attr::Top,
                Direction::Right => Attr::Right,
                Direction::Down => Attr::Bottom,
            };
            Arith::Var(Var::new(component, attr))
        };
        let signed = |a: Arith, b: Arith, sign: i64| {
            if sign > 0 { Arith::Sub(Box::new(a), Box::new(b)) } else { Arith::Sub(Box::new(b), Box::new(a)) }
        };
        let mut items = Vec::new();
        for (dir, range) in &self.inner {
            let value = signed(side(&self.parent, *dir), side(&self.component, *dir), dir.sign());
            items.push(Expr::within(value, *range));
        }
        for (dir, range) in &self.outer {
            let value = signed(side(&self.component, dir.opposite()), side(&self.parent, *dir), dir.sign());
            items.push(Expr::within(value, *range));
        }
        Expr::And(items)
    }
}

impl ExprEvaluator for LocationConstraint {
    fn describe(&self) -> String {
        format!("location constraint {self}")
    }

    fn referenced_variables(&self) -> BTreeSet<Var> {
        self.to_expr().referenced_variables()
    }

    fn eval_partial(&self, values: &VarValues) -> Option<bool> {
        self.to_expr().eval_partial(values)
    }

    fn replace_vars(&mut self, mapping: &HashMap<Var, Var>) {
        for (name, attr) in [(&mut self.component, Attr::Left), (&mut self.parent, Attr::Left)] {
            if let Some(target) = mapping.get(&Var::new(name.clone(), attr)) {
                *name = target.component.clone();
            }
        }
    }

    fn replace_components(&mut self, mapping: &HashMap<String, String>) {
        for name in [&mut self.component, &mut self.parent] {
            let mut renamed = Var::new(name.clone(), Attr::Left);
            rename_var(&mut renamed, mapping);
            *name = renamed.component;
        }
    }

    fn box_clone(&self) -> Box<dyn ExprEvaluator> {
        Box::new(self.clone())
    }
}

impl fmt::Display for LocationConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |sides: &BTreeMap<Direction, OpenRange>| {
            sides.iter().map(|(d, r)| format!("{d}={r}")).collect::<Vec<_>>().join(", ")
        };
        write!(f, "'{}' in '{}'", self.component, self.parent)?;
        if !self.inner.is_empty() {
            write!(f, " inner[{}]", list(&self.inner))?;
        }
        if !self.outer.is_empty() {
            write!(f, " outer[{}]", list(&self.outer))?;
        }
        Ok(())
    }
}
