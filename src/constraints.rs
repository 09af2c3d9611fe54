//! Spatial constraint engine.
//!
//! A constraint is a boolean expression over variables named
//! `[component_]attr`, where `attr` is one of `left/top/right/bottom/w/h`
//! (with the usual aliases). The constrained pattern itself is the component
//! `''` (alias `this`); its enclosing pattern is `'_'` (alias `parent`).
//!
//! When a component is bound into a parent, its constraints are renamed into
//! the parent's namespace:
//!
//! ```text
//! component "letters":   left >= _left        (this / parent)
//!            renamed ──▶ letters_left >= left (component / this)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `var.rs`: `Var`, `Attr`, the `this`/`parent` aliases.
//! - `expr.rs`: the `ExprEvaluator` contract and the built-in `Expr` tree.
//! - `parse.rs`: textual constraints (`"letters_bottom <= field_top"`).
//! - `size.rs`: `SizeConstraint`.
//! - `location.rs`: `LocationConstraint` and its implicit-side defaults.
//!
//! [`Constraint`] is the closed sum over those kinds plus boolean
//! composition. Alternative evaluators plug in through
//! [`Constraint::External`].

#[path = "constraints/expr.rs"]
mod expr;
#[path = "constraints/location.rs"]
mod location;
#[path = "constraints/parse.rs"]
mod parse;
#[path = "constraints/size.rs"]
mod size;
#[path = "constraints/var.rs"]
mod var;

pub use expr::{Arith, CmpOp, Expr, ExprEvaluator};
pub use location::{LocationConstraint, Sides, parse_sides};
pub use parse::parse_expr;
pub use size::SizeConstraint;
pub use var::{Attr, PARENT, THIS, Var, VarValues, canonical_component, insert_rect};

use crate::error::ConstraintError;
use crate::geom::Rect;
use std::collections::{BTreeSet, HashMap};

/// Any spatial constraint.
#[derive(Debug, Clone)]
pub enum Constraint {
    Const(bool),
    Expr(Expr),
    Size(SizeConstraint),
    Location(LocationConstraint),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Xor(Box<Constraint>, Box<Constraint>),
    Not(Box<Constraint>),
    /// An injected evaluator backend.
    External(Box<dyn ExprEvaluator>),
}

impl Constraint {
    /// Parse a textual constraint.
    pub fn parse(text: &str) -> Result<Self, ConstraintError> {
        Ok(Constraint::Expr(parse_expr(text)?))
    }

    pub fn and(self, other: Constraint) -> Constraint {
        match (self, other) {
            (Constraint::Const(true), c) | (c, Constraint::Const(true)) => c,
            (Constraint::And(mut items), Constraint::And(more)) => {
                items.extend(more);
                Constraint::And(items)
            }
            (Constraint::And(mut items), c) => {
                items.push(c);
                Constraint::And(items)
            }
            (a, b) => Constraint::And(vec![a, b]),
        }
    }

    pub fn or(self, other: Constraint) -> Constraint {
        match (self, other) {
            (Constraint::Or(mut items), c) => {
                items.push(c);
                Constraint::Or(items)
            }
            (a, b) => Constraint::Or(vec![a, b]),
        }
    }

    pub fn xor(self, other: Constraint) -> Constraint {
        Constraint::Xor(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Constraint {
        Constraint::Not(Box::new(self))
    }

    /// Conjunction of many constraints (`true` when empty).
    pub fn all(items: impl IntoIterator<Item = Constraint>) -> Constraint {
        items.into_iter().fold(Constraint::Const(true), Constraint::and)
    }

    /// Rename `this → component` and `parent → this`, binding a component's
    /// own constraints into its parent's namespace.
    pub fn bound_as(&self, component: &str) -> Constraint {
        let mut bound = self.clone();
        let mapping = HashMap::from([(THIS.to_string(), component.to_string()), (PARENT.to_string(), THIS.to_string())]);
        bound.replace_components(&mapping);
        bound
    }

    fn values_for(&self, boxes: &HashMap<String, Rect>) -> VarValues {
        let mut values = VarValues::new();
        for var in self.referenced_variables() {
            if let Some(rect) = boxes.get(&var.component) {
                values.insert(var.clone(), var.attr.of(rect));
            }
        }
        values
    }

    /// Resolve component boxes to attribute values, then evaluate strictly.
    pub fn eval_with_components(&self, boxes: &HashMap<String, Rect>) -> Result<bool, ConstraintError> {
        self.eval(&self.values_for(boxes))
    }

    /// Like [`eval_with_components`](Self::eval_with_components) but unknown
    /// components yield `None` instead of an error.
    pub fn eval_with_components_partial(&self, boxes: &HashMap<String, Rect>) -> Option<bool> {
        self.eval_partial(&self.values_for(boxes))
    }

    /// Location constraints reachable through conjunctions.
    pub fn locations(&self) -> Vec<&LocationConstraint> {
        match self {
            Constraint::Location(l) => vec![l],
            Constraint::And(items) => items.iter().flat_map(|c| c.locations()).collect(),
            _ => Vec::new(),
        }
    }

    /// Size constraints reachable through conjunctions.
    pub fn sizes(&self) -> Vec<&SizeConstraint> {
        match self {
            Constraint::Size(s) => vec![s],
            Constraint::And(items) => items.iter().flat_map(|c| c.sizes()).collect(),
            _ => Vec::new(),
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Constraint> {
        match self {
            Constraint::And(items) | Constraint::Or(items) => items.iter_mut().collect(),
            Constraint::Xor(a, b) => vec![a.as_mut(), b.as_mut()],
            Constraint::Not(a) => vec![a.as_mut()],
            _ => Vec::new(),
        }
    }
}

impl ExprEvaluator for Constraint {
    fn describe(&self) -> String {
        match self {
            Constraint::Const(b) => format!("constant {b}"),
            Constraint::Expr(e) => e.describe(),
            Constraint::Size(s) => s.describe(),
            Constraint::Location(l) => l.describe(),
            Constraint::External(e) => e.describe(),
            Constraint::And(_) => "conjunction".to_string(),
            Constraint::Or(_) => "disjunction".to_string(),
            Constraint::Xor(..) => "exclusive disjunction".to_string(),
            Constraint::Not(_) => "negation".to_string(),
        }
    }

    fn referenced_variables(&self) -> BTreeSet<Var> {
        match self {
            Constraint::Const(_) => BTreeSet::new(),
            Constraint::Expr(e) => e.referenced_variables(),
            Constraint::Size(s) => s.referenced_variables(),
            Constraint::Location(l) => l.referenced_variables(),
            Constraint::External(e) => e.referenced_variables(),
            Constraint::And(items) | Constraint::Or(items) => {
                items.iter().flat_map(|c| c.referenced_variables()).collect()
            }
            Constraint::Xor(a, b) => a.referenced_variables().into_iter().chain(b.referenced_variables()).collect(),
            Constraint::Not(a) => a.referenced_variables(),
        }
    }

    fn eval_partial(&self, values: &VarValues) -> Option<bool> {
        match self {
            Constraint::Const(b) => Some(*b),
            Constraint::Expr(e) => e.eval_partial(values),
            Constraint::Size(s) => s.eval_partial(values),
            Constraint::Location(l) => l.eval_partial(values),
            Constraint::External(e) => e.eval_partial(values),
            Constraint::And(items) => expr::all3(items.iter().map(|c| c.eval_partial(values))),
            Constraint::Or(items) => expr::any3(items.iter().map(|c| c.eval_partial(values))),
            Constraint::Xor(a, b) => Some(a.eval_partial(values)? ^ b.eval_partial(values)?),
            Constraint::Not(a) => a.eval_partial(values).map(|b| !b),
        }
    }

    fn replace_vars(&mut self, mapping: &HashMap<Var, Var>) {
        match self {
            Constraint::Const(_) => {}
            Constraint::Expr(e) => e.replace_vars(mapping),
            Constraint::Size(s) => s.replace_vars(mapping),
            Constraint::Location(l) => l.replace_vars(mapping),
            Constraint::External(e) => e.replace_vars(mapping),
            _ => self.children_mut().into_iter().for_each(|c| c.replace_vars(mapping)),
        }
    }

    fn replace_components(&mut self, mapping: &HashMap<String, String>) {
        match self {
            Constraint::Const(_) => {}
            Constraint::Expr(e) => e.replace_components(mapping),
            Constraint::Size(s) => s.replace_components(mapping),
            Constraint::Location(l) => l.replace_components(mapping),
            Constraint::External(e) => e.replace_components(mapping),
            _ => self.children_mut().into_iter().for_each(|c| c.replace_components(mapping)),
        }
    }

    fn box_clone(&self) -> Box<dyn ExprEvaluator> {
        Box::new(self.clone())
    }
}

impl From<Expr> for Constraint {
    fn from(e: Expr) -> Self {
        Constraint::Expr(e)
    }
}

impl From<SizeConstraint> for Constraint {
    fn from(s: SizeConstraint) -> Self {
        Constraint::Size(s)
    }
}

impl From<LocationConstraint> for Constraint {
    fn from(l: LocationConstraint) -> Self {
        Constraint::Location(l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Evaluator that only knows whether a component is wider than it is tall.
    #[derive(Debug, Clone)]
    struct Landscape {
        component: String,
    }

    impl ExprEvaluator for Landscape {
        fn describe(&self) -> String {
            "landscape".to_string()
        }

        fn referenced_variables(&self) -> BTreeSet<Var> {
            BTreeSet::from([Var::new(self.component.clone(), Attr::Width), Var::new(self.component.clone(), Attr::Height)])
        }

        fn eval_partial(&self, values: &VarValues) -> Option<bool> {
            let w = values.get(&Var::new(self.component.clone(), Attr::Width))?;
            let h = values.get(&Var::new(self.component.clone(), Attr::Height))?;
            Some(w > h)
        }

        fn replace_vars(&mut self, _mapping: &HashMap<Var, Var>) {}

        fn replace_components(&mut self, mapping: &HashMap<String, String>) {
            if let Some(target) = mapping.get(&self.component) {
                self.component = target.clone();
            }
        }

        fn box_clone(&self) -> Box<dyn ExprEvaluator> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn composes_incrementally_and_binds_components() {
        let letters = Constraint::from(LocationConstraint::outside("top", true).unwrap());
        let field = Constraint::from(SizeConstraint::parse("8x8").unwrap());
        let parent = Constraint::all([letters.bound_as("letters"), field.bound_as("field")]);

        let mut boxes = HashMap::new();
        boxes.insert("letters".to_string(), Rect::new(1, 0, 8, 1));
        assert_eq!(parent.eval_with_components_partial(&boxes), None);
        assert!(parent.eval_with_components(&boxes).is_err());

        boxes.insert("field".to_string(), Rect::new(1, 1, 8, 8));
        boxes.insert(String::new(), Rect::new(1, 1, 8, 8));
        assert_eq!(parent.eval_with_components(&boxes), Ok(true));

        boxes.insert("field".to_string(), Rect::new(1, 1, 7, 8));
        assert_eq!(parent.eval_with_components(&boxes), Ok(false));
    }

    #[test]
    fn external_evaluators_participate() {
        let c = Constraint::External(Box::new(Landscape { component: THIS.to_string() }))
            .and(Constraint::parse("w <= 10").unwrap())
            .bound_as("row");
        let boxes = HashMap::from([("row".to_string(), Rect::new(0, 0, 8, 1))]);
        assert_eq!(c.eval_with_components(&boxes), Ok(true));
        let boxes = HashMap::from([("row".to_string(), Rect::new(0, 0, 1, 8))]);
        assert_eq!(c.eval_with_components(&boxes), Ok(false));
        assert_eq!(c.clone().not().eval_with_components(&boxes), Ok(true));
    }

    #[test]
    fn boolean_algebra() {
        let t = Constraint::Const(true);
        let f = Constraint::Const(false);
        let empty = VarValues::new();
        assert_eq!(t.clone().xor(f.clone()).eval(&empty), Ok(true));
        assert_eq!(f.clone().or(f.clone()).eval(&empty), Ok(false));
        assert_eq!(t.and(f).eval(&empty), Ok(false));
    }
}
