//! Boolean expressions over named integer variables.
//!
//! [`ExprEvaluator`] is the contract every constraint backend satisfies; [`Expr`]
//! is the built-in backend: a small arithmetic/comparison tree that can be
//! parsed from strings (see `parse.rs`).
//!
//! Evaluation comes in two flavours:
//!
//! - `eval` is strict: every referenced variable must be present, otherwise a
//!   [`ConstraintError::MissingVariable`] names the evaluator and the variable.
//! - `eval_partial` is three-valued: `None` means "unknown yet". Matchers use it
//!   while a parent match is still being assembled; only `Some(false)` rejects.

use super::var::{Var, VarValues};
use crate::error::ConstraintError;
use crate::geom::OpenRange;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Contract for a spatial boolean expression.
pub trait ExprEvaluator: fmt::Debug + Send + Sync {
    /// Human-readable description used in error messages.
    fn describe(&self) -> String;

    /// Every `(component, attr)` the expression reads.
    fn referenced_variables(&self) -> BTreeSet<Var>;

    /// Three-valued evaluation; `None` when the outcome depends on missing variables.
    fn eval_partial(&self, values: &VarValues) -> Option<bool>;

    /// Rename variables in place.
    fn replace_vars(&mut self, mapping: &HashMap<Var, Var>);

    /// Rename components in place (simultaneous substitution).
    fn replace_components(&mut self, mapping: &HashMap<String, String>);

    fn box_clone(&self) -> Box<dyn ExprEvaluator>;

    /// Strict evaluation.
    fn eval(&self, values: &VarValues) -> Result<bool, ConstraintError> {
        if let Some(missing) = self.referenced_variables().into_iter().find(|v| !values.contains_key(v)) {
            return Err(ConstraintError::MissingVariable { evaluator: self.describe(), variable: missing.to_string() });
        }
        self.eval_partial(values).ok_or_else(|| ConstraintError::MissingVariable {
            evaluator: self.describe(),
            variable: "<unknown>".to_string(),
        })
    }
}

impl Clone for Box<dyn ExprEvaluator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Rename a single variable according to a component mapping.
pub(crate) fn rename_var(var: &mut Var, mapping: &HashMap<String, String>) {
    if let Some(target) = mapping.get(&var.component) {
        var.component = target.clone();
    }
}

/// Kleene conjunction.
pub(crate) fn all3(values: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for v in values {
        match v {
            Some(false) => return Some(false),
            None => unknown = true,
            Some(true) => {}
        }
    }
    if unknown { None } else { Some(true) }
}

/// Kleene disjunction.
pub(crate) fn any3(values: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for v in values {
        match v {
            Some(true) => return Some(true),
            None => unknown = true,
            Some(false) => {}
        }
    }
    if unknown { None } else { Some(false) }
}

/// Integer arithmetic over variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arith {
    Const(i64),
    Var(Var),
    Add(Box<Arith>, Box<Arith>),
    Sub(Box<Arith>, Box<Arith>),
    Mul(Box<Arith>, Box<Arith>),
    Neg(Box<Arith>),
}

impl Arith {
    pub fn var(var: Var) -> Self {
        Arith::Var(var)
    }

    pub fn value(&self, values: &VarValues) -> Option<i64> {
        match self {
            Arith::Const(c) => Some(*c),
            Arith::Var(v) => values.get(v).copied(),
            Arith::Add(a, b) => Some(a.value(values)? + b.value(values)?),
            Arith::Sub(a, b) => Some(a.value(values)? - b.value(values)?),
            Arith::Mul(a, b) => Some(a.value(values)? * b.value(values)?),
            Arith::Neg(a) => Some(-a.value(values)?),
        }
    }

    fn collect_vars(&self, out: &mut BTreeSet<Var>) {
        match self {
            Arith::Const(_) => {}
            Arith::Var(v) => {
                out.insert(v.clone());
            }
            Arith::Add(a, b) | Arith::Sub(a, b) | Arith::Mul(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Arith::Neg(a) => a.collect_vars(out),
        }
    }

    fn visit_vars(&mut self, f: &mut impl FnMut(&mut Var)) {
        match self {
            Arith::Const(_) => {}
            Arith::Var(v) => f(v),
            Arith::Add(a, b) | Arith::Sub(a, b) | Arith::Mul(a, b) => {
                a.visit_vars(f);
                b.visit_vars(f);
            }
            Arith::Neg(a) => a.visit_vars(f),
        }
    }
}

impl fmt::Display for Arith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arith::Const(c) => write!(f, "{c}"),
            Arith::Var(v) => write!(f, "{v}"),
            Arith::Add(a, b) => write!(f, "({a} + {b})"),
            Arith::Sub(a, b) => write!(f, "({a} - {b})"),
            Arith::Mul(a, b) => write!(f, "{a} * {b}"),
            Arith::Neg(a) => write!(f, "-{a}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CmpOp {
    fn apply(self, a: i64, b: i64) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Ge => a >= b,
            CmpOp::Gt => a > b,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
        }
    }
}

/// Built-in boolean expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(bool),
    Cmp(Arith, CmpOp, Arith),
    /// `value ∈ range`
    In(Arith, OpenRange),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Xor(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn cmp(lhs: Arith, op: CmpOp, rhs: Arith) -> Self {
        Expr::Cmp(lhs, op, rhs)
    }

    pub fn within(value: Arith, range: OpenRange) -> Self {
        Expr::In(value, range)
    }

    fn visit_vars(&mut self, f: &mut impl FnMut(&mut Var)) {
        match self {
            Expr::Const(_) => {}
            Expr::Cmp(a, _, b) => {
                a.visit_vars(f);
                b.visit_vars(f);
            }
            Expr::In(a, _) => a.visit_vars(f),
            Expr::And(items) | Expr::Or(items) => items.iter_mut().for_each(|e| e.visit_vars(f)),
            Expr::Xor(a, b) => {
                a.visit_vars(f);
                b.visit_vars(f);
            }
            Expr::Not(a) => a.visit_vars(f),
        }
    }

    fn collect_vars(&self, out: &mut BTreeSet<Var>) {
        match self {
            Expr::Const(_) => {}
            Expr::Cmp(a, _, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Expr::In(a, _) => a.collect_vars(out),
            Expr::And(items) | Expr::Or(items) => items.iter().for_each(|e| e.collect_vars(out)),
            Expr::Xor(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Expr::Not(a) => a.collect_vars(out),
        }
    }
}

impl ExprEvaluator for Expr {
    fn describe(&self) -> String {
        format!("expression `{self}`")
    }

    fn referenced_variables(&self) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn eval_partial(&self, values: &VarValues) -> Option<bool> {
        match self {
            Expr::Const(b) => Some(*b),
            Expr::Cmp(a, op, b) => Some(op.apply(a.value(values)?, b.value(values)?)),
            Expr::In(a, range) => Some(range.contains(a.value(values)?)),
            Expr::And(items) => all3(items.iter().map(|e| e.eval_partial(values))),
            Expr::Or(items) => any3(items.iter().map(|e| e.eval_partial(values))),
            Expr::Xor(a, b) => Some(a.eval_partial(values)? ^ b.eval_partial(values)?),
            Expr::Not(a) => a.eval_partial(values).map(|b| !b),
        }
    }

    fn replace_vars(&mut self, mapping: &HashMap<Var, Var>) {
        self.visit_vars(&mut |v| {
            if let Some(target) = mapping.get(v) {
                *v = target.clone();
            }
        });
    }

    fn replace_components(&mut self, mapping: &HashMap<String, String>) {
        self.visit_vars(&mut |v| rename_var(v, mapping));
    }

    fn box_clone(&self) -> Box<dyn ExprEvaluator> {
        Box::new(self.clone())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str| -> fmt::Result {
            f.write_str("(")?;
            for (i, e) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{e}")?;
            }
            f.write_str(")")
        };
        match self {
            Expr::Const(b) => write!(f, "{b}"),
            Expr::Cmp(a, op, b) => write!(f, "{a} {} {b}", op.symbol()),
            Expr::In(a, range) => write!(f, "{a} in [{range}]"),
            Expr::And(items) => join(f, items, "and"),
            Expr::Or(items) => join(f, items, "or"),
            Expr::Xor(a, b) => write!(f, "({a} xor {b})"),
            Expr::Not(a) => write!(f, "not {a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::var::Attr;

    fn values(pairs: &[(&str, i64)]) -> VarValues {
        pairs.iter().map(|(name, v)| (name.parse::<Var>().unwrap(), *v)).collect()
    }

    #[test]
    fn strict_eval_reports_missing_variable() {
        let e = Expr::cmp(Arith::var(Var::this(Attr::Left)), CmpOp::Le, Arith::var(Var::new("a", Attr::Right)));
        let err = e.eval(&values(&[("left", 1)])).unwrap_err();
        match err {
            ConstraintError::MissingVariable { variable, .. } => assert_eq!(variable, "a_right"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(e.eval(&values(&[("left", 1), ("a_right", 3)])), Ok(true));
    }

    #[test]
    fn partial_eval_is_three_valued() {
        let known_false = Expr::Const(false);
        let unknown = Expr::cmp(Arith::var(Var::this(Attr::Top)), CmpOp::Eq, Arith::Const(0));
        let empty = VarValues::new();
        assert_eq!(Expr::And(vec![known_false.clone(), unknown.clone()]).eval_partial(&empty), Some(false));
        assert_eq!(Expr::And(vec![Expr::Const(true), unknown.clone()]).eval_partial(&empty), None);
        assert_eq!(Expr::Or(vec![Expr::Const(true), unknown.clone()]).eval_partial(&empty), Some(true));
        assert_eq!(Expr::Not(Box::new(unknown)).eval_partial(&empty), None);
    }

    #[test]
    fn component_renaming_is_simultaneous() {
        let mut e = Expr::cmp(Arith::var(Var::this(Attr::Left)), CmpOp::Ge, Arith::var(Var::parent(Attr::Left)));
        let mapping = HashMap::from([("".to_string(), "letters".to_string()), ("_".to_string(), "".to_string())]);
        e.replace_components(&mapping);
        let vars: Vec<String> = e.referenced_variables().iter().map(|v| v.to_string()).collect();
        assert_eq!(vars, vec!["left".to_string(), "letters_left".to_string()]);
    }
}
