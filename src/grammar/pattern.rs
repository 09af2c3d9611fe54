use crate::constraints::{Constraint, ExprEvaluator, LocationConstraint, PARENT, SizeConstraint};
use crate::error::ConstraintError;
use crate::geom::OpenRange;
use std::fmt;
use std::str::FromStr;

/// Where a component sits relative to its parent's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Inside; contributes to the parent's box.
    Inner,
    /// Around; bound to the parent but not part of its box.
    Outer,
}

/// How array items line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrayDirection {
    #[default]
    Row,
    Column,
    /// Connected area of items.
    Fill,
    /// Row or column, whichever yields fewer clusters.
    Auto,
}

impl FromStr for ArrayDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "row" | "horizontal" | "right" => Ok(ArrayDirection::Row),
            "column" | "col" | "vertical" | "down" => Ok(ArrayDirection::Column),
            "fill" | "area" => Ok(ArrayDirection::Fill),
            "auto" => Ok(ArrayDirection::Auto),
            other => Err(format!("unknown array direction '{other}'")),
        }
    }
}

impl fmt::Display for ArrayDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArrayDirection::Row => "row",
            ArrayDirection::Column => "column",
            ArrayDirection::Fill => "fill",
            ArrayDirection::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Settings shared by both array kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySpec {
    /// Pattern of the repeated item.
    pub item: String,
    pub direction: ArrayDirection,
    /// Admissible directional gap between neighbouring items.
    pub gap: OpenRange,
    pub item_count: OpenRange,
    pub allow_breakdown: bool,
}

impl ArraySpec {
    pub fn new(item: impl Into<String>, direction: ArrayDirection) -> Self {
        ArraySpec {
            item: item.into(),
            direction,
            gap: OpenRange::exact(0),
            item_count: OpenRange::at_least(1),
            allow_breakdown: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    /// A single classified cell.
    Cell { content_type: String },
    /// Fixed structure of named components.
    Structure,
    Array(ArraySpec),
    /// Array whose excess members are trimmed against an enclosing region.
    ArrayInContext(ArraySpec),
    /// Structure whose components float within ranges.
    Area,
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Cell { .. } => "cell",
            PatternKind::Structure => "general",
            PatternKind::Array(_) => "array",
            PatternKind::ArrayInContext(_) => "array-in-context",
            PatternKind::Area => "area",
        }
    }

    pub fn array(&self) -> Option<&ArraySpec> {
        match self {
            PatternKind::Array(spec) | PatternKind::ArrayInContext(spec) => Some(spec),
            _ => None,
        }
    }
}

/// A named slot of a composite pattern.
///
/// `constraints` use the component's own namespace: `this` is the component,
/// `parent` the pattern that owns it.
#[derive(Debug, Clone)]
pub struct PatternComponent {
    pub name: String,
    pub pattern: String,
    pub role: Role,
    pub constraints: Vec<Constraint>,
    /// How many matches the component binds: `1` by default, `0..1` when
    /// optional, anything wider makes it repeated.
    pub count: OpenRange,
    pub weight: f64,
}

impl PatternComponent {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        PatternComponent {
            name: name.into(),
            pattern: pattern.into(),
            role: Role::Inner,
            constraints: Vec::new(),
            count: OpenRange::exact(1),
            weight: 1.0,
        }
    }

    pub fn outer(mut self) -> Self {
        self.role = Role::Outer;
        self
    }

    pub fn optional(mut self) -> Self {
        self.count = OpenRange::between(0, 1);
        self
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn inside(self, sides: &str) -> Result<Self, ConstraintError> {
        Ok(self.with_constraint(LocationConstraint::inside(sides, true)?))
    }

    pub fn outside(self, sides: &str) -> Result<Self, ConstraintError> {
        Ok(self.with_constraint(LocationConstraint::outside(sides, true)?))
    }

    pub fn is_optional(&self) -> bool {
        self.count.start().is_none_or(|min| min <= 0)
    }

    /// Binds more than one match.
    pub fn is_repeated(&self) -> bool {
        self.count.stop() != Some(1)
    }

    /// Upper bound on bound matches.
    pub fn max_count(&self) -> usize {
        self.count.stop().map_or(usize::MAX, |max| usize::try_from(max).unwrap_or(0))
    }

    /// Whether `n` bound matches satisfy the lower bound.
    pub fn admits_count(&self, n: usize) -> bool {
        self.count.start().is_none_or(|min| i64::try_from(n).is_ok_and(|n| n >= min))
    }

    pub fn locations(&self) -> impl Iterator<Item = &LocationConstraint> {
        self.constraints.iter().flat_map(|c| c.locations())
    }
}

/// A grammar production.
///
/// `constraints` are written from the pattern's own point of view. Those
/// mentioning `parent` only make sense once the pattern is bound as a
/// component; see [`Pattern::context_constraints`].
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    pub kind: PatternKind,
    pub count_in_document: OpenRange,
    pub constraints: Vec<Constraint>,
    pub components: Vec<PatternComponent>,
    pub extends: Vec<String>,
}

impl Pattern {
    fn with_kind(name: impl Into<String>, kind: PatternKind) -> Self {
        Pattern {
            name: name.into(),
            kind,
            count_in_document: OpenRange::unbounded(),
            constraints: Vec::new(),
            components: Vec::new(),
            extends: Vec::new(),
        }
    }

    pub fn cell(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::with_kind(name, PatternKind::Cell { content_type: content_type.into() })
    }

    pub fn structure(name: impl Into<String>, components: Vec<PatternComponent>) -> Self {
        Pattern { components, ..Self::with_kind(name, PatternKind::Structure) }
    }

    pub fn area(name: impl Into<String>, components: Vec<PatternComponent>) -> Self {
        Pattern { components, ..Self::with_kind(name, PatternKind::Area) }
    }

    pub fn array(name: impl Into<String>, spec: ArraySpec) -> Self {
        Self::with_kind(name, PatternKind::Array(spec))
    }

    pub fn array_in_context(name: impl Into<String>, spec: ArraySpec) -> Self {
        Self::with_kind(name, PatternKind::ArrayInContext(spec))
    }

    pub fn with_constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn with_count(mut self, count: OpenRange) -> Self {
        self.count_in_document = count;
        self
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    /// Patterns whose matches this pattern consumes.
    pub fn dependencies(&self) -> Vec<&str> {
        match &self.kind {
            PatternKind::Cell { .. } => Vec::new(),
            PatternKind::Array(spec) | PatternKind::ArrayInContext(spec) => vec![spec.item.as_str()],
            PatternKind::Structure | PatternKind::Area => self.components.iter().map(|c| c.pattern.as_str()).collect(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&PatternComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    fn mentions_parent(constraint: &Constraint) -> bool {
        constraint.referenced_variables().iter().any(|v| v.component == PARENT)
    }

    /// Constraints checkable on the pattern's own match.
    pub fn own_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| !Self::mentions_parent(c))
    }

    /// Constraints relative to whatever pattern embeds this one.
    pub fn context_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| Self::mentions_parent(c))
    }

    /// First size constraint on the pattern itself.
    pub fn size(&self) -> Option<&SizeConstraint> {
        self.own_constraints().flat_map(|c| c.sizes()).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_own_and_context_constraints() {
        let header = Pattern::cell("header", "word")
            .with_constraint(SizeConstraint::parse("1x1").unwrap())
            .with_constraint(LocationConstraint::outside("top", true).unwrap());
        assert_eq!(header.own_constraints().count(), 1);
        assert_eq!(header.context_constraints().count(), 1);
        assert_eq!(header.size().map(|s| s.min_size()), Some((1, 1)));
    }

    #[test]
    fn dependencies_follow_kind() {
        let row = Pattern::array("row", ArraySpec::new("digit", ArrayDirection::Row));
        assert_eq!(row.dependencies(), vec!["digit"]);
        let doc = Pattern::structure(
            "doc",
            vec![PatternComponent::new("a", "row"), PatternComponent::new("b", "col").optional().outer()],
        );
        assert_eq!(doc.dependencies(), vec!["row", "col"]);
        assert!(doc.component("b").is_some_and(|b| b.is_optional() && b.role == Role::Outer));
        assert_eq!(doc.kind.name(), "general");
        assert_eq!("vertical".parse::<ArrayDirection>(), Ok(ArrayDirection::Column));
        assert!("diagonal".parse::<ArrayDirection>().is_err());
    }

    #[test]
    fn component_counts() {
        let single = PatternComponent::new("a", "row");
        assert!(!single.is_repeated() && !single.is_optional());
        assert_eq!(single.max_count(), 1);

        let mut few = PatternComponent::new("a", "row");
        few.count = OpenRange::between(2, 3);
        assert!(few.is_repeated());
        assert_eq!(few.max_count(), 3);
        assert!(!few.admits_count(1) && few.admits_count(2));

        let mut many = PatternComponent::new("a", "row");
        many.count = OpenRange::at_least(0);
        assert!(many.is_repeated() && many.is_optional());
        assert_eq!(many.max_count(), usize::MAX);
    }
}
