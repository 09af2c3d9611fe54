//! YAML grammar files.
//!
//! ```yaml
//! cell_types:
//!   letter: ['[A-H]']
//! root: document
//! options:
//!   cutoff_ratio: 0.8
//! patterns:
//!   letters:
//!     kind: array
//!     item: { kind: cell, content_type: letter }
//!     direction: row
//!     size: 8x1
//!   document:
//!     kind: general
//!     count: 1
//!     inner:
//!       letters: { pattern: letters, outside: top }
//!       field:   { pattern: field, weight: 2 }
//!     constraints:
//!       - field_left == letters_left
//! ```
//!
//! Mappings keep their declaration order, which is the order components are
//! matched in. Inline definitions (`item: {...}`, `pattern_definition`) are
//! registered as `<parent>.<component>`.

use super::pattern::{ArrayDirection, ArraySpec, Pattern, PatternComponent, PatternKind};
use super::Grammar;
use crate::api::Options;
use crate::constraints::{Constraint, LocationConstraint, SizeConstraint};
use crate::error::GrammarError;
use crate::geom::OpenRange;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct GrammarFile {
    #[serde(default)]
    cell_types: BTreeMap<String, OneOrMany>,
    root: String,
    #[serde(default)]
    options: Options,
    patterns: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// `3`, `"3+"`, `"0..1"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RangeValue {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LocationValue {
    Inside(String),
    Detailed {
        #[serde(default)]
        inside: Option<String>,
        #[serde(default)]
        outside: Option<String>,
        #[serde(default = "implicit_sides")]
        implicit_sides: bool,
    },
}

fn implicit_sides() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ItemValue {
    Name(String),
    Inline(Box<PatternDef>),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PatternDef {
    kind: Option<String>,
    extends: Option<OneOrMany>,
    count: Option<RangeValue>,
    size: Option<String>,
    inside: Option<String>,
    outside: Option<String>,
    location: Option<LocationValue>,
    #[serde(default)]
    constraints: Vec<String>,
    content_type: Option<String>,
    item: Option<ItemValue>,
    direction: Option<String>,
    gap: Option<RangeValue>,
    item_count: Option<RangeValue>,
    #[serde(default)]
    allow_breakdown: bool,
    #[serde(default)]
    inner: serde_yaml::Mapping,
    #[serde(default)]
    outer: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ComponentDef {
    pattern: Option<String>,
    pattern_definition: Option<Box<PatternDef>>,
    count: Option<RangeValue>,
    weight: Option<f64>,
    size: Option<String>,
    inside: Option<String>,
    outside: Option<String>,
    location: Option<LocationValue>,
    #[serde(default)]
    constraints: Vec<String>,
}

impl Grammar {
    /// Parse and validate a YAML grammar. `options:` in the file become the
    /// grammar's default [`Options`].
    pub fn from_yaml_str(text: &str) -> Result<Grammar, GrammarError> {
        let file: GrammarFile = serde_yaml::from_str(text)?;
        let mut loader = Loader::default();
        for (name, def) in entries::<PatternDef>(&file.patterns, "patterns")? {
            loader.add(&name, def)?;
        }
        let cell_types = file.cell_types.into_iter().map(|(k, v)| (k, v.into_vec())).collect();
        Ok(Grammar::new(file.root, loader.patterns, cell_types)?.with_options(file.options))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

/// Ordered `(name, value)` pairs of a YAML mapping.
fn entries<T: for<'de> Deserialize<'de>>(
    mapping: &serde_yaml::Mapping,
    context: &str,
) -> Result<Vec<(String, T)>, GrammarError> {
    mapping
        .iter()
        .map(|(key, value)| {
            let name = key.as_str().ok_or_else(|| GrammarError::Invalid {
                pattern: context.to_string(),
                reason: format!("non-string key {key:?}"),
            })?;
            Ok((name.to_string(), serde_yaml::from_value(value.clone())?))
        })
        .collect()
}

#[derive(Default)]
struct Loader {
    patterns: Vec<Pattern>,
}

impl Loader {
    /// Convert one definition (and its inline children). Returns `false` when
    /// the pattern was skipped for an unknown kind.
    fn add(&mut self, name: &str, def: PatternDef) -> Result<bool, GrammarError> {
        let range_err = |source| GrammarError::Range { pattern: name.to_string(), source };
        let constraint_err = |source| GrammarError::Constraint { pattern: name.to_string(), source };

        let kind_name = match def.kind.as_deref() {
            Some(kind) => kind.to_ascii_lowercase(),
            None if def.content_type.is_some() => "cell".to_string(),
            None if def.item.is_some() => "array".to_string(),
            None if !def.inner.is_empty() => "general".to_string(),
            None => {
                return Err(GrammarError::Invalid { pattern: name.to_string(), reason: "missing `kind`".to_string() });
            }
        };

        let kind = match kind_name.as_str() {
            "cell" | "terminal" => {
                let content_type = def.content_type.clone().ok_or_else(|| GrammarError::Invalid {
                    pattern: name.to_string(),
                    reason: "cell patterns need a `content_type`".to_string(),
                })?;
                PatternKind::Cell { content_type }
            }
            "general" | "structure" | "nonterminal" => PatternKind::Structure,
            "area" => PatternKind::Area,
            "array" | "array-in-context" => {
                let item = match def.item.clone() {
                    Some(ItemValue::Name(item)) => item,
                    Some(ItemValue::Inline(inline)) => {
                        let item = format!("{name}.item");
                        self.add(&item, *inline)?;
                        item
                    }
                    None => {
                        return Err(GrammarError::Invalid {
                            pattern: name.to_string(),
                            reason: "array patterns need an `item`".to_string(),
                        });
                    }
                };
                let direction = match def.direction.as_deref() {
                    Some(d) => d.parse::<ArrayDirection>().map_err(|reason| GrammarError::Invalid {
                        pattern: name.to_string(),
                        reason,
                    })?,
                    None => ArrayDirection::Auto,
                };
                let mut spec = ArraySpec::new(item, direction);
                if let Some(gap) = &def.gap {
                    spec.gap = parse_range(gap).map_err(range_err)?;
                }
                if let Some(count) = &def.item_count {
                    spec.item_count = parse_range(count).map_err(range_err)?;
                }
                spec.allow_breakdown = def.allow_breakdown;
                if kind_name == "array" { PatternKind::Array(spec) } else { PatternKind::ArrayInContext(spec) }
            }
            other => {
                tracing::warn!(pattern = name, kind = other, "skipping pattern of unknown kind");
                return Ok(false);
            }
        };

        let mut pattern = Pattern {
            name: name.to_string(),
            kind,
            count_in_document: OpenRange::unbounded(),
            constraints: shorthand_constraints(
                def.size.as_deref(),
                def.inside.as_deref(),
                def.outside.as_deref(),
                def.location.as_ref(),
                &def.constraints,
            )
            .map_err(constraint_err)?,
            components: Vec::new(),
            extends: def.extends.clone().map(OneOrMany::into_vec).unwrap_or_default(),
        };
        if let Some(count) = &def.count {
            pattern.count_in_document = parse_range(count).map_err(range_err)?;
        }

        let sections = [(&def.inner, false), (&def.outer, true)];
        for (section, outer) in sections {
            for (component_name, component) in entries::<ComponentDef>(section, name)? {
                pattern.components.push(self.component(name, &component_name, component, outer)?);
            }
        }

        self.patterns.push(pattern);
        Ok(true)
    }

    fn component(
        &mut self,
        parent: &str,
        name: &str,
        def: ComponentDef,
        outer: bool,
    ) -> Result<PatternComponent, GrammarError> {
        let target = match (def.pattern, def.pattern_definition) {
            (Some(pattern), _) => pattern,
            (None, Some(inline)) => {
                let inline_name = format!("{parent}.{name}");
                self.add(&inline_name, *inline)?;
                inline_name
            }
            (None, None) => {
                return Err(GrammarError::MissingComponentPattern {
                    pattern: parent.to_string(),
                    component: name.to_string(),
                });
            }
        };

        let mut component = PatternComponent::new(name, target);
        if outer {
            component = component.outer();
        }
        if let Some(count) = &def.count {
            component.count =
                parse_range(count).map_err(|source| GrammarError::Range { pattern: parent.to_string(), source })?;
        }
        if let Some(weight) = def.weight {
            component.weight = weight;
        }
        component.constraints = shorthand_constraints(
            def.size.as_deref(),
            def.inside.as_deref(),
            def.outside.as_deref(),
            def.location.as_ref(),
            &def.constraints,
        )
        .map_err(|source| GrammarError::Constraint { pattern: parent.to_string(), source })?;
        Ok(component)
    }
}

fn parse_range(value: &RangeValue) -> Result<OpenRange, crate::error::RangeError> {
    match value {
        RangeValue::Int(n) => Ok(OpenRange::exact(*n)),
        RangeValue::Text(text) => text.parse(),
    }
}

fn shorthand_constraints(
    size: Option<&str>,
    inside: Option<&str>,
    outside: Option<&str>,
    location: Option<&LocationValue>,
    expressions: &[String],
) -> Result<Vec<Constraint>, crate::error::ConstraintError> {
    let mut constraints = Vec::new();
    if let Some(size) = size {
        constraints.push(SizeConstraint::parse(size)?.into());
    }
    match location {
        Some(LocationValue::Inside(sides)) => constraints.push(LocationConstraint::inside(sides, true)?.into()),
        Some(LocationValue::Detailed { inside, outside, implicit_sides }) => {
            constraints.push(LocationConstraint::new(inside.as_deref(), outside.as_deref(), *implicit_sides)?.into());
        }
        None => {}
    }
    if inside.is_some() || outside.is_some() {
        constraints.push(LocationConstraint::new(inside, outside, true)?.into());
    }
    for expression in expressions {
        constraints.push(Constraint::parse(expression)?);
    }
    Ok(constraints)
}
