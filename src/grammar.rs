//! Grammar model: patterns, components and the validated dependency graph.
//!
//! A [`Grammar`] is built once and never changes. Construction checks that
//! every reference resolves and that neither `extends` nor component
//! dependencies form a cycle, then precomputes the matching waves:
//!
//! ```text
//! wave 0: cell patterns            (no dependencies)
//! wave 1: arrays over cells
//! wave 2: structures over arrays
//! ...
//! ```
//!
//! Depending on a pattern also means depending on every pattern that extends
//! it, since their matches are registered under the extended name too.

#[path = "grammar/loader.rs"]
mod loader;
#[path = "grammar/pattern.rs"]
mod pattern;

pub use pattern::{ArrayDirection, ArraySpec, Pattern, PatternComponent, PatternKind, Role};

use crate::api::Options;
use crate::error::GrammarError;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct Grammar {
    patterns: BTreeMap<String, Pattern>,
    root: String,
    cell_types: BTreeMap<String, Vec<String>>,
    options: Options,
    /// Pattern → every pattern it extends, transitively.
    ancestors: HashMap<String, Vec<String>>,
    waves: Vec<Vec<String>>,
}

impl Grammar {
    pub fn new(
        root: impl Into<String>,
        patterns: Vec<Pattern>,
        cell_types: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, GrammarError> {
        let root = root.into();
        let mut by_name = BTreeMap::new();
        for pattern in patterns {
            if by_name.contains_key(&pattern.name) {
                return Err(GrammarError::DuplicatePattern(pattern.name));
            }
            by_name.insert(pattern.name.clone(), pattern);
        }
        if !by_name.contains_key(&root) {
            return Err(GrammarError::UnknownRoot(root));
        }
        for pattern in by_name.values() {
            validate_pattern(pattern, &by_name, &cell_types)?;
        }

        let ancestors = extends_closure(&by_name)?;
        let mut extending: HashMap<String, Vec<String>> = HashMap::new();
        for (name, parents) in &ancestors {
            for parent in parents {
                extending.entry(parent.clone()).or_default().push(name.clone());
            }
        }
        for list in extending.values_mut() {
            list.sort();
        }

        let waves = compute_waves(&root, &by_name, &extending)?;
        tracing::debug!(patterns = by_name.len(), waves = waves.len(), root = %root, "grammar validated");

        Ok(Grammar { patterns: by_name, root, cell_types, options: Options::default(), ancestors, waves })
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn root(&self) -> &Pattern {
        &self.patterns[&self.root]
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    pub fn cell_types(&self) -> &BTreeMap<String, Vec<String>> {
        &self.cell_types
    }

    /// Patterns reachable from the root, grouped so each wave only depends on
    /// earlier ones.
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    /// Every pattern `name` extends, transitively.
    pub fn ancestors(&self, name: &str) -> &[String] {
        self.ancestors.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

fn validate_pattern(
    pattern: &Pattern,
    patterns: &BTreeMap<String, Pattern>,
    cell_types: &BTreeMap<String, Vec<String>>,
) -> Result<(), GrammarError> {
    let unknown = |target: &str| GrammarError::UnknownPattern { referrer: pattern.name.clone(), pattern: target.to_string() };

    for target in pattern.dependencies().into_iter().chain(pattern.extends.iter().map(String::as_str)) {
        if !patterns.contains_key(target) {
            return Err(unknown(target));
        }
    }

    match &pattern.kind {
        PatternKind::Cell { content_type } if !cell_types.contains_key(content_type) => {
            return Err(GrammarError::UndeclaredCellType {
                pattern: pattern.name.clone(),
                cell_type: content_type.clone(),
            });
        }
        PatternKind::Structure | PatternKind::Area => {
            if !pattern.components.iter().any(|c| c.role == Role::Inner) {
                return Err(GrammarError::NoInnerComponents(pattern.name.clone()));
            }
            let mut seen = BTreeSet::new();
            for component in &pattern.components {
                if !seen.insert(component.name.as_str()) {
                    return Err(GrammarError::Invalid {
                        pattern: pattern.name.clone(),
                        reason: format!("duplicate component '{}'", component.name),
                    });
                }
                if component.count.stop().is_some_and(|max| max < 1) {
                    return Err(GrammarError::InvalidComponentCount {
                        pattern: pattern.name.clone(),
                        component: component.name.clone(),
                        count: component.count.to_string(),
                    });
                }
                if !(component.weight.is_finite() && component.weight >= 0.0) {
                    return Err(GrammarError::Invalid {
                        pattern: pattern.name.clone(),
                        reason: format!("component '{}' has invalid weight {}", component.name, component.weight),
                    });
                }
            }
        }
        PatternKind::Array(spec) | PatternKind::ArrayInContext(spec)
            if spec.item_count.stop().is_some_and(|max| max < 1) =>
        {
            return Err(GrammarError::Invalid {
                pattern: pattern.name.clone(),
                reason: format!("item_count {} admits no items", spec.item_count),
            });
        }
        _ => {}
    }
    Ok(())
}

/// Transitive `extends` closure; a cycle is a hard error.
fn extends_closure(patterns: &BTreeMap<String, Pattern>) -> Result<HashMap<String, Vec<String>>, GrammarError> {
    let mut closure: HashMap<String, Vec<String>> = HashMap::new();
    for name in patterns.keys() {
        let mut found: Vec<String> = Vec::new();
        let mut stack: Vec<&str> = patterns[name].extends.iter().map(String::as_str).collect();
        while let Some(parent) = stack.pop() {
            if parent == name {
                return Err(GrammarError::Cycle(format!("{name} extends itself")));
            }
            if found.iter().any(|f| f == parent) {
                continue;
            }
            found.push(parent.to_string());
            stack.extend(patterns[parent].extends.iter().map(String::as_str));
        }
        found.sort();
        closure.insert(name.clone(), found);
    }
    Ok(closure)
}

/// Kahn's algorithm over the patterns reachable from `root`.
fn compute_waves(
    root: &str,
    patterns: &BTreeMap<String, Pattern>,
    extending: &HashMap<String, Vec<String>>,
) -> Result<Vec<Vec<String>>, GrammarError> {
    let expanded = |name: &str| -> Vec<String> {
        std::iter::once(name.to_string()).chain(extending.get(name).into_iter().flatten().cloned()).collect()
    };

    let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut queue = VecDeque::from(expanded(root));
    while let Some(name) = queue.pop_front() {
        if deps.contains_key(&name) {
            continue;
        }
        let pattern_deps: BTreeSet<String> =
            patterns[&name].dependencies().into_iter().flat_map(|d| expanded(d)).collect();
        queue.extend(pattern_deps.iter().cloned());
        deps.insert(name, pattern_deps);
    }

    let mut waves = Vec::new();
    let mut done: BTreeSet<String> = BTreeSet::new();
    while done.len() < deps.len() {
        let wave: Vec<String> = deps
            .iter()
            .filter(|(name, d)| !done.contains(*name) && d.iter().all(|dep| done.contains(dep)))
            .map(|(name, _)| name.clone())
            .collect();
        if wave.is_empty() {
            let stuck: Vec<&str> = deps.keys().filter(|n| !done.contains(*n)).map(String::as_str).collect();
            return Err(GrammarError::Cycle(stuck.join(", ")));
        }
        done.extend(wave.iter().cloned());
        waves.push(wave);
    }
    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::OpenRange;

    fn cell_types() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([("digit".to_string(), vec!["[0-9]".to_string()])])
    }

    fn digits() -> Pattern {
        Pattern::array("digits", ArraySpec::new("digit", ArrayDirection::Row))
    }

    #[test]
    fn waves_respect_dependencies_and_extension() {
        let grammar = Grammar::new(
            "doc",
            vec![
                Pattern::cell("digit", "digit"),
                Pattern::cell("small", "digit").extending("digit"),
                digits(),
                Pattern::structure("doc", vec![PatternComponent::new("row", "digits")]),
                Pattern::cell("unused", "digit"),
            ],
            cell_types(),
        )
        .unwrap();

        assert_eq!(
            grammar.waves(),
            &[vec!["digit".to_string(), "small".to_string()], vec!["digits".to_string()], vec!["doc".to_string()]]
        );
        assert_eq!(grammar.ancestors("small"), &["digit".to_string()]);
        assert!(grammar.ancestors("digit").is_empty());
        assert_eq!(grammar.root().name, "doc");
    }

    #[test]
    fn rejects_cycles() {
        let looped = Grammar::new(
            "a",
            vec![
                Pattern::structure("a", vec![PatternComponent::new("x", "b")]),
                Pattern::structure("b", vec![PatternComponent::new("y", "a")]),
            ],
            cell_types(),
        );
        assert!(matches!(looped, Err(GrammarError::Cycle(_))));

        let self_extending = Grammar::new(
            "a",
            vec![Pattern::cell("a", "digit").extending("b"), Pattern::cell("b", "digit").extending("a")],
            cell_types(),
        );
        assert!(matches!(self_extending, Err(GrammarError::Cycle(_))));
    }

    #[test]
    fn rejects_bad_references() {
        let err = Grammar::new("digits", vec![digits()], cell_types()).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownPattern { ref pattern, .. } if pattern == "digit"));

        let err = Grammar::new("c", vec![Pattern::cell("c", "letter")], cell_types()).unwrap_err();
        assert!(matches!(err, GrammarError::UndeclaredCellType { .. }));

        let err = Grammar::new("missing", vec![Pattern::cell("c", "digit")], cell_types()).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownRoot(_)));

        let mut never = PatternComponent::new("x", "c");
        never.count = OpenRange::exact(0);
        let err = Grammar::new("s", vec![Pattern::cell("c", "digit"), Pattern::structure("s", vec![never])], cell_types())
            .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidComponentCount { .. }));

        let mut repeated = PatternComponent::new("x", "c");
        repeated.count = OpenRange::between(1, 3);
        assert!(Grammar::new("s", vec![Pattern::cell("c", "digit"), Pattern::structure("s", vec![repeated])], cell_types()).is_ok());

        let err = Grammar::new(
            "s",
            vec![Pattern::cell("c", "digit"), Pattern::structure("s", vec![PatternComponent::new("x", "c").outer()])],
            cell_types(),
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::NoInnerComponents(_)));
    }
}
