//! Cell-content classification.
//!
//! The matcher only needs, per cell, a ranked list of `(content type,
//! confidence)` pairs. [`CellClassifier`] is that boundary; [`RegexClassifier`]
//! is the default implementation built from a grammar's `cell_types` table.

use crate::error::GrammarError;
use regex::Regex;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub content_type: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

pub trait CellClassifier: Send + Sync {
    /// Candidate types for `text`, best first. Unrecognized text yields nothing.
    fn classify(&self, text: &str) -> Vec<Classification>;
}

/// Confidence is the share of the (trimmed) text covered by the longest
/// regex hit, so a full match scores `1.0`.
#[derive(Debug, Clone, Default)]
pub struct RegexClassifier {
    types: Vec<(String, Vec<Regex>)>,
}

impl RegexClassifier {
    pub fn new(table: &BTreeMap<String, Vec<String>>) -> Result<Self, GrammarError> {
        let mut types = Vec::with_capacity(table.len());
        for (name, patterns) in table {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).map_err(|source| GrammarError::InvalidRegex { cell_type: name.clone(), source }))
                .collect::<Result<Vec<_>, _>>()?;
            types.push((name.clone(), compiled));
        }
        Ok(RegexClassifier { types })
    }

    pub fn declares(&self, content_type: &str) -> bool {
        self.types.iter().any(|(name, _)| name == content_type)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|(name, _)| name.as_str())
    }
}

impl CellClassifier for RegexClassifier {
    fn classify(&self, text: &str) -> Vec<Classification> {
        let text = text.trim();
        let total = text.chars().count();
        if total == 0 {
            return Vec::new();
        }

        let mut found: Vec<Classification> = self
            .types
            .iter()
            .filter_map(|(name, patterns)| {
                let covered = patterns
                    .iter()
                    .flat_map(|re| re.find_iter(text))
                    .map(|m| m.as_str().chars().count())
                    .max()
                    .filter(|len| *len > 0)?;
                Some(Classification { content_type: name.clone(), confidence: covered as f64 / total as f64 })
            })
            .collect();
        found.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then_with(|| a.content_type.cmp(&b.content_type)));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RegexClassifier {
        let mut table = BTreeMap::new();
        table.insert("digit".to_string(), vec![r"[1-8]".to_string()]);
        table.insert("number".to_string(), vec![r"\d+".to_string()]);
        table.insert("word".to_string(), vec![r"[A-Za-z]+".to_string()]);
        RegexClassifier::new(&table).unwrap()
    }

    #[test]
    fn ranks_by_coverage() {
        let found = classifier().classify(" 42 ");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], Classification { content_type: "number".to_string(), confidence: 1.0 });
        assert_eq!(found[1].content_type, "digit");
        assert!((found[1].confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn partial_hits_score_their_share() {
        let found = classifier().classify("ab12");
        assert_eq!(found.iter().map(|c| c.content_type.as_str()).collect::<Vec<_>>(), vec!["number", "word", "digit"]);
        assert!(classifier().classify("   ").is_empty());
        assert!(classifier().classify("?!").is_empty());
    }

    #[test]
    fn rejects_invalid_regex() {
        let table = BTreeMap::from([("bad".to_string(), vec!["(".to_string()])]);
        let err = RegexClassifier::new(&table).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidRegex { ref cell_type, .. } if cell_type == "bad"));
        assert!(classifier().declares("word"));
        assert_eq!(classifier().type_names().count(), 3);
    }
}
