use crate::error::Result;
use crate::grammar::Grammar;
use crate::grid::Grid;
use crate::matcher::{GrammarMatcher, Match};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Options that affect matching behavior.
///
/// Read from the `options:` section of a YAML grammar; every field has a
/// default, so a partial section (or none) is fine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Minimum classification confidence for a cell to match a cell pattern.
    pub precision_threshold: f64,
    /// Structure chains scoring below `best * cutoff_ratio` are dropped after
    /// each component.
    pub cutoff_ratio: f64,
    /// Completed area matches collected per entry point before the search stops.
    pub max_area_results: usize,
    /// Cap on arrangement size in the clash resolver.
    pub element_limit: Option<usize>,
    /// Cap on matches kept per pattern.
    pub match_limit: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Options { precision_threshold: 0.0, cutoff_ratio: 0.9, max_area_results: 16, element_limit: None, match_limit: None }
    }
}

/// Result from [`parse`] and [`parse_with`].
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Matches of the grammar's root pattern, top-left first.
    pub results: Vec<Arc<Match>>,
    /// Total elapsed time spent classifying and matching.
    pub elapsed: Duration,
}

/// A compact match summary used in verbose traces.
#[derive(Debug, Clone)]
pub struct MatchSummary {
    pub pattern: String,
    pub rect: crate::geom::Rect,
    pub precision: f64,
    pub preview: String,
}

/// A compact per-wave trace.
#[derive(Debug, Clone)]
pub struct WavePass {
    pub wave: usize,
    pub duration: Duration,
    pub produced: usize,
    /// Pattern names matched in this wave.
    pub patterns: Vec<String>,
    pub samples: Vec<MatchSummary>,
}

/// Additional details returned by [`parse_verbose`] and [`parse_verbose_with`].
#[derive(Debug, Clone)]
pub struct ParseDetails {
    pub total: Duration,
    pub classification: Duration,
    pub waves: Vec<WavePass>,
}

/// Result from [`parse_verbose`] and [`parse_verbose_with`].
#[derive(Debug, Clone)]
pub struct ParseResultVerbose {
    pub results: Vec<Arc<Match>>,
    pub elapsed: Duration,
    pub details: ParseDetails,
}

/// Match `grid` against `grammar` with the options declared in the grammar.
///
/// # Example
/// ```
/// use gridmatch::{Grammar, Grid, parse};
///
/// let grammar = Grammar::from_yaml_str(
///     "cell_types: { digit: '[0-9]' }\nroot: digits\npatterns:\n  \
///      digit: { kind: cell, content_type: digit }\n  \
///      digits: { kind: array, item: digit, direction: row }\n",
/// )
/// .unwrap();
/// let out = parse(&grammar, &Grid::from_chars("123")).unwrap();
/// assert_eq!(out.results.len(), 1);
/// assert_eq!(out.results[0].text(), "123");
/// ```
pub fn parse(grammar: &Grammar, grid: &Grid) -> Result<ParseResult> {
    parse_with(grammar, grid, grammar.options())
}

/// Match `grid` against `grammar` with explicit `options`.
pub fn parse_with(grammar: &Grammar, grid: &Grid, options: &Options) -> Result<ParseResult> {
    let mut matcher = GrammarMatcher::new(grammar.clone(), options.clone())?;
    let run = matcher.run_with_metrics(grid)?;
    Ok(ParseResult { results: run.roots, elapsed: run.metrics.total })
}

pub fn parse_verbose(grammar: &Grammar, grid: &Grid) -> Result<ParseResultVerbose> {
    parse_verbose_with(grammar, grid, grammar.options())
}

/// Match with `options` and return per-wave timings plus a few sample matches
/// of every wave.
pub fn parse_verbose_with(grammar: &Grammar, grid: &Grid, options: &Options) -> Result<ParseResultVerbose> {
    let mut matcher = GrammarMatcher::new(grammar.clone(), options.clone())?;
    let run = matcher.run_with_metrics(grid)?;

    let waves = run
        .metrics
        .waves
        .iter()
        .map(|wave| WavePass {
            wave: wave.index,
            duration: wave.duration,
            produced: wave.produced,
            patterns: wave.patterns.iter().map(|p| p.pattern.clone()).collect(),
            samples: wave.patterns.iter().flat_map(|p| p.matches.iter()).take(8).map(|m| summarize(m)).collect(),
        })
        .collect();

    let details = ParseDetails { total: run.metrics.total, classification: run.metrics.classification, waves };
    Ok(ParseResultVerbose { results: run.roots, elapsed: run.metrics.total, details })
}

fn summarize(m: &Match) -> MatchSummary {
    MatchSummary {
        pattern: m.pattern.clone(),
        rect: m.rect,
        precision: m.precision(),
        preview: m.text().chars().take(80).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGITS: &str = r#"
cell_types:
  digit: '[0-9]'
root: digits
options:
  precision_threshold: 0.75
patterns:
  digit: { kind: cell, content_type: digit }
  digits: { kind: array, item: digit, direction: row }
"#;

    #[test]
    fn options_fill_in_defaults() {
        let options: Options = serde_yaml::from_str("cutoff_ratio: 0.5").unwrap();
        assert_eq!(options.cutoff_ratio, 0.5);
        assert_eq!(options.max_area_results, 16);
        assert_eq!(options.element_limit, None);
        assert!(serde_yaml::from_str::<Options>("cutof_ratio: 0.5").is_err());
    }

    #[test]
    fn parse_uses_grammar_options() {
        let grammar = Grammar::from_yaml_str(DIGITS).unwrap();
        let grid = Grid::from_delimited("1,2\n\n3x,4", ',');

        // "3x" is only half a digit
        let res = parse(&grammar, &grid).unwrap();
        let texts: Vec<String> = res.results.iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["12", "4"]);

        let res = parse_with(&grammar, &grid, &Options::default()).unwrap();
        let texts: Vec<String> = res.results.iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["12", "3x4"]);
        assert!(res.elapsed >= Duration::ZERO);
    }

    #[test]
    fn parse_verbose_includes_wave_trace() {
        let grammar = Grammar::from_yaml_str(DIGITS).unwrap();
        let res = parse_verbose_with(&grammar, &Grid::from_delimited("1,2\n\n3x,4", ','), &Options::default()).unwrap();

        assert_eq!(res.elapsed, res.details.total);
        assert!(res.details.classification <= res.details.total);
        assert_eq!(res.details.waves.len(), 2);
        assert_eq!(res.details.waves[0].patterns, vec!["digit"]);
        assert_eq!(res.details.waves[0].produced, 4);
        assert_eq!(res.details.waves[1].samples[0].preview, "12");
    }
}
