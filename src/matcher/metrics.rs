//! Matching run metrics.
//!
//! The intended usage is:
//!
//! - `GrammarMatcher::run_match` for normal operation.
//! - `GrammarMatcher::run_with_metrics` for profiling, debugging grammars, and
//!   inspecting what each wave produced.
//!
//! `PatternMetrics::matches` holds the (shared) matches themselves so reports
//! can show samples without re-running anything.

use super::Match;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for [`GrammarMatcher::run_with_metrics`](super::GrammarMatcher::run_with_metrics).
    pub total: Duration,
    /// Time spent classifying cell contents.
    pub classification: Duration,
    /// One entry per dependency wave, in execution order.
    pub waves: Vec<WaveMetrics>,
}

impl RunMetrics {
    /// Matches produced across all waves.
    pub fn produced(&self) -> usize {
        self.waves.iter().map(|w| w.produced).sum()
    }
}

/// Timing for a single wave.
#[derive(Debug, Default, Clone)]
pub struct WaveMetrics {
    pub index: usize,
    pub duration: Duration,
    /// Matches registered at the end of the wave.
    pub produced: usize,
    pub patterns: Vec<PatternMetrics>,
}

/// Timing and output of one pattern's matcher.
#[derive(Debug, Clone)]
pub struct PatternMetrics {
    pub pattern: String,
    pub duration: Duration,
    pub produced: usize,
    pub matches: Vec<Arc<Match>>,
}

/// Matcher output bundled with timing information.
#[derive(Debug, Clone)]
pub struct MatchRun {
    /// Matches of the root pattern.
    pub roots: Vec<Arc<Match>>,
    pub metrics: RunMetrics,
}
