//! Error types.
//!
//! Only configuration problems are hard failures. Matching-time shortages
//! (a component without candidates, an undersized array) degrade to fewer
//! matches plus a `tracing` warning and never show up here.

use thiserror::Error;

/// Errors raised while parsing or validating an [`OpenRange`](crate::OpenRange).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("malformed range '{0}' (expected N, N+, N-, N..M, N,M or *)")]
    Parse(String),

    #[error("reversed range: start {start} is greater than stop {stop}")]
    Reversed { start: i64, stop: i64 },
}

/// Errors raised by spatial constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// Strict evaluation needed a variable the caller did not provide. This is
    /// a wiring bug between an evaluator and the match registry.
    #[error("{evaluator}: missing variable '{variable}'")]
    MissingVariable { evaluator: String, variable: String },

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("unknown direction '{0}'")]
    UnknownDirection(String),

    #[error("cannot parse constraint '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error(transparent)]
    Range(#[from] RangeError),
}

/// Grammar construction and loading errors.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("cycle in grammar involving patterns: {0}")]
    Cycle(String),

    #[error("pattern '{referrer}' references unknown pattern '{pattern}'")]
    UnknownPattern { referrer: String, pattern: String },

    #[error("root pattern '{0}' is not defined")]
    UnknownRoot(String),

    #[error("pattern '{pattern}' references undeclared cell type '{cell_type}'")]
    UndeclaredCellType { pattern: String, cell_type: String },

    #[error("component '{component}' of pattern '{pattern}' defines neither `pattern` nor `pattern_definition`")]
    MissingComponentPattern { pattern: String, component: String },

    #[error("component '{component}' of pattern '{pattern}' has count {count}, which admits no match")]
    InvalidComponentCount { pattern: String, component: String, count: String },

    #[error("pattern '{0}' must declare at least one inner component")]
    NoInnerComponents(String),

    #[error("duplicate pattern name '{0}'")]
    DuplicatePattern(String),

    #[error("invalid regex for cell type '{cell_type}': {source}")]
    InvalidRegex {
        cell_type: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern '{pattern}': {source}")]
    Range {
        pattern: String,
        #[source]
        source: RangeError,
    },

    #[error("pattern '{pattern}': {source}")]
    Constraint {
        pattern: String,
        #[source]
        source: ConstraintError,
    },

    #[error("pattern '{pattern}': {reason}")]
    Invalid { pattern: String, reason: String },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gridmatch operations.
pub type Result<T> = std::result::Result<T, Error>;
