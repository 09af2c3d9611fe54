//! Recognition of structured documents laid out on 2D grids.
//!
//! A [`Grammar`] describes a document as nested spatial patterns: classified
//! cells, arrays of repeated items, fixed structures and floating areas, tied
//! together by constraints over their boxes. [`GrammarMatcher`] runs the
//! grammar over a [`Grid`] wave by wave and returns the root matches.
//!
//! ```text
//! Grammar::from_yaml_str ─┐
//!                         ├─▶ GrammarMatcher::run_match ─▶ Vec<Arc<Match>>
//! Grid::from_chars ───────┘
//! ```

#[macro_use]
mod macros;
mod api;
pub mod clash;
pub mod classify;
pub mod constraints;
pub mod error;
pub mod geom;
pub mod grammar;
pub mod grid;
pub mod matcher;

pub use api::{
    MatchSummary, Options, ParseDetails, ParseResult, ParseResultVerbose, WavePass, parse, parse_verbose,
    parse_verbose_with, parse_with,
};
pub use error::{Error, Result};
pub use grammar::Grammar;
pub use grid::Grid;
pub use matcher::{GrammarMatcher, Match, MatchData};
