//! Clash resolution: every maximal conflict-free subset of a candidate list.
//!
//! Matchers produce candidates that may overlap on the grid. The resolver
//! turns "which candidates can coexist" into the full list of maximal
//! arrangements, from which the caller picks the best-scoring one.
//!
//! ```text
//!  elements ──▶ clash graph ──▶ free elements ∪ ⨯(spot arrangements)
//!                                                 │
//!                          spot = connected clash cluster, forked on its
//!                          first element (with it / without it)
//! ```
//!
//! Guarantees for every returned arrangement `A` of input `E`:
//!
//! - no two members of `A` clash,
//! - every element of `E \ A` clashes with some member of `A`,
//! - the union of all arrangements is `E`,
//! - no arrangement is returned twice.
//!
//! An `element_limit` trades the last three for bounded growth: arrangements
//! stop growing once they hold `limit` members.
//!
//! Both recursive steps are memoized on their exact [`ElementSet`] input for
//! the duration of one call.

#[path = "clash/arrangement.rs"]
mod arrangement;
#[path = "clash/element_set.rs"]
mod element_set;
#[path = "clash/resolver.rs"]
mod resolver;

pub use arrangement::{Arrangement, retain_longest_only};
pub use element_set::ElementSet;
pub use resolver::{ClashResolver, Conflict, resolve};
