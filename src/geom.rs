//! Geometry kernel.
//!
//! Integer rectangle algebra on the cell grid, the four cardinal directions,
//! and open-ended ranges used to express *uncertain* positions.
//!
//! ```text
//!   x ──▶
//! y ┌───────────┐
//! │ │ (x, y)    │ h
//! ▼ │           │
//!   └───────────┘
//!         w          right = x + w, bottom = y + h (half-open)
//! ```
//!
//! A cell at column `c`, row `r` is `Rect::new(c, r, 1, 1)`; two horizontally
//! adjacent cells have a gap of `0`.
//!
//! ## Responsibilities by module
//!
//! - `rect.rs`: `Rect`, intersection/union, containment, Manhattan distances.
//! - `point.rs`: `Point`.
//! - `direction.rs`: `Direction` and its rotation arithmetic.
//! - `open_range.rs`: `OpenRange` and its string syntax.
//! - `ranged.rs`: `RangedSegment` / `RangedBox`, boxes whose edges are ranges.

#[path = "geom/direction.rs"]
mod direction;
#[path = "geom/open_range.rs"]
mod open_range;
#[path = "geom/point.rs"]
mod point;
#[path = "geom/ranged.rs"]
mod ranged;
#[path = "geom/rect.rs"]
mod rect;

pub use direction::Direction;
pub use open_range::OpenRange;
pub use point::Point;
pub use ranged::{RangedBox, RangedSegment};
pub use rect::Rect;
