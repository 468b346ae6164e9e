//! Layout engine: sizes rows and columns, then turns them into pixel
//! rectangles.
//!
//! - [`estimate`] holds the content-based sizing heuristics used while a
//!   sheet loads
//! - [`SheetLayout`] prefix-sums the resolved sizes and answers
//!   per-cell rectangle and grid-line queries

pub mod estimate;
mod sheet_layout;

pub use sheet_layout::{LayoutRect, SheetLayout};
