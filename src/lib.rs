//! xlsnap - XLSX worksheet snapshots
//!
//! Loads a worksheet into a dense, styled cell grid, lays it out in pixels
//! and rasterizes it to PNG:
//! - Row heights and column widths estimated from content when the workbook
//!   leaves them at their defaults
//! - Merged regions, fills, fonts, borders and alignment
//! - Embedded pictures
//! - Supersampled output, several sheets rendered in parallel
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use xlsnap::{FontRegistry, Renderer, Sheet, XlsxWorkbook};
//!
//! # fn main() -> xlsnap::Result<()> {
//! let workbook = XlsxWorkbook::open("book.xlsx")?;
//! let renderer = Renderer::builder()
//!     .with_fonts(Arc::new(FontRegistry::system()))
//!     .build()?;
//! let sheet = Sheet::load(&workbook, "Sheet1", &renderer.load_options())?;
//! renderer.render(&sheet)?.save_png("Sheet1.png")?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cell_ref;
pub mod config;
pub mod error;
pub mod grid;
pub mod layout;
pub mod render;
pub mod style;
pub mod workbook;
mod xml_helpers;

pub use batch::{render_workbook, BatchReport, RenderedSheet, SheetFailure, SheetSelection};
pub use config::{RenderOptions, RendererBuilder};
pub use error::{Result, XlsnapError};
pub use grid::{Cell, LoadOptions, MergedRange, Sheet};
pub use layout::{LayoutRect, SheetLayout};
pub use render::{FontRegistry, PaintCommand, RasterImage, Renderer};
pub use style::{ResolvedStyle, Rgb, StyleCache, StyleResolver};
pub use workbook::{MemoryWorkbook, Workbook, XlsxWorkbook};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
