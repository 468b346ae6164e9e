//! Rendering several sheets of one workbook, one rayon task per sheet.

use std::path::Path;

use rayon::prelude::*;

use crate::error::XlsnapError;
use crate::grid::{LoadOptions, Sheet};
use crate::render::{RasterImage, Renderer};
use crate::workbook::Workbook;

/// Characters that may not appear in a generated file name component.
const UNSAFE_FILE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Which sheets to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelection {
    Name(String),
    /// 0-based position in workbook order.
    Index(usize),
    All,
}

impl Default for SheetSelection {
    fn default() -> Self {
        Self::Index(0)
    }
}

#[derive(Debug)]
pub struct RenderedSheet {
    pub name: String,
    pub index: usize,
    pub rows: u32,
    pub cols: u32,
    pub image: RasterImage,
}

#[derive(Debug)]
pub struct SheetFailure {
    /// Sheet name, or the selector text when it matched nothing.
    pub name: String,
    pub error: XlsnapError,
}

/// Outcome of a batch, both lists in workbook order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rendered: Vec<RenderedSheet>,
    pub failures: Vec<SheetFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolve `selection` against the workbook's sheet list.
fn select(
    workbook: &dyn Workbook,
    selection: &SheetSelection,
) -> Result<Vec<(usize, String)>, SheetFailure> {
    let names = workbook.sheet_names();
    match selection {
        SheetSelection::All => Ok(names.into_iter().enumerate().collect()),
        SheetSelection::Name(name) => names
            .iter()
            .position(|n| n == name)
            .map(|i| vec![(i, name.clone())])
            .ok_or_else(|| SheetFailure {
                name: name.clone(),
                error: XlsnapError::NotFound(name.clone()),
            }),
        SheetSelection::Index(i) => names
            .get(*i)
            .map(|n| vec![(*i, n.clone())])
            .ok_or_else(|| SheetFailure {
                name: format!("#{i}"),
                error: XlsnapError::NotFound(format!(
                    "sheet index {i} out of range ({} sheets)",
                    names.len()
                )),
            }),
    }
}

fn render_one(
    workbook: &dyn Workbook,
    name: &str,
    renderer: &Renderer,
    options: &LoadOptions,
) -> crate::Result<RenderedSheet> {
    let sheet = Sheet::load(workbook, name, options)?;
    let image = renderer.render(&sheet)?;
    Ok(RenderedSheet {
        name: name.to_string(),
        index: sheet.index(),
        rows: sheet.rows(),
        cols: sheet.cols(),
        image,
    })
}

/// Load and render every selected sheet. A failing sheet is reported and
/// the rest still render.
pub fn render_workbook(
    workbook: &dyn Workbook,
    selection: &SheetSelection,
    renderer: &Renderer,
    options: &LoadOptions,
) -> BatchReport {
    let targets = match select(workbook, selection) {
        Ok(targets) => targets,
        Err(failure) => {
            return BatchReport {
                rendered: Vec::new(),
                failures: vec![failure],
            }
        }
    };

    let outcomes: Vec<(String, crate::Result<RenderedSheet>)> = targets
        .into_par_iter()
        .map(|(_, name)| {
            let outcome = render_one(workbook, &name, renderer, options);
            (name, outcome)
        })
        .collect();

    let mut report = BatchReport::default();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(sheet) => report.rendered.push(sheet),
            Err(error) => {
                log::warn!("sheet {name:?} failed: {error}");
                report.failures.push(SheetFailure { name, error });
            }
        }
    }
    report
}

/// Make `s` safe to use inside a file name.
pub fn sanitize_file_component(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if UNSAFE_FILE_CHARS.contains(&c) { '-' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "sheet".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<excel-stem>_<sheet>_<timestamp>.png`.
pub fn output_file_name(excel_path: &Path, sheet: &str, timestamp: &str) -> String {
    let stem = excel_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "{}_{}_{}.png",
        sanitize_file_component(&stem),
        sanitize_file_component(sheet),
        timestamp
    )
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Sheet1", "Sheet1")]
    #[test_case("Q1/Q2", "Q1-Q2")]
    #[test_case(r#"a\b:c*d?e"f<g>h|i"#, "a-b-c-d-e-f-g-h-i")]
    #[test_case("  padded  ", "padded")]
    #[test_case("", "sheet")]
    #[test_case("   ", "sheet")]
    #[test_case("数据", "数据")]
    fn test_sanitize(input: &str, expected: &str) {
        assert_eq!(sanitize_file_component(input), expected);
    }

    #[test]
    fn test_output_file_name() {
        let name = output_file_name(Path::new("/tmp/in/report.xlsx"), "A/B", "20240101_120000");
        assert_eq!(name, "report_A-B_20240101_120000.png");
    }

    #[test]
    fn test_default_selection_is_first_sheet() {
        assert_eq!(SheetSelection::default(), SheetSelection::Index(0));
    }
}
