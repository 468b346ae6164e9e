//! Structured error types for xlsnap.
//!
//! Recoverable kinds (`MalformedRange`, `StyleResolution`, `ImageDecode`) are
//! built at the point of failure, logged, and dropped there. The rest reach
//! the caller.

/// All errors that can occur while loading, laying out or rendering a sheet.
#[derive(Debug, thiserror::Error)]
pub enum XlsnapError {
    /// Requested sheet name or index does not exist.
    #[error("Sheet not found: {0}")]
    NotFound(String),

    /// Merge range or dimension string that cannot be parsed.
    #[error("Malformed range: {0}")]
    MalformedRange(String),

    /// Style id unknown to the workbook or style record unusable.
    #[error("Style resolution failed: {0}")]
    StyleResolution(String),

    /// Embedded picture bytes could not be decoded.
    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    /// Caller handed in something that cannot be rendered (e.g. an empty sheet).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Used range is larger than the configured row x column ceiling.
    #[error("Sheet too large: {rows} rows x {cols} cols exceeds limit of {limit} cells")]
    TooLarge { rows: u32, cols: u32, limit: u64 },

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Rendering error.
    #[error("Render error: {0}")]
    Render(String),

    /// PNG encoding error.
    #[error("PNG encoding: {0}")]
    Encode(String),

    /// Options file could not be read as JSON.
    #[error("Config: {0}")]
    Config(#[from] serde_json::Error),

    /// General parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlsnapError>;

impl XlsnapError {
    /// True for the kinds the pipeline recovers from locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedRange(_) | Self::StyleResolution(_) | Self::ImageDecode(_)
        )
    }
}
