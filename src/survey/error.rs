use thiserror::Error;

/// Errors that can occur while reading survey output or assembling plots
#[derive(Debug, Error)]
pub enum PlotError {
    /// Role assignment is unusable (dual x-axis, nothing on the x-axis, bad label flags)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catalog or key data contradicts itself; never defaulted
    #[error("Data consistency error: {0}")]
    DataConsistency(String),

    /// Lookup of an unknown measure or measure group
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filtering removed every record
    #[error("No data to plot (after filtering)!")]
    EmptyData,

    /// An expansion step was handed zero candidates
    #[error("Expansion over {0} has no candidates")]
    EmptyExpansion(&'static str),

    /// Requested colour is not a palette entry
    #[error("Colour '{0}' not found in palette")]
    UnknownColor(String),

    /// Filter expression failed to parse
    #[error("Filter error at offset {offset}: {message}")]
    Filter { offset: usize, message: String },

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular reader error
    #[error("Table error: {0}")]
    Table(#[from] polars::prelude::PolarsError),

    /// Embedded data or renderer output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Malformed numeric data reaching a single draw call.
///
/// Unlike [`PlotError`] this is tolerated: the series is reported and skipped.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Bad plot values: {0}")]
pub struct PlotValueError(pub String);

/// Type alias for Results using PlotError
pub type Result<T> = std::result::Result<T, PlotError>;
