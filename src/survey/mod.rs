//! Survey output model
//!
//! Everything that knows about OpenMalaria survey output, independent of how
//! the final figure is drawn.
//!
//! Structure:
//! - `key.rs`: partial coordinates and label derivation
//! - `catalog.rs`: measure names and measure groups
//! - `palette.rs`: named colours and per-subplot colour allocation
//! - `expand.rs`: subplot/line/x-axis key expansion
//! - `filter.rs`: record filter expressions
//! - `reader.rs`: output file parsing
//! - `store.rs`: keyed value storage
//! - `error.rs`: error types

pub mod catalog;
pub mod error;
pub mod expand;
pub mod filter;
pub mod key;
pub mod palette;
pub mod reader;
pub mod store;

// Re-exports for convenience
pub use catalog::MeasureCatalog;
pub use error::{PlotError, PlotValueError, Result};
pub use expand::{expand, expand_per_seed, SeriesExpander};
pub use filter::Filter;
pub use key::{DimKey, Dimension, LabelContext};
pub use palette::{ColorRegistry, UsedColors};
pub use reader::Record;
pub use store::{ValDict, ValueStore};
