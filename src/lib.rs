//! OpenMalaria survey output plotter
//!
//! This library provides the modules behind the `omplot` binary and is used by
//! the integration tests.
//!
//! Module organization:
//! - `survey`: output reading, measure catalog, keys and series expansion
//! - `render`: figure model and renderers
//! - `pipeline`: figure assembly from a value store
//! - `config` / `cli`: command-line options and validated plot configuration

pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod survey;
