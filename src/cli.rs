//! Command-line arguments

use crate::config::{Role, YScale};
use crate::survey::filter::DEFAULT_FILTER;
use clap::Parser;
use std::path::PathBuf;

/// Plot OpenMalaria survey output files
///
/// Each of survey, group, cohort, genotype and file can be drawn on the
/// x-axis, split into separate subplots, split into separate lines, or summed
/// away. Measures are always split into subplots; with automatic measure
/// grouping, related measures share one subplot.
#[derive(Parser, Debug, Clone)]
#[command(name = "omplot", version)]
pub struct Cli {
    /// Survey output files to read
    pub files: Vec<PathBuf>,

    /// Filter expression over f, m, s, g, c, gt (e.g. "m in [11,12,13]")
    #[arg(short = 'e', long = "filter", default_value = DEFAULT_FILTER)]
    pub filter: String,

    /// Log the result of every filter evaluation
    #[arg(long)]
    pub debug_filter: bool,

    /// Plot each measure separately instead of grouping related measures
    #[arg(short = 'a', long)]
    pub no_auto_measures: bool,

    /// Role of the survey dimension
    #[arg(short = 's', long, value_enum, default_value_t = Role::None)]
    pub survey: Role,

    /// Role of the age group / species / drug dimension
    #[arg(short = 'g', long, value_enum, default_value_t = Role::None)]
    pub group: Role,

    /// Role of the cohort dimension
    #[arg(short = 'c', long, value_enum, default_value_t = Role::None)]
    pub cohort: Role,

    /// Role of the genotype dimension
    #[arg(long, value_enum, default_value_t = Role::None)]
    pub genotype: Role,

    /// Role of the input file dimension
    #[arg(short = 'f', long, value_enum, default_value_t = Role::Plot)]
    pub file: Role,

    /// Show full file paths instead of file numbers
    #[arg(short = 'n', long = "file-names")]
    pub full_names: bool,

    /// Never draw legends
    #[arg(short = 'l', long)]
    pub no_legends: bool,

    /// Labels to show: any subset of t (title), x and y
    #[arg(short = 'L', long, default_value = "txy")]
    pub labels: String,

    /// Stack bar blocks vertically instead of side by side
    #[arg(short = 'b', long)]
    pub vertical_stack: bool,

    /// Y-axis scale
    #[arg(long, value_enum, default_value_t = YScale::Auto)]
    pub scale: YScale,

    /// Write the figure as JSON to this file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log level selected by the verbosity flags
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
