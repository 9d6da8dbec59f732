//! omplot - main entry point
//!
//! Reads OpenMalaria survey output files, assigns each dimension its plotting
//! role, and writes the resulting figure as JSON for a plotting front end.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use omplot::cli::Cli;
use omplot::config::PlotConfig;
use omplot::logging::init_logging;
use omplot::pipeline::Plotter;
use omplot::render::JsonRenderer;
use std::process::ExitCode;

#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    if cli.files.is_empty() {
        // usage goes to stderr so stdout stays free for the figure
        eprintln!("{}", Cli::command().render_usage());
        eprintln!("No input files given");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    tracing::info!("omplot v{}", env!("CARGO_PKG_VERSION"));

    // Role conflicts are reported before any file is touched
    let config = PlotConfig::from_cli(cli).context("invalid options")?;
    tracing::debug!(
        x_axis = %config.x_axis,
        auto_measures = config.auto_measures,
        filter = %config.filter,
        "Configuration"
    );

    let mut plotter = Plotter::new(config)?;
    for path in &cli.files {
        plotter
            .read(path)
            .with_context(|| format!("reading {}", path.display()))?;
    }

    let mut renderer = JsonRenderer::new(cli.output.clone());
    plotter.plot(&mut renderer).context("plotting")?;
    Ok(())
}
