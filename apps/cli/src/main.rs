//! pluginmaster — aggregate per-plugin manifests into the master catalog.
//!
//! Scans `dist/stable/`, enriches each manifest with build provenance, and
//! writes the sorted catalog to `dist/pluginmaster.json`.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
