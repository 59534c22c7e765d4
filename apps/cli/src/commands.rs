//! CLI flag definitions, config resolution, and tracing setup.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use pluginmaster_core::pipeline::build_catalog;
use pluginmaster_shared::{CatalogConfig, ConfigOverrides, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Build the plugin master catalog from a distribution tree.
///
/// Every flag is optional; a bare `pluginmaster` run reads `dist/stable/` and
/// writes `dist/pluginmaster.json`.
#[derive(Parser, Debug)]
#[command(
    name = "pluginmaster",
    version,
    about = "Aggregate per-plugin manifests into a sorted master catalog.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file (defaults to ./pluginmaster.toml when present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root of the distribution tree.
    #[arg(long)]
    pub dist_dir: Option<PathBuf>,

    /// Base URL for download links.
    #[arg(long, env = "PROVIDER")]
    pub provider: Option<String>,

    /// Catalog file name, written under the distribution root.
    #[arg(long)]
    pub output: Option<String>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pluginmaster=info",
        1 => "pluginmaster=debug",
        _ => "pluginmaster=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Resolve configuration and build the catalog.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let overrides = ConfigOverrides {
        dist_dir: cli.dist_dir,
        output_file: cli.output,
        provider: cli.provider,
    };
    let config = CatalogConfig::resolve(file_config, overrides)?;

    info!(
        dist = %config.dist_dir.display(),
        channel = %config.channel,
        provider = %config.provider,
        "building plugin catalog"
    );

    let summary = build_catalog(&config)?;

    println!();
    println!("  Catalog written!");
    println!("  Plugins: {}", summary.plugin_count);
    println!("  Path:    {}", summary.output_path.display());
    println!("  Time:    {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}
