//! End-to-end run: collect → enrich → write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use pluginmaster_shared::{CatalogConfig, Result};

use crate::catalog::write_catalog;
use crate::collector::collect_manifests;
use crate::enrichment::{EnrichmentContext, enrich_all};

/// Result of a successful run.
#[derive(Debug)]
pub struct CatalogSummary {
    /// Where the catalog was written.
    pub output_path: PathBuf,
    /// Number of plugins in the catalog.
    pub plugin_count: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Build the master catalog for the configured channel.
///
/// Any error aborts the run before the catalog is touched.
#[instrument(skip_all, fields(channel = %config.channel, dist = %config.dist_dir.display()))]
pub fn build_catalog(config: &CatalogConfig) -> Result<CatalogSummary> {
    let start = Instant::now();

    let manifests = collect_manifests(&config.channel_dir())?;
    let enriched = enrich_all(&manifests, &EnrichmentContext::from(config))?;
    let plugin_count = write_catalog(&config.output_path, enriched)?;

    info!(
        plugin_count,
        path = %config.output_path.display(),
        "catalog build complete"
    );

    Ok(CatalogSummary {
        output_path: config.output_path.clone(),
        plugin_count,
        elapsed: start.elapsed(),
    })
}
