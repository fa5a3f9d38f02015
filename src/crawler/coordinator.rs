//! Crawler coordinator - one complete scrape
//!
//! A run moves through fixed stages:
//! - Fetch the listing page (a failure here aborts the run)
//! - Parse it and seed the run's store with admitted items
//! - Resolve every item's redirect chain
//! - Order the date groups and replace the catalog file

use crate::config::Config;
use crate::crawler::classifier::Classifier;
use crate::crawler::listing::{parse_listing, seed};
use crate::crawler::resolver::Resolver;
use crate::output::{build_catalog, write_catalog};
use crate::state::RunContext;
use crate::transport::{FetchRequest, FetchedPage, Transport};
use crate::LinkError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Listing items admitted
    pub items: usize,

    /// Items that ended with a source
    pub resolved: usize,

    /// Items left without a source
    pub unresolved: usize,

    /// Hop fetches issued, excluding the listing page
    pub fetches: usize,

    /// Hop fetches that failed or returned unusable pages
    pub failures: usize,

    /// Date groups written to the catalog
    pub groups: usize,

    pub duration: Duration,
}

/// Main scrape coordinator
pub struct Coordinator {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    classifier: Arc<Classifier>,
}

impl Coordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `transport` - Fetch implementation used for the listing and every hop
    pub fn new(config: Arc<Config>, transport: Arc<dyn Transport>) -> Self {
        let classifier = Arc::new(Classifier::new(config.classifier.clone()));
        Self {
            config,
            transport,
            classifier,
        }
    }

    /// Runs one scrape and writes the catalog
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The catalog was replaced
    /// * `Err(LinkError)` - The listing could not be fetched or parsed, or the catalog
    ///   could not be written
    pub async fn run(&self) -> Result<RunSummary, LinkError> {
        let ctx = Arc::new(RunContext::new(&self.config.scraper)?);
        tracing::info!(
            "Starting scrape of {} via {} transport",
            ctx.listing_url,
            self.transport.name()
        );

        let page = fetch_listing(self.transport.as_ref(), &ctx.listing_url).await?;
        let base_url = Url::parse(&page.final_url).unwrap_or_else(|_| ctx.listing_url.clone());
        let entries = parse_listing(&page.body, &base_url).map_err(|reason| LinkError::Listing {
            url: ctx.listing_url.to_string(),
            reason,
        })?;

        let seeds = seed(&ctx, entries);
        tracing::info!(
            "Admitted {} items from the listing, {} distinct links to resolve",
            ctx.store.stats().admitted,
            seeds.len()
        );

        Resolver::new(
            Arc::clone(&ctx),
            Arc::clone(&self.transport),
            Arc::clone(&self.classifier),
            self.config.scraper.parallelism,
        )
        .run(seeds)
        .await;

        let catalog = build_catalog(ctx.store.date_groups());
        write_catalog(Path::new(&self.config.output.catalog_path), &catalog)?;

        let stats = ctx.store.stats();
        let summary = RunSummary {
            items: stats.admitted,
            resolved: stats.resolved,
            unresolved: stats.admitted.saturating_sub(stats.resolved),
            fetches: ctx.fetches(),
            failures: ctx.failures(),
            groups: catalog.len(),
            duration: ctx.elapsed(),
        };

        tracing::info!(
            "Scrape completed: {} items ({} resolved, {} unresolved), {} fetches, {} failed, in {:?}",
            summary.items,
            summary.resolved,
            summary.unresolved,
            summary.fetches,
            summary.failures,
            summary.duration
        );

        Ok(summary)
    }
}

/// Fetches the listing page, treating any unusable answer as a listing error
pub(crate) async fn fetch_listing(
    transport: &dyn Transport,
    url: &Url,
) -> Result<FetchedPage, LinkError> {
    let listing_error = |reason: String| LinkError::Listing {
        url: url.to_string(),
        reason,
    };

    let page = transport
        .fetch(FetchRequest::get(url.clone()))
        .await
        .map_err(|e| listing_error(e.to_string()))?;

    if !page.is_success() {
        return Err(listing_error(format!("HTTP {}", page.status)));
    }
    if !page.is_html() {
        return Err(listing_error(format!(
            "expected HTML, got {}",
            page.content_type
        )));
    }

    Ok(page)
}

/// Convenience wrapper: builds a coordinator and runs it once
pub async fn run_scrape(
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
) -> Result<RunSummary, LinkError> {
    Coordinator::new(config, transport).run().await
}
