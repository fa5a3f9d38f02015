//! Comment count refresher
//!
//! Re-reads the listing page and patches `comment_number` on the links of an existing
//! catalog. Links are never added or removed and no other field changes.

use crate::catalog::CatalogEntry;
use crate::config::Config;
use crate::crawler::coordinator::fetch_listing;
use crate::crawler::listing::comment_counts;
use crate::output::{load_catalog, write_catalog};
use crate::transport::Transport;
use crate::LinkError;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// What one refresh pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Links in the catalog
    pub links: usize,

    /// Links whose comment URL appeared on the listing
    pub matched: usize,

    /// Matched links whose count actually changed
    pub changed: usize,
}

/// Overwrites comment counts from `counts`, keyed by comment URL
///
/// Links whose comment URL is absent from `counts` keep their previous count.
pub fn apply_comment_counts(
    entries: &mut [CatalogEntry],
    counts: &HashMap<String, String>,
) -> RefreshReport {
    let mut report = RefreshReport::default();

    for link in entries.iter_mut().flat_map(|entry| entry.links.iter_mut()) {
        report.links += 1;
        let Some(count) = counts.get(&link.comment_url) else {
            continue;
        };
        report.matched += 1;
        if link.comment_number != *count {
            link.comment_number.clone_from(count);
            report.changed += 1;
        }
    }

    report
}

/// Refreshes the comment counts of the catalog at `path`
///
/// The catalog is read before the listing is fetched and only rewritten if both
/// succeeded.
pub async fn refresh_comments(
    path: &Path,
    listing_url: &Url,
    transport: &dyn Transport,
) -> Result<RefreshReport, LinkError> {
    let mut entries = load_catalog(path)?;

    let page = fetch_listing(transport, listing_url).await?;
    let counts = comment_counts(&page.body).map_err(|reason| LinkError::Listing {
        url: listing_url.to_string(),
        reason,
    })?;

    let report = apply_comment_counts(&mut entries, &counts);
    write_catalog(path, &entries)?;

    Ok(report)
}

/// Runs one refresh pass, logging instead of returning failures
pub async fn run_comment_refresh(
    config: &Config,
    transport: &dyn Transport,
) -> Option<RefreshReport> {
    let listing_url = match Url::parse(&config.scraper.listing_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Comment refresh skipped, bad listing URL: {}", e);
            return None;
        }
    };

    tracing::info!("Updating comment numbers...");
    match refresh_comments(Path::new(&config.output.catalog_path), &listing_url, transport).await {
        Ok(report) => {
            tracing::info!(
                "Comment numbers updated: {} of {} links matched, {} changed",
                report.matched,
                report.links,
                report.changed
            );
            Some(report)
        }
        Err(e) => {
            tracing::error!("Comment refresh failed: {}", e);
            None
        }
    }
}
