//! Crawler module: from listing page to resolved link catalog
//!
//! This module contains the core pipeline, including:
//! - Listing page parsing and item admission
//! - Content classification of redirect pages
//! - Per-host fetch limiting
//! - Concurrent redirect-chain resolution
//! - Overall run coordination and the comment refresher

pub mod classifier;
mod comments;
mod coordinator;
pub mod listing;
mod resolver;
mod scheduler;

pub use classifier::{Classification, Classifier, Extraction};
pub use comments::{apply_comment_counts, refresh_comments, run_comment_refresh, RefreshReport};
pub use coordinator::{run_scrape, Coordinator, RunSummary};
pub use listing::{comment_counts, parse_listing, ListingEntry, ListingItem};
pub use resolver::{Hop, Resolver};
pub use scheduler::HostLimiter;

use crate::config::Config;
use crate::transport::{build_transport, TransportKind};
use crate::LinkError;
use std::sync::Arc;

/// Runs a complete scrape with the transport selected by `kind`
///
/// This is the main entry point for a one-shot run. It will:
/// 1. Build the transport
/// 2. Fetch and parse the listing page
/// 3. Resolve every admitted item
/// 4. Replace the catalog file
///
/// # Returns
///
/// * `Ok(RunSummary)` - Scrape completed and the catalog was written
/// * `Err(LinkError)` - Scrape failed; the previous catalog is left in place unless
///   writing it was what failed
pub async fn scrape(config: Arc<Config>, kind: TransportKind) -> Result<RunSummary, LinkError> {
    let transport = build_transport(&config, kind)?;
    run_scrape(config, transport).await
}
