//! Per-run context
//!
//! One `RunContext` is created for every scrape and dropped when it finishes. It owns
//! the dedup store (with its item counter and date cursor) and the run's fixed limits,
//! and is shared by reference with every component of the pipeline.

use crate::config::ScraperConfig;
use crate::state::LinkStore;
use crate::LinkError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use url::Url;

#[derive(Debug)]
pub struct RunContext {
    /// Listing page of this run; relative item links resolve against it
    pub listing_url: Url,

    /// Deepest hop that may still be fetched
    pub max_depth: u32,

    pub store: LinkStore,

    fetches: AtomicUsize,
    failures: AtomicUsize,
    started: Instant,
}

impl RunContext {
    pub fn new(config: &ScraperConfig) -> Result<Self, LinkError> {
        Ok(Self {
            listing_url: Url::parse(&config.listing_url)?,
            max_depth: config.max_depth,
            store: LinkStore::new(config.max_links, config.default_date.clone()),
            fetches: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            started: Instant::now(),
        })
    }

    /// Counts an issued hop fetch
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a hop fetch that failed or returned unusable content
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}
