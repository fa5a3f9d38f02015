//! Redirect-chain resolution
//!
//! Starting from one hop per admitted listing item, workers fetch each hop, classify the
//! page and either resolve the item's record or queue further hops. Every hop URL is
//! registered in the store before it is fetched, so no URL is fetched twice in a run.
//! `run` returns once every spawned worker has finished.

use crate::crawler::classifier::Classifier;
use crate::crawler::scheduler::HostLimiter;
use crate::state::{LinkId, RunContext};
use crate::transport::{FetchRequest, FetchedPage, Transport};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// A URL to visit and its distance from the listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub url: Url,
    pub depth: u32,
}

/// Follows redirect chains for every record of a run
#[derive(Clone)]
pub struct Resolver {
    ctx: Arc<RunContext>,
    transport: Arc<dyn Transport>,
    classifier: Arc<Classifier>,
    limiter: Arc<HostLimiter>,
}

impl Resolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `ctx` - The run whose store holds the records and registered URLs
    /// * `transport` - Fetch implementation shared by all workers
    /// * `classifier` - Rules applied to every fetched page
    /// * `parallelism` - In-flight fetches allowed per host
    pub fn new(
        ctx: Arc<RunContext>,
        transport: Arc<dyn Transport>,
        classifier: Arc<Classifier>,
        parallelism: usize,
    ) -> Self {
        Self {
            ctx,
            transport,
            classifier,
            limiter: Arc::new(HostLimiter::new(parallelism)),
        }
    }

    /// Visits `seeds` and every hop discovered from them, then returns
    pub async fn run(&self, seeds: Vec<Hop>) {
        let mut queue: VecDeque<Hop> = seeds.into();
        let mut workers = JoinSet::new();

        tracing::debug!("Resolving {} seed hops", queue.len());

        loop {
            while let Some(hop) = queue.pop_front() {
                let resolver = self.clone();
                workers.spawn(async move { resolver.visit(hop).await });
            }

            match workers.join_next().await {
                Some(Ok(next)) => queue.extend(next),
                Some(Err(e)) => tracing::error!("Resolver worker failed: {}", e),
                None => break,
            }
        }

        let stats = self.ctx.store.stats();
        tracing::debug!(
            "Resolution finished: {} URLs registered, {} visited",
            stats.registered,
            stats.visited
        );
    }

    /// Fetches and classifies one hop, returning the hops it discovered
    async fn visit(&self, hop: Hop) -> Vec<Hop> {
        let url_str = hop.url.as_str();
        let Some(id) = self.ctx.store.lookup(url_str) else {
            tracing::warn!("Hop {} was never registered, skipping", url_str);
            return Vec::new();
        };

        if self.ctx.store.is_resolved(id) {
            tracing::debug!("Record for {} already resolved, not fetching", url_str);
            self.ctx.store.record_done(url_str);
            return Vec::new();
        }

        let next = match self.fetch(&hop).await {
            Some(page) => self.apply(&hop, id, &page),
            None => {
                self.ctx.record_failure();
                Vec::new()
            }
        };

        self.ctx.store.record_done(url_str);
        next
    }

    /// Fetches a hop under its host's permit; `None` if the page is unusable
    async fn fetch(&self, hop: &Hop) -> Option<FetchedPage> {
        let _permit = self.limiter.acquire(&hop.url).await;
        self.ctx.record_fetch();

        let page = match self.transport.fetch(FetchRequest::get(hop.url.clone())).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", hop.url, e);
                return None;
            }
        };

        if !page.is_success() {
            tracing::warn!("HTTP {} for {}", page.status, hop.url);
            return None;
        }
        if !page.is_html() {
            tracing::debug!("Skipping non-HTML {} ({})", hop.url, page.content_type);
            return None;
        }

        Some(page)
    }

    fn apply(&self, hop: &Hop, id: LinkId, page: &FetchedPage) -> Vec<Hop> {
        let base_url = Url::parse(&page.final_url).unwrap_or_else(|_| hop.url.clone());
        let classification = self.classifier.classify(&page.body, &base_url);

        if let Some(resolution) = classification.resolution {
            let link_type = resolution.link_type;
            if self.ctx.store.resolve(id, resolution) {
                tracing::debug!("Resolved {} as {}", hop.url, link_type);
            }
        }

        if classification.hops.is_empty() {
            return Vec::new();
        }

        let depth = hop.depth + 1;
        if depth > self.ctx.max_depth {
            tracing::debug!(
                "Depth limit {} reached at {}, dropping {} hops",
                self.ctx.max_depth,
                hop.url,
                classification.hops.len()
            );
            return Vec::new();
        }
        if self.ctx.store.is_resolved(id) {
            return Vec::new();
        }

        classification
            .hops
            .into_iter()
            .filter(|url| {
                let fresh = self.ctx.store.register(url.as_str(), id);
                if !fresh {
                    tracing::debug!("Already registered {}, not fetching again", url);
                }
                fresh
            })
            .map(|url| Hop { url, depth })
            .collect()
    }
}
