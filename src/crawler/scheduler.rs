//! Per-host concurrency limiting
//!
//! Each host gets its own semaphore with `parallelism` permits, created the first time
//! the host is seen. A worker holds its permit for the duration of one fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Bounds in-flight fetches per target host
#[derive(Debug)]
pub struct HostLimiter {
    per_host: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    /// Creates a limiter allowing `per_host` concurrent fetches to any one host
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host: per_host.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts
            .entry(host.to_ascii_lowercase())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
            .clone()
    }

    /// Waits for a fetch slot on the URL's host
    ///
    /// URLs without a host share one slot pool keyed by the empty string. Returns
    /// `None` only if the semaphore was closed, which this limiter never does.
    pub async fn acquire(&self, url: &Url) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.semaphore(url.host_str().unwrap_or(""));
        semaphore.acquire_owned().await.ok()
    }

    /// Free slots currently available for `host`
    #[cfg(test)]
    fn available(&self, host: &str) -> usize {
        self.semaphore(host).available_permits()
    }

    /// Number of hosts seen so far
    #[cfg(test)]
    fn host_count(&self) -> usize {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_permits_are_per_host() {
        let limiter = HostLimiter::new(2);

        let _a1 = limiter.acquire(&url("https://a.example/1")).await.unwrap();
        let _a2 = limiter.acquire(&url("https://A.example/2")).await.unwrap();
        assert_eq!(limiter.available("a.example"), 0);

        let _b = limiter.acquire(&url("https://b.example/")).await.unwrap();
        assert_eq!(limiter.available("b.example"), 1);
        assert_eq!(limiter.host_count(), 2);
    }

    #[tokio::test]
    async fn test_third_fetch_waits_for_release() {
        let limiter = Arc::new(HostLimiter::new(2));
        let target = url("https://a.example/");

        let first = limiter.acquire(&target).await.unwrap();
        let _second = limiter.acquire(&target).await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            let target = target.clone();
            tokio::spawn(async move { limiter.acquire(&target).await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        assert!(waiter.await.unwrap());
    }

    #[test]
    fn test_zero_parallelism_is_clamped() {
        let limiter = HostLimiter::new(0);
        assert_eq!(limiter.available("a.example"), 1);
    }
}
