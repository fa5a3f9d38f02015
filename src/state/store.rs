//! Dedup store shared by every fetch of a run
//!
//! All link records of a run live in one arena behind a single mutex. Date groups and
//! the URL index both refer to records by `LinkId`, so a resolution applied through the
//! index is the same record the date group later serializes.

use crate::catalog::{DateGroup, Link, Resolution};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Index of a link record inside a `LinkStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(usize);

/// Outcome of offering a listing item to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Registered under its URL and appended to the current date group
    Admitted(LinkId),
    /// Appended and counted, but another record already owns this URL, so it is
    /// neither registered nor fetched
    Duplicate(LinkId),
    /// The per-run item limit has been reached
    LimitReached,
}

/// Counters describing the store at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Listing items admitted
    pub admitted: usize,
    /// URLs registered, seeds and further hops together
    pub registered: usize,
    /// Registered URLs whose visit has finished, successfully or not
    pub visited: usize,
    /// Admitted items with a non-empty `src`
    pub resolved: usize,
}

#[derive(Debug)]
struct PendingEntry {
    link: LinkId,
    done: bool,
}

#[derive(Debug)]
struct GroupSlots {
    date: String,
    links: Vec<LinkId>,
}

#[derive(Debug)]
struct StoreInner {
    links: Vec<Link>,
    pending: HashMap<String, PendingEntry>,
    groups: Vec<GroupSlots>,
    current_date: usize,
    admitted: usize,
}

/// Mapping from absolute URL to in-flight link record
///
/// Every operation takes the one lock, does a map lookup/insert or a vector push and
/// releases it; nothing awaits while holding it.
#[derive(Debug)]
pub struct LinkStore {
    inner: Mutex<StoreInner>,
    max_links: usize,
}

impl LinkStore {
    /// Creates an empty store whose date cursor starts at `default_date`
    pub fn new(max_links: usize, default_date: impl Into<String>) -> Self {
        let inner = StoreInner {
            links: Vec::new(),
            pending: HashMap::new(),
            groups: vec![GroupSlots {
                date: default_date.into(),
                links: Vec::new(),
            }],
            current_date: 0,
            admitted: 0,
        };

        Self {
            inner: Mutex::new(inner),
            max_links,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Critical sections are single inserts or pushes; a poisoned guard is consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the date cursor to `label`, creating its group on first sight
    pub fn open_date(&self, label: &str) {
        let mut inner = self.lock();
        let existing = inner.groups.iter().position(|g| g.date == label);
        let position = match existing {
            Some(position) => position,
            None => {
                inner.groups.push(GroupSlots {
                    date: label.to_string(),
                    links: Vec::new(),
                });
                inner.groups.len() - 1
            }
        };
        inner.current_date = position;
    }

    /// Label of the group new items are appended to
    #[cfg(test)]
    pub(crate) fn current_date(&self) -> String {
        let inner = self.lock();
        inner.groups[inner.current_date].date.clone()
    }

    /// Offers a listing item whose redirect resolves to `url`
    ///
    /// Every admitted record is appended to the current date group and counted against
    /// the item limit. It is also registered under `url` unless another record already
    /// owns that URL. All of this happens under one lock acquisition.
    pub fn admit(&self, link: Link, url: &str) -> Admission {
        let mut inner = self.lock();

        if inner.admitted >= self.max_links {
            return Admission::LimitReached;
        }

        let id = LinkId(inner.links.len());
        inner.links.push(link);
        let current = inner.current_date;
        inner.groups[current].links.push(id);
        inner.admitted += 1;

        if inner.pending.contains_key(url) {
            return Admission::Duplicate(id);
        }
        inner.pending.insert(
            url.to_string(),
            PendingEntry {
                link: id,
                done: false,
            },
        );

        Admission::Admitted(id)
    }

    /// Registers `url` as a further hop of an existing record
    ///
    /// Returns false, and leaves the mapping untouched, when `url` is already known.
    /// Callers must not fetch `url` in that case.
    pub fn register(&self, url: &str, link: LinkId) -> bool {
        let mut inner = self.lock();
        if inner.pending.contains_key(url) {
            return false;
        }
        inner
            .pending
            .insert(url.to_string(), PendingEntry { link, done: false });
        true
    }

    /// Finds the record registered under `url`
    pub fn lookup(&self, url: &str) -> Option<LinkId> {
        self.lock().pending.get(url).map(|entry| entry.link)
    }

    /// Marks the visit of `url` as finished; returns false for unknown URLs
    pub fn record_done(&self, url: &str) -> bool {
        match self.lock().pending.get_mut(url) {
            Some(entry) => {
                entry.done = true;
                true
            }
            None => false,
        }
    }

    /// Applies a classifier result unless the record already has a source
    ///
    /// Returns true if this call set the source.
    pub fn resolve(&self, id: LinkId, resolution: Resolution) -> bool {
        let mut inner = self.lock();
        let Some(link) = inner.links.get_mut(id.0) else {
            return false;
        };
        if link.is_resolved() || resolution.src.is_empty() {
            return false;
        }
        link.src = resolution.src;
        link.link_type = resolution.link_type;
        true
    }

    /// Returns true if the record has a final source
    pub fn is_resolved(&self, id: LinkId) -> bool {
        self.lock()
            .links
            .get(id.0)
            .is_some_and(Link::is_resolved)
    }

    /// Returns a copy of the record
    #[cfg(test)]
    pub(crate) fn link(&self, id: LinkId) -> Option<Link> {
        self.lock().links.get(id.0).cloned()
    }

    /// Snapshot of every date group, including empty ones, in first-seen order
    pub fn date_groups(&self) -> Vec<DateGroup> {
        let inner = self.lock();
        inner
            .groups
            .iter()
            .map(|group| DateGroup {
                date: group.date.clone(),
                links: group
                    .links
                    .iter()
                    .map(|id| inner.links[id.0].clone())
                    .collect(),
            })
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.lock();
        StoreStats {
            admitted: inner.admitted,
            registered: inner.pending.len(),
            visited: inner.pending.values().filter(|entry| entry.done).count(),
            resolved: inner.links.iter().filter(|link| link.is_resolved()).count(),
        }
    }
}
