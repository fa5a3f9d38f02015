//! Catalog data model
//!
//! - `Link`: one listing item and whatever its redirect chain resolved to
//! - `LinkType`: the resource classification
//! - `CatalogEntry`: a date label with its links, as persisted

mod link;

pub use link::{Link, LinkType, Resolution};

use serde::{Deserialize, Serialize};

/// One date group of the persisted catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Opaque site-supplied label ("Idag", or a rendered date)
    pub date: String,

    /// Links in listing order
    pub links: Vec<Link>,
}

/// A date group while a run is still in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub date: String,
    pub links: Vec<Link>,
}

impl From<DateGroup> for CatalogEntry {
    fn from(group: DateGroup) -> Self {
        Self {
            date: group.date,
            links: group.links,
        }
    }
}
