//! State module for a single scrape run
//!
//! # Components
//!
//! - `LinkStore`: URL → link record dedup store, date groups, item counter, date cursor
//! - `RunContext`: owns the store and the run's limits; injected into every component

mod context;
mod store;

// Re-export main types
pub use context::RunContext;
pub use store::{Admission, LinkId, LinkStore, StoreStats};
