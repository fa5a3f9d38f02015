//! Linkcrawl: a listing-page link resolver
//!
//! This crate crawls a single listing page, follows every item's redirect chain to the
//! media resource it finally embeds, classifies that resource and persists a
//! date-grouped link catalog. Fetches can go straight to the site or through an
//! anti-bot challenge relay.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod daemon;
pub mod output;
pub mod server;
pub mod state;
pub mod transport;

use thiserror::Error;

/// Main error type for linkcrawl operations
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Listing page {url} could not be fetched: {reason}")]
    Listing { url: String, reason: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

// Re-export commonly used types
pub use catalog::{CatalogEntry, Link, LinkType};
pub use config::Config;
pub use state::{LinkStore, RunContext};
pub use transport::{Transport, TransportKind};
