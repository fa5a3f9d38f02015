//! Configuration module for linkcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use linkcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("linkcrawl.toml")).unwrap();
//! println!("Listing page: {}", config.scraper.listing_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, CookieEntry, OutputConfig, ScheduleConfig, ScraperConfig,
    ServerConfig, TransportConfig, TransportKind,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{parse_daily_at, validate};
