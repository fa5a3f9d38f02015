use crate::config::types::{
    ClassifierConfig, Config, CookieEntry, ScheduleConfig, ScraperConfig, TransportConfig,
};
use crate::ConfigError;
use chrono::NaiveTime;
use url::Url;

/// One week
const MAX_COMMENT_REFRESH_MINUTES: u64 = 7 * 24 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_transport_config(&config.transport)?;
    validate_cookies(&config.cookies)?;
    validate_classifier_config(&config.classifier)?;
    validate_schedule_config(&config.schedule)?;

    if config.output.catalog_path.is_empty() {
        return Err(ConfigError::Validation(
            "catalog_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Parses the `HH:MM` daily run time
pub fn parse_daily_at(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| {
        ConfigError::Validation(format!("daily_at must be HH:MM, got '{}': {}", value, e))
    })
}

fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.listing_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "listing_url must use http or https, got '{}'",
            config.listing_url
        )));
    }

    if config.max_links < 1 || config.max_links > 500 {
        return Err(ConfigError::Validation(format!(
            "max_links must be between 1 and 500, got {}",
            config.max_links
        )));
    }

    if config.max_depth < 1 || config.max_depth > 5 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be between 1 and 5, got {}",
            config.max_depth
        )));
    }

    if config.parallelism < 1 || config.parallelism > 16 {
        return Err(ConfigError::Validation(format!(
            "parallelism must be between 1 and 16, got {}",
            config.parallelism
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_transport_config(config: &TransportConfig) -> Result<(), ConfigError> {
    // Checked whatever the configured kind, since `--transport relay` can override it
    let endpoint = Url::parse(&config.relay_endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid relay_endpoint: {}", e)))?;
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "relay_endpoint must use http or https, got '{}'",
            config.relay_endpoint
        )));
    }

    if config.max_timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "max_timeout must be >= 1000ms, got {}ms",
            config.max_timeout
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_cookies(cookies: &[CookieEntry]) -> Result<(), ConfigError> {
    for cookie in cookies {
        if cookie.name.is_empty() {
            return Err(ConfigError::Validation(
                "cookie name cannot be empty".to_string(),
            ));
        }

        let forbidden = |c: char| c == ';' || c == '=' || c.is_whitespace();
        if cookie.name.contains(forbidden) || cookie.value.contains(';') {
            return Err(ConfigError::Validation(format!(
                "cookie '{}' contains characters not allowed in a Cookie header",
                cookie.name
            )));
        }
    }

    Ok(())
}

fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    let all_patterns = config
        .relay_domains
        .iter()
        .chain(&config.embed_patterns)
        .chain(&config.player_patterns);

    for pattern in all_patterns {
        if pattern.is_empty() {
            return Err(ConfigError::Validation(
                "classifier patterns cannot be empty strings".to_string(),
            ));
        }
    }

    if config.image_proxy_marker.is_empty() || config.short_video_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "image_proxy_marker and short_video_prefix cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    parse_daily_at(&config.daily_at)?;

    if let Some(minutes) = config.comment_refresh_minutes {
        if minutes < 1 || minutes > MAX_COMMENT_REFRESH_MINUTES {
            return Err(ConfigError::Validation(format!(
                "comment_refresh_minutes must be between 1 and {} when set, got {}",
                MAX_COMMENT_REFRESH_MINUTES, minutes
            )));
        }
    }

    Ok(())
}
