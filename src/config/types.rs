use serde::Deserialize;

/// Main configuration structure for linkcrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default, rename = "cookie")]
    pub cookies: Vec<CookieEntry>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Listing crawl behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// The listing page every run starts from
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Maximum number of listing items admitted per run
    #[serde(rename = "max-links", default = "default_max_links")]
    pub max_links: usize,

    /// Hop depth limit; the listing page is depth 0 and an item's redirect is depth 1
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum in-flight fetches per host
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Date label used for items listed before the first date marker
    #[serde(rename = "default-date", default = "default_date")]
    pub default_date: String,
}

/// Which fetch implementation carries outbound requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Plain HTTP requests with the configured session cookies
    Direct,
    /// Requests proxied through the challenge-solving relay
    #[default]
    Relay,
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    /// Relay command endpoint (`POST`ed with JSON)
    #[serde(rename = "relay-endpoint", default = "default_relay_endpoint")]
    pub relay_endpoint: String,

    /// `maxTimeout` sent to the relay, in milliseconds
    #[serde(rename = "max-timeout", default = "default_max_timeout")]
    pub max_timeout: u64,

    /// Timeout of direct requests, in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            relay_endpoint: default_relay_endpoint(),
            max_timeout: default_max_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// A session cookie sent with every outbound request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CookieEntry {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the persisted JSON catalog
    #[serde(rename = "catalog-path", default = "default_catalog_path")]
    pub catalog_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
        }
    }
}

/// Substring patterns the content classifier keys on
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Hosts that only wrap the real content in another page
    #[serde(rename = "relay-domains", default = "default_relay_domains")]
    pub relay_domains: Vec<String>,

    #[serde(rename = "embed-patterns", default = "default_embed_patterns")]
    pub embed_patterns: Vec<String>,

    #[serde(rename = "player-patterns", default = "default_player_patterns")]
    pub player_patterns: Vec<String>,

    /// Prefix of the site's own image proxy, which wraps a second absolute URL
    #[serde(rename = "image-proxy-marker", default = "default_image_proxy_marker")]
    pub image_proxy_marker: String,

    #[serde(rename = "short-video-prefix", default = "default_short_video_prefix")]
    pub short_video_prefix: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            relay_domains: default_relay_domains(),
            embed_patterns: default_embed_patterns(),
            player_patterns: default_player_patterns(),
            image_proxy_marker: default_image_proxy_marker(),
            short_video_prefix: default_short_video_prefix(),
        }
    }
}

/// Periodic runs in `serve` mode
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily scrape, `HH:MM`
    #[serde(rename = "daily-at", default = "default_daily_at")]
    pub daily_at: String,

    /// Interval of the comment refresher; unset disables it
    #[serde(rename = "comment-refresh-minutes", default)]
    pub comment_refresh_minutes: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_at: default_daily_at(),
            comment_refresh_minutes: None,
        }
    }
}

/// Serving API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(rename = "static-dir", default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
        }
    }
}

impl ScraperConfig {
    /// Scraper settings for `listing_url` with every other field at its default
    pub fn for_listing(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
            max_links: default_max_links(),
            max_depth: default_max_depth(),
            parallelism: default_parallelism(),
            user_agent: default_user_agent(),
            default_date: default_date(),
        }
    }
}

impl Config {
    /// A configuration for `listing_url` with defaults everywhere else
    pub fn for_listing(listing_url: impl Into<String>) -> Self {
        Self {
            scraper: ScraperConfig::for_listing(listing_url),
            transport: TransportConfig::default(),
            cookies: Vec::new(),
            output: OutputConfig::default(),
            classifier: ClassifierConfig::default(),
            schedule: ScheduleConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

fn default_max_links() -> usize {
    15
}

fn default_max_depth() -> u32 {
    2
}

fn default_parallelism() -> usize {
    2
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36".to_string()
}

fn default_date() -> String {
    "Idag".to_string()
}

fn default_relay_endpoint() -> String {
    "http://flaresolverr:8191/v1".to_string()
}

fn default_max_timeout() -> u64 {
    60_000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_catalog_path() -> String {
    "links.json".to_string()
}

fn default_relay_domains() -> Vec<String> {
    vec!["funfunfun.se".to_string(), "snuskhummer.com".to_string()]
}

fn default_embed_patterns() -> Vec<String> {
    vec![
        "youtube.com/embed/".to_string(),
        "youtube.com/watch?v=".to_string(),
    ]
}

fn default_player_patterns() -> Vec<String> {
    vec!["player.vimeo.com/video/".to_string()]
}

fn default_image_proxy_marker() -> String {
    "https://existenz.se/amedia/?typ=bild&url=".to_string()
}

fn default_short_video_prefix() -> String {
    "https://www.youtube.com/shorts/".to_string()
}

fn default_daily_at() -> String {
    "00:10".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_static_dir() -> String {
    "ui".to_string()
}
