//! Content classifier for redirect pages
//!
//! A redirect page hides its real target in one of a few places. Rules are applied in
//! a fixed priority order and the first one that yields a source wins:
//!
//! 1. Embedded frames: relay-domain frames become further hops, any other frame is the
//!    source (`youtube`, `video` or `iframe` by host)
//! 2. `videoId: '<id>'` in a script (`youtube`)
//! 3. Countdown redirect `top.location.href = '<dest>'`: the site's image proxy is
//!    unwrapped to the embedded image URL (`image`), relay-domain targets become hops,
//!    anything else is a `redirect`
//! 4. Bare `top.location = '<dest>'`: short-video URLs become a video id (`youtube`),
//!    anything else is a `redirect`
//!
//! Each rule is a small extractor returning an `Extraction`, so rules can be tested on
//! their own.

use crate::catalog::{LinkType, Resolution};
use crate::config::ClassifierConfig;
use scraper::{Html, Selector};
use url::Url;

/// What one rule found in one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    NoMatch,
    /// A secondary relay page that has to be fetched before anything is known
    Hop(Url),
    /// A frame source and the type derived from its host
    Embed { src: String, link_type: LinkType },
    VideoId(String),
    /// An image unwrapped from the site's image proxy
    Image(String),
    Redirect(String),
}

impl Extraction {
    /// The source/type this extraction assigns, if any
    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            Self::NoMatch | Self::Hop(_) => None,
            Self::Embed { src, link_type } => Some(Resolution::new(*link_type, src.clone())),
            Self::VideoId(id) => Some(Resolution::new(LinkType::Youtube, id.clone())),
            Self::Image(src) => Some(Resolution::new(LinkType::Image, src.clone())),
            Self::Redirect(src) => Some(Resolution::new(LinkType::Redirect, src.clone())),
        }
    }
}

/// Everything a page contributed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Further pages to visit, in document order, without duplicates
    pub hops: Vec<Url>,

    /// Highest-priority resolution found on the page
    pub resolution: Option<Resolution>,
}

impl Classification {
    fn absorb(&mut self, extraction: Extraction) {
        match extraction {
            Extraction::NoMatch => {}
            Extraction::Hop(url) => {
                if !self.hops.contains(&url) {
                    self.hops.push(url);
                }
            }
            other => {
                if self.resolution.is_none() {
                    self.resolution = other.resolution();
                }
            }
        }
    }
}

/// Applies the classification rules with a set of site patterns
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: ClassifierConfig,
}

impl Classifier {
    pub fn new(rules: ClassifierConfig) -> Self {
        Self { rules }
    }

    /// Classifies a fetched redirect page
    ///
    /// # Arguments
    ///
    /// * `html` - The page body
    /// * `base_url` - URL the page was served from; relative frame and hop URLs resolve
    ///   against it
    pub fn classify(&self, html: &str, base_url: &Url) -> Classification {
        let document = Html::parse_document(html);
        let mut classification = Classification::default();

        if let Ok(frame_selector) = Selector::parse("iframe[src]") {
            for frame in document.select(&frame_selector) {
                if let Some(src) = frame.value().attr("src") {
                    classification.absorb(self.frame_rule(src, base_url));
                }
            }
        }

        let scripts: Vec<String> = match Selector::parse("script") {
            Ok(script_selector) => document
                .select(&script_selector)
                .map(|script| script.text().collect::<String>())
                .collect(),
            Err(_) => Vec::new(),
        };

        for script in &scripts {
            classification.absorb(self.video_id_rule(script));
        }
        for script in &scripts {
            classification.absorb(self.countdown_rule(script, base_url));
        }
        for script in &scripts {
            classification.absorb(self.top_location_rule(script));
        }

        classification
    }

    /// Rule 1: an embedded frame's source
    pub fn frame_rule(&self, src: &str, base_url: &Url) -> Extraction {
        let src = src.trim();
        if src.is_empty() {
            return Extraction::NoMatch;
        }
        let Ok(absolute) = base_url.join(src) else {
            return Extraction::NoMatch;
        };

        if self.is_relay(absolute.as_str()) {
            return Extraction::Hop(absolute);
        }

        let src = absolute.to_string();
        let link_type = if contains_any(&src, &self.rules.embed_patterns) {
            LinkType::Youtube
        } else if contains_any(&src, &self.rules.player_patterns) {
            LinkType::Video
        } else {
            LinkType::Iframe
        };

        Extraction::Embed { src, link_type }
    }

    /// Rule 2: a player configuration carrying a video id
    pub fn video_id_rule(&self, script: &str) -> Extraction {
        match quoted_value(script, "videoId", ':') {
            Some(id) => Extraction::VideoId(id.to_string()),
            None => Extraction::NoMatch,
        }
    }

    /// Rule 3: a countdown that navigates the top frame
    pub fn countdown_rule(&self, script: &str, base_url: &Url) -> Extraction {
        let Some(destination) = quoted_value(script, "top.location.href", '=') else {
            return Extraction::NoMatch;
        };

        if let Some(image) = self.unwrap_image_proxy(destination) {
            return Extraction::Image(image.to_string());
        }

        if self.is_relay(destination) {
            return match base_url.join(destination) {
                Ok(absolute) => Extraction::Hop(absolute),
                Err(_) => Extraction::NoMatch,
            };
        }

        Extraction::Redirect(destination.to_string())
    }

    /// Rule 4: a bare top-frame navigation
    pub fn top_location_rule(&self, script: &str) -> Extraction {
        let Some(destination) = quoted_value(script, "top.location", '=') else {
            return Extraction::NoMatch;
        };

        let prefix = self.rules.short_video_prefix.as_str();
        if let Some(start) = destination.find(prefix) {
            let id = &destination[start + prefix.len()..];
            if !id.is_empty() {
                return Extraction::VideoId(id.to_string());
            }
        }

        Extraction::Redirect(destination.to_string())
    }

    /// Returns the second absolute URL of a doubly-wrapped image-proxy URL
    fn unwrap_image_proxy<'a>(&self, destination: &'a str) -> Option<&'a str> {
        let marker = self.rules.image_proxy_marker.as_str();
        let start = destination.find(marker)? + marker.len();
        let inner = &destination[start..];

        match Url::parse(inner) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(inner),
            _ => None,
        }
    }

    fn is_relay(&self, url: &str) -> bool {
        contains_any(url, &self.rules.relay_domains)
    }
}

fn contains_any(haystack: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pattern| haystack.contains(pattern.as_str()))
}

/// Finds the first non-empty quoted string assigned to `key`
///
/// Matches `key`, optional whitespace, `separator`, optional whitespace, then a single-
/// or double-quoted string. Occurrences of `key` that are not followed by `separator`
/// (e.g. `top.location.href` when looking for `top.location`) are skipped.
pub fn quoted_value<'a>(text: &'a str, key: &str, separator: char) -> Option<&'a str> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find(key) {
        let after_key = search_from + offset + key.len();
        if let Some(value) = quoted_after(&text[after_key..], separator) {
            if !value.is_empty() {
                return Some(value);
            }
        }
        search_from = after_key;
    }

    None
}

fn quoted_after(rest: &str, separator: char) -> Option<&str> {
    let rest = rest.trim_start().strip_prefix(separator)?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &rest[quote.len_utf8()..];
    let end = body.find(quote)?;
    Some(&body[..end])
}
