//! Link record definitions
//!
//! A `Link` is the mutable unit of metadata discovered for one listing item.
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of resource a link finally points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    // ===== Initial types, from the listing icon =====
    Video,
    Image,
    Website,
    Audio,
    Game,

    // ===== Types assigned by the classifier =====
    /// `src` holds a YouTube video id, not a URL
    Youtube,
    /// `src` is an embedded frame that is neither a known video host nor a relay
    Iframe,
    /// `src` is a script-driven navigation target
    Redirect,

    #[default]
    Unknown,
}

impl LinkType {
    /// Maps the listing's icon label to the initial link type
    ///
    /// Labels are matched exactly; anything unrecognized becomes `Unknown`.
    pub fn from_icon(icon: &str) -> Self {
        match icon {
            "Film" => Self::Video,
            "Bild" => Self::Image,
            "Hemsida" => Self::Website,
            "Ljud" => Self::Audio,
            "Spel" => Self::Game,
            _ => Self::Unknown,
        }
    }

    /// Returns the string representation used in the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Website => "website",
            Self::Audio => "audio",
            Self::Game => "game",
            Self::Youtube => "youtube",
            Self::Iframe => "iframe",
            Self::Redirect => "redirect",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered listing item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Link {
    pub title: String,

    /// Raw icon label as rendered by the site
    pub icon: String,

    #[serde(rename = "type")]
    pub link_type: LinkType,

    /// Final resource locator; empty until resolution completes
    pub src: String,

    pub comment_url: String,

    /// Comment count exactly as the site renders it
    pub comment_number: String,

    pub nsfw: bool,
}

impl Link {
    /// Creates a link whose type is derived from its icon label
    pub fn from_listing(
        title: impl Into<String>,
        icon: impl Into<String>,
        comment_url: impl Into<String>,
        comment_number: impl Into<String>,
        nsfw: bool,
    ) -> Self {
        let icon = icon.into();
        Self {
            title: title.into(),
            link_type: LinkType::from_icon(&icon),
            icon,
            src: String::new(),
            comment_url: comment_url.into(),
            comment_number: comment_number.into(),
            nsfw,
        }
    }

    /// Returns true once a final source has been assigned
    pub fn is_resolved(&self) -> bool {
        !self.src.is_empty()
    }
}

/// A final source and type produced by the content classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub link_type: LinkType,
    pub src: String,
}

impl Resolution {
    pub fn new(link_type: LinkType, src: impl Into<String>) -> Self {
        Self {
            link_type,
            src: src.into(),
        }
    }
}
