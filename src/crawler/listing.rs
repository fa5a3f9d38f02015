//! Listing page parser
//!
//! The listing interleaves date markers with item blocks:
//!
//! ```html
//! <div class="comment-date">Idag</div>
//! <div class="link">
//!   <img class="type" alt="Film"> <img alt="18+">
//!   <a target="_blank" href="/out/123"><span class="text">Title</span></a>
//!   <span class="comment-info"><a href="/kommentarer/123">4</a></span>
//! </div>
//! ```
//!
//! Every item belongs to the most recent marker above it.

use crate::catalog::Link;
use crate::crawler::resolver::Hop;
use crate::state::{Admission, RunContext};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// One element of the listing, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEntry {
    DateMarker(String),
    Item(ListingItem),
}

/// A listing item and the redirect URL its link points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub link: Link,
    pub redirect_url: Url,
}

struct ItemSelectors {
    title: Selector,
    icon: Selector,
    nsfw: Selector,
    comment: Selector,
    redirect: Selector,
}

impl ItemSelectors {
    fn new() -> Result<Self, String> {
        Ok(Self {
            title: parse_selector(".text")?,
            icon: parse_selector("img.type")?,
            nsfw: parse_selector(r#"img[alt="18+"]"#)?,
            comment: parse_selector(".comment-info a")?,
            redirect: parse_selector(r#"a[target="_blank"]"#)?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{}': {:?}", css, e))
}

/// Parses the listing page into date markers and items
///
/// Items without a redirect link, or whose link cannot be made absolute, are skipped.
/// Marker labels are trimmed; empty markers are ignored.
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `base_url` - The listing page URL, for resolving relative redirect links
pub fn parse_listing(html: &str, base_url: &Url) -> Result<Vec<ListingEntry>, String> {
    let document = Html::parse_document(html);
    let blocks = parse_selector(".comment-date, .link")?;
    let selectors = ItemSelectors::new()?;
    let mut entries = Vec::new();

    for block in document.select(&blocks) {
        if block.value().classes().any(|class| class == "comment-date") {
            let label = element_text(block);
            if !label.is_empty() {
                entries.push(ListingEntry::DateMarker(label));
            }
            continue;
        }

        if let Some(item) = parse_item(block, &selectors, base_url) {
            entries.push(ListingEntry::Item(item));
        }
    }

    Ok(entries)
}

fn parse_item(
    block: ElementRef<'_>,
    selectors: &ItemSelectors,
    base_url: &Url,
) -> Option<ListingItem> {
    let href = child_attr(block, &selectors.redirect, "href");
    if href.is_empty() {
        return None;
    }
    let redirect_url = match base_url.join(&href) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Skipping item with unusable link {}: {}", href, e);
            return None;
        }
    };

    let link = Link::from_listing(
        child_text(block, &selectors.title),
        child_attr(block, &selectors.icon, "alt"),
        child_attr(block, &selectors.comment, "href"),
        child_text(block, &selectors.comment),
        block.select(&selectors.nsfw).next().is_some(),
    );

    Some(ListingItem { link, redirect_url })
}

/// Maps each item's comment URL to its current comment count
///
/// Unlike `parse_listing` this reads every item block, with no item limit.
pub fn comment_counts(html: &str) -> Result<HashMap<String, String>, String> {
    let document = Html::parse_document(html);
    let items = parse_selector(".link")?;
    let comment = parse_selector(".comment-info a")?;

    let mut counts = HashMap::new();
    for item in document.select(&items) {
        let url = child_attr(item, &comment, "href");
        if url.is_empty() {
            continue;
        }
        counts.insert(url, child_text(item, &comment));
    }

    Ok(counts)
}

/// Feeds parsed listing entries into the run's store
///
/// Date markers move the store's date cursor; items are admitted until the item limit
/// is reached. Returns one depth-1 hop per newly registered redirect URL. An item that
/// repeats an earlier item's URL is kept in its date group but gets no hop.
pub fn seed(ctx: &RunContext, entries: Vec<ListingEntry>) -> Vec<Hop> {
    let mut hops = Vec::new();
    let mut limit_logged = false;

    for entry in entries {
        match entry {
            ListingEntry::DateMarker(label) => ctx.store.open_date(&label),
            ListingEntry::Item(item) => {
                match ctx.store.admit(item.link, item.redirect_url.as_str()) {
                    Admission::Admitted(_) => hops.push(Hop {
                        url: item.redirect_url,
                        depth: 1,
                    }),
                    Admission::Duplicate(_) => {
                        tracing::debug!("Item link {} is already queued", item.redirect_url);
                    }
                    Admission::LimitReached => {
                        if !limit_logged {
                            tracing::info!(
                                "Item limit reached, ignoring the rest of the listing"
                            );
                            limit_logged = true;
                        }
                    }
                }
            }
        }
    }

    hops
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn child_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn child_attr(element: ElementRef<'_>, selector: &Selector, attr: &str) -> String {
    element
        .select(selector)
        .next()
        .and_then(|child| child.value().attr(attr))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}
