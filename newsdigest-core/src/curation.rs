//! Curation rules applied to a parsed model answer.
//!
//! The model's answer is first decoded into the permissive [`RawDigest`]
//! shape (every field optional) so that one bad entry never invalidates the
//! whole batch. [`finalize`] then turns it into a [`CuratedResult`]:
//!
//! 1. drop repeated URLs (first complete entry wins; an entry without a
//!    title or a source never claims its URL),
//! 2. keep the first `max_items` entries in model order,
//! 3. discard entries without a title or a source,
//! 4. fail with [`DigestError::EmptyResult`] if nothing is left.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DigestError, Result};
use crate::types::{CuratedItem, CuratedResult};

/// Answer schema as emitted by the model, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDigest {
    /// Batch synopsis. Missing or blank falls back to the configured default.
    #[serde(default)]
    pub introduction: Option<String>,
    /// Entries in model order.
    #[serde(alias = "articles", alias = "stories")]
    pub items: Vec<RawItem>,
}

/// One entry as emitted by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    /// Headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Summary text.
    #[serde(default)]
    pub summary: Option<String>,
    /// Outlet name.
    #[serde(default)]
    pub source: Option<String>,
    /// Article URL.
    #[serde(default, alias = "link")]
    pub url: Option<String>,
    /// Topic labels.
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

impl RawItem {
    fn into_item(self) -> CuratedItem {
        CuratedItem::new(
            self.title.unwrap_or_default(),
            self.summary.unwrap_or_default(),
            self.source.unwrap_or_default(),
            self.url.unwrap_or_default(),
            self.topics.unwrap_or_default(),
        )
    }
}

/// Validate and shape a raw answer into a [`CuratedResult`].
///
/// `fallback_introduction` is used when the model omits the synopsis.
///
/// # Errors
///
/// Returns [`DigestError::Config`] if `max_items` is zero, or
/// [`DigestError::EmptyResult`] if no entry survives.
pub fn finalize(
    raw: RawDigest,
    max_items: usize,
    fallback_introduction: &str,
) -> Result<CuratedResult> {
    if max_items == 0 {
        return Err(DigestError::Config("max_items must be positive".into()));
    }

    let received = raw.items.len();
    let unique = dedupe_by_url(raw.items.into_iter().map(RawItem::into_item).collect());
    let duplicates = received - unique.len();

    let kept = truncate_in_order(unique, max_items);
    let before_filter = kept.len();
    let items: Vec<CuratedItem> = kept
        .into_iter()
        .filter(CuratedItem::has_mandatory_fields)
        .collect();
    let discarded = before_filter - items.len();

    debug!(
        received,
        duplicates,
        discarded,
        kept = items.len(),
        max_items,
        "Curation applied"
    );

    if items.is_empty() {
        return Err(DigestError::EmptyResult {
            received,
            discarded,
        });
    }

    let introduction = raw
        .introduction
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_introduction.to_string());

    Ok(CuratedResult {
        items,
        introduction,
    })
}

/// Keep the first `max` entries, preserving their order.
#[must_use]
pub fn truncate_in_order<T>(mut items: Vec<T>, max: usize) -> Vec<T> {
    items.truncate(max);
    items
}

/// Drop entries whose URL was already claimed by an earlier complete entry.
/// Entries without a URL are kept, and incomplete entries pass through
/// without claiming theirs.
#[must_use]
pub fn dedupe_by_url(items: Vec<CuratedItem>) -> Vec<CuratedItem> {
    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| {
            let key = url_key(&item.url);
            if key.is_empty() || !item.has_mandatory_fields() {
                return true;
            }
            if seen.contains(&key) {
                return false;
            }
            seen.push(key);
            true
        })
        .collect()
}

fn url_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}
