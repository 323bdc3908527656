//! Core type definitions for curated news digests.
//!
//! All types are serializable; a [`CuratedResult`] is the single artifact
//! handed from the generation client to whatever stores it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Field limits
// ---------------------------------------------------------------------------

/// Maximum characters kept from an item title.
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum characters kept from an item summary.
pub const MAX_SUMMARY_CHARS: usize = 1000;

/// Topic labels the instructions suggest to the model. The vocabulary is
/// open: labels outside this list are kept as-is.
pub const SUGGESTED_TOPICS: &[&str] = &[
    "LLM",
    "Funding",
    "Startup",
    "Product Launch",
    "Research",
    "Regulation",
    "Open Source",
];

// ---------------------------------------------------------------------------
// Curated entries
// ---------------------------------------------------------------------------

/// One curated news entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedItem {
    /// Headline of the story.
    pub title: String,
    /// Two-to-three sentence summary.
    pub summary: String,
    /// Publication or outlet the story came from.
    pub source: String,
    /// Origin identifier, normally the article URL. May be empty.
    pub url: String,
    /// Topic labels, de-duplicated, in model order.
    pub topics: Vec<String>,
}

impl CuratedItem {
    /// Build an item, clipping long text and normalising topic labels.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        source: impl Into<String>,
        url: impl Into<String>,
        topics: Vec<String>,
    ) -> Self {
        Self {
            title: clip_chars(title.into().trim(), MAX_TITLE_CHARS),
            summary: clip_chars(summary.into().trim(), MAX_SUMMARY_CHARS),
            source: source.into().trim().to_string(),
            url: url.into().trim().to_string(),
            topics: normalize_topics(topics),
        }
    }

    /// Whether both mandatory fields (title and source) are present.
    #[must_use]
    pub fn has_mandatory_fields(&self) -> bool {
        !self.title.trim().is_empty() && !self.source.trim().is_empty()
    }
}

impl fmt::Display for CuratedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.source)
    }
}

/// A validated batch of curated entries plus a short synopsis.
///
/// Only constructed through [`crate::curation::finalize`], which enforces
/// that `items` is non-empty and within the configured cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedResult {
    /// Ordered entries, model order preserved.
    pub items: Vec<CuratedItem>,
    /// Short free-text synopsis of the batch.
    pub introduction: String,
}

impl CuratedResult {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no entries. Never true for a finalized result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Title of the first entry.
    #[must_use]
    pub fn top_story(&self) -> Option<&str> {
        self.items.first().map(|item| item.title.as_str())
    }

    /// Union of all topic labels, in first-seen order.
    #[must_use]
    pub fn all_topics(&self) -> Vec<String> {
        normalize_topics(
            self.items
                .iter()
                .flat_map(|item| item.topics.iter().cloned())
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Stored record
// ---------------------------------------------------------------------------

/// What gets persisted for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestRecord {
    /// Calendar day the digest covers (UTC).
    pub date: NaiveDate,
    /// When the digest was generated.
    pub generated_at: DateTime<Utc>,
    /// Model that produced it.
    pub model: String,
    /// HTTP attempts the generation took.
    pub attempts: u32,
    /// The validated digest.
    pub digest: CuratedResult,
}

impl DigestRecord {
    /// Wrap a freshly generated digest, dated today (UTC).
    #[must_use]
    pub fn new(digest: CuratedResult, model: impl Into<String>, attempts: u32) -> Self {
        let generated_at = Utc::now();
        Self {
            date: generated_at.date_naive(),
            generated_at,
            model: model.into(),
            attempts,
            digest,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Truncate `text` to at most `max` characters on a char boundary.
#[must_use]
pub fn clip_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Trim labels, drop blanks, and remove case-insensitive duplicates.
fn normalize_topics(topics: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(topics.len());
    for topic in topics {
        let topic = topic.trim();
        if topic.is_empty() {
            continue;
        }
        if out.iter().any(|t| t.eq_ignore_ascii_case(topic)) {
            continue;
        }
        out.push(topic.to_string());
    }
    out
}
