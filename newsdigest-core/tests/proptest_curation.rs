//! Property-based tests for curation invariants.
//!
//! Whatever the model sends, a finalized digest is non-empty, capped,
//! free of entries without title/source, and keeps model order.

use proptest::prelude::*;

use newsdigest_core::curation::{finalize, truncate_in_order, RawDigest, RawItem};
use newsdigest_core::DigestError;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("   ".to_string())),
        "[a-z]{1,12}".prop_map(Some),
    ]
}

fn arb_item(index: usize) -> impl Strategy<Value = RawItem> {
    (arb_field(), arb_field(), any::<bool>()).prop_map(move |(title, source, dup)| {
        // A few entries share a URL so de-duplication is exercised.
        let url = if dup {
            "https://example.com/shared".to_string()
        } else {
            format!("https://example.com/{index}")
        };
        RawItem {
            // Blank titles stay blank so the mandatory-field filter sees them.
            title: title.map(|t| {
                if t.trim().is_empty() {
                    t
                } else {
                    format!("{index}-{t}")
                }
            }),
            summary: Some("summary".into()),
            source,
            url: Some(url),
            topics: None,
        }
    })
}

fn arb_digest() -> impl Strategy<Value = RawDigest> {
    (0usize..30)
        .prop_flat_map(|n| (0..n).map(arb_item).collect::<Vec<_>>())
        .prop_map(|items| RawDigest {
            introduction: Some("intro".into()),
            items,
        })
}

// ---------------------------------------------------------------------------
// Property: success is non-empty and capped
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn success_is_non_empty_and_capped(digest in arb_digest(), max in 1usize..15) {
        match finalize(digest, max, "fallback") {
            Ok(result) => {
                prop_assert!(!result.items.is_empty());
                prop_assert!(result.items.len() <= max);
            }
            Err(DigestError::EmptyResult { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Property: every kept entry has a title and a source
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn kept_entries_have_mandatory_fields(digest in arb_digest(), max in 1usize..15) {
        if let Ok(result) = finalize(digest, max, "fallback") {
            for item in &result.items {
                prop_assert!(!item.title.trim().is_empty());
                prop_assert!(!item.source.trim().is_empty());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: model order is preserved
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn model_order_preserved(digest in arb_digest(), max in 1usize..15) {
        if let Ok(result) = finalize(digest, max, "fallback") {
            // Titles are prefixed with their model index.
            let indices: Vec<usize> = result
                .items
                .iter()
                .filter_map(|item| item.title.split('-').next()?.parse().ok())
                .collect();
            prop_assert_eq!(indices.len(), result.items.len());
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: truncation is idempotent
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn truncation_idempotent(values in prop::collection::vec(any::<u32>(), 0..40), max in 0usize..20) {
        let once = truncate_in_order(values.clone(), max);
        let twice = truncate_in_order(once.clone(), max);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(&once[..], &values[..once.len()]);
    }

    #[test]
    fn finalize_is_idempotent(digest in arb_digest(), max in 1usize..15) {
        if let Ok(first) = finalize(digest, max, "fallback") {
            let again = RawDigest {
                introduction: Some(first.introduction.clone()),
                items: first
                    .items
                    .iter()
                    .map(|item| RawItem {
                        title: Some(item.title.clone()),
                        summary: Some(item.summary.clone()),
                        source: Some(item.source.clone()),
                        url: Some(item.url.clone()),
                        topics: Some(item.topics.clone()),
                    })
                    .collect(),
            };
            let second = finalize(again, max, "fallback").expect("already valid");
            prop_assert_eq!(first, second);
        }
    }
}
