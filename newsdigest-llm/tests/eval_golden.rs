//! Prompt golden set.
//!
//! Each case renders the curation instructions for one search setup and
//! checks that the literal tool parameters and the answer schema reach the
//! model verbatim. Unfilled placeholders are a bug: the model would see
//! `{tool_name}` instead of a tool it can call.

use newsdigest_core::config::SearchConfig;
use newsdigest_llm::prompt::{self, build_instructions};

/// A golden case for instruction rendering.
struct GoldenCase {
    /// Human-readable name for the case.
    name: &'static str,
    /// Search settings to render with.
    search: SearchConfig,
    /// Directives passed to `curate`.
    directives: Vec<&'static str>,
    /// Requested item cap.
    max_items: usize,
    /// Strings that MUST appear in the rendered instructions.
    must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear.
    must_not_contain: Vec<&'static str>,
}

const PLACEHOLDERS: [&str; 9] = [
    "{server_label}",
    "{tool_name}",
    "{search_depth}",
    "{topic}",
    "{days}",
    "{max_results}",
    "{directives}",
    "{max_items}",
    "{topics}",
];

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. Default daily run
        // ---------------------------------------------------------------
        GoldenCase {
            name: "default_daily_digest",
            search: SearchConfig::default(),
            directives: vec![
                "AI industry news: funding rounds, acquisitions, product launches",
                "AI research news: new models, papers, benchmarks",
            ],
            max_items: 10,
            must_contain: vec![
                "You MUST use its tavily_search tool",
                "search_depth: \"advanced\"",
                "topic: \"news\"",
                "days: 1",
                "max_results: 15",
                "1. AI industry news",
                "2. AI research news",
                "select the 10 most significant stories",
                "\"introduction\": \"2-3 sentence overview\"",
                "Never invent URLs",
            ],
            must_not_contain: vec!["{{", "}}"],
        },
        // ---------------------------------------------------------------
        // 2. Weekly roundup with a wider window
        // ---------------------------------------------------------------
        GoldenCase {
            name: "weekly_roundup_basic_depth",
            search: SearchConfig {
                search_depth: "basic".into(),
                days: 7,
                max_results: 25,
                ..SearchConfig::default()
            },
            directives: vec!["open-source model releases"],
            max_items: 5,
            must_contain: vec![
                "search_depth: \"basic\"",
                "days: 7",
                "max_results: 25",
                "1. open-source model releases",
                "select the 5 most significant stories",
            ],
            must_not_contain: vec!["2. "],
        },
        // ---------------------------------------------------------------
        // 3. Different tool server
        // ---------------------------------------------------------------
        GoldenCase {
            name: "custom_tool_server",
            search: SearchConfig {
                server_label: "websearch".into(),
                tool_name: "web_search".into(),
                topic: "general".into(),
                ..SearchConfig::default()
            },
            directives: vec!["robotics startups", "", "chip export rules"],
            max_items: 8,
            must_contain: vec![
                "the websearch tool server",
                "Run one web_search call per search directive",
                "topic: \"general\"",
                "1. robotics startups\n2. chip export rules",
            ],
            must_not_contain: vec!["tavily", "3. "],
        },
    ]
}

// ---------------------------------------------------------------------------
// Offline checks
// ---------------------------------------------------------------------------

#[test]
fn golden_instructions_render_correctly() {
    for case in golden_cases() {
        let directives: Vec<String> = case.directives.iter().map(|d| (*d).to_string()).collect();
        let rendered = build_instructions(&case.search, &directives, case.max_items);

        for needle in &case.must_contain {
            assert!(
                rendered.contains(needle),
                "[{}] missing expected text {needle:?}\n---\n{rendered}",
                case.name
            );
        }
        for needle in case.must_not_contain.iter().chain(PLACEHOLDERS.iter()) {
            assert!(
                !rendered.contains(needle),
                "[{}] contains forbidden text {needle:?}",
                case.name
            );
        }
    }
}

#[test]
fn templates_only_use_known_placeholders() {
    for template in [prompt::CURATION_SYSTEM, prompt::CURATION_USER] {
        let unescaped = template.replace("{{", "").replace("}}", "");
        let mut rest = unescaped.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                panic!("unterminated placeholder in template");
            };
            let placeholder = &rest[start..=start + len];
            assert!(
                PLACEHOLDERS.contains(&placeholder),
                "unknown placeholder {placeholder}"
            );
            rest = &rest[start + len + 1..];
        }
    }
}

#[test]
fn answer_schema_example_is_valid_json() {
    let rendered = build_instructions(&SearchConfig::default(), &["x".to_string()], 3);
    let schema_line = rendered
        .lines()
        .find(|l| l.starts_with("{\"introduction\""))
        .expect("schema example line");
    let value: serde_json::Value = serde_json::from_str(schema_line).expect("valid JSON");
    assert!(value["items"].is_array());
}
