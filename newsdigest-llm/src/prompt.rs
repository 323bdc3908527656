//! Instruction templates for the curation request.
//!
//! Tool usage is spelled out with literal parameters instead of being left
//! to the model's discretion: under-specified instructions make tool calls
//! unreliable.

use newsdigest_core::config::SearchConfig;
use newsdigest_core::types::SUGGESTED_TOPICS;

/// Role and output rules.
pub const CURATION_SYSTEM: &str = r"You are a tech news editor producing a daily AI news digest.
You have access to the {server_label} tool server. You MUST use its {tool_name} tool to find news; do not rely on prior knowledge.

RULES:
- Only include stories returned by the search tool within the recency window.
- Never invent URLs, titles or sources.
- Merge duplicates: the same story from several outlets appears once.
- Your final answer must be a single JSON object and nothing else.";

/// Task description with literal tool parameters and the answer schema.
pub const CURATION_USER: &str = r#"Run one {tool_name} call per search directive below, each with exactly these parameters:
  query: <the directive>
  search_depth: "{search_depth}"
  topic: "{topic}"
  days: {days}
  max_results: {max_results}

Search directives:
{directives}

From the combined results, select the {max_items} most significant stories, most important first.
For each story write a concise 2-3 sentence summary and label it with one or more topics, preferably from: {topics}.
Then write a 2-3 sentence introduction highlighting the main theme of the day.

Respond with JSON only, in exactly this shape:
{{"introduction": "2-3 sentence overview", "items": [{{"title": "headline", "summary": "2-3 sentences", "source": "outlet name", "url": "https://...", "topics": ["Topic1", "Topic2"]}}]}}"#;

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value; `{{` and `}}` become
/// literal braces. The template is scanned once, so substituted values are
/// copied verbatim even when they contain braces or placeholder names.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(|c| c == '{' || c == '}') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            result.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        let substituted = tail.strip_prefix('{').and_then(|inner| {
            let end = inner.find('}')?;
            let (_, value) = vars.iter().find(|(key, _)| *key == &inner[..end])?;
            Some((value, &inner[end + 1..]))
        });
        match substituted {
            Some((value, after)) => {
                result.push_str(value);
                rest = after;
            }
            None => {
                result.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Render the full instruction text for one curation request.
///
/// Blank directives are skipped; the rest are numbered in the given order.
#[must_use]
pub fn build_instructions(search: &SearchConfig, directives: &[String], max_items: usize) -> String {
    let directive_list = directives
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .enumerate()
        .map(|(i, d)| format!("{}. {d}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let days = search.days.to_string();
    let max_results = search.max_results.to_string();
    let max_items = max_items.to_string();
    let topics = SUGGESTED_TOPICS.join(", ");

    let vars: [(&str, &str); 9] = [
        ("server_label", &search.server_label),
        ("tool_name", &search.tool_name),
        ("search_depth", &search.search_depth),
        ("topic", &search.topic),
        ("days", &days),
        ("max_results", &max_results),
        ("directives", &directive_list),
        ("max_items", &max_items),
        ("topics", &topics),
    ];

    format!(
        "{}\n\n{}",
        render_template(CURATION_SYSTEM, &vars),
        render_template(CURATION_USER, &vars)
    )
}
