//! Pulling the model's final answer out of a 2xx reply body.
//!
//! Responses-style bodies carry the answer either as a top-level
//! `output_text` or inside the last `message` item of `output[]`; tool-call
//! items precede it. Chat-completions bodies are accepted too.

use serde_json::Value;

use newsdigest_core::curation::RawDigest;

use crate::error::{excerpt, AttemptError};

/// Extract the final answer text from a successful reply body.
///
/// # Errors
///
/// - [`AttemptError::UpstreamToolFailure`] if the body carries an `error`
///   object, or a tool call failed and no answer was produced.
/// - [`AttemptError::MalformedResponse`] if the body is not JSON or holds no
///   answer text.
pub fn extract_final_text(status: u16, body: &str) -> Result<String, AttemptError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        AttemptError::MalformedResponse(format!("reply body is not JSON ({e}): {}", excerpt(body)))
    })?;

    if value.get("error").is_some_and(|e| !e.is_null()) {
        return Err(AttemptError::UpstreamToolFailure {
            status,
            body: excerpt(&value["error"].to_string()),
        });
    }

    if let Some(text) = value.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Ok(text.to_string());
        }
    }

    if let Some(output) = value.get("output").and_then(Value::as_array) {
        if let Some(text) = last_message_text(output) {
            return Ok(text);
        }
        if let Some(err) = output
            .iter()
            .filter(|item| item["type"] == "mcp_call")
            .find_map(|item| item.get("error").filter(|e| !e.is_null()))
        {
            return Err(AttemptError::UpstreamToolFailure {
                status,
                body: excerpt(&err.to_string()),
            });
        }
    }

    if let Some(text) = value["choices"][0]["message"]["content"].as_str() {
        if !text.trim().is_empty() {
            return Ok(text.to_string());
        }
    }

    Err(AttemptError::MalformedResponse(format!(
        "no answer text in reply: {}",
        excerpt(body)
    )))
}

fn last_message_text(output: &[Value]) -> Option<String> {
    let message = output.iter().rev().find(|item| item["type"] == "message")?;
    let text: String = message["content"]
        .as_array()?
        .iter()
        .filter(|part| part["type"] == "output_text")
        .filter_map(|part| part["text"].as_str())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Remove a surrounding Markdown code fence, if any.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Decode answer text into the permissive digest shape.
///
/// Prose around the JSON object is tolerated: if the whole text does not
/// parse, the span from the first `{` to the last `}` is tried.
///
/// # Errors
///
/// [`AttemptError::MalformedResponse`] if no JSON object can be read;
/// [`AttemptError::SchemaValidation`] if it lacks the required `items` array
/// or a field has the wrong type.
pub fn parse_digest(text: &str) -> Result<RawDigest, AttemptError> {
    let stripped = strip_code_fences(text);
    let value = match serde_json::from_str::<Value>(stripped) {
        Ok(v) => v,
        Err(first) => outermost_object(stripped)
            .and_then(|span| serde_json::from_str::<Value>(span).ok())
            .ok_or_else(|| {
                AttemptError::MalformedResponse(format!(
                    "answer is not JSON ({first}): {}",
                    excerpt(text)
                ))
            })?,
    };

    if !value.is_object() {
        return Err(AttemptError::SchemaValidation(format!(
            "expected a JSON object, got: {}",
            excerpt(&value.to_string())
        )));
    }

    serde_json::from_value(value).map_err(|e| AttemptError::SchemaValidation(e.to_string()))
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
