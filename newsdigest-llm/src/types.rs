//! Request and reply types for the generation endpoint.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use newsdigest_core::config::{LlmConfig, SearchConfig};

/// Whether the model may call a declared tool without human confirmation.
/// The pipeline runs unattended, so tool calls are always auto-approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalPolicy {
    /// The model calls the tool freely.
    #[default]
    Never,
}

impl Serialize for ApprovalPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Never => serializer.serialize_str("never"),
        }
    }
}

/// Declaration of one remote tool server the model may use.
#[derive(Clone)]
pub struct ToolSpec {
    /// Label the model sees for the server.
    pub server_label: String,
    /// Server endpoint. Embeds the search credential; redacted in `Debug`.
    pub server_url: String,
    /// Approval policy for calls.
    pub require_approval: ApprovalPolicy,
}

impl ToolSpec {
    /// Build the declaration from config, substituting `{api_key}`.
    #[must_use]
    pub fn from_config(search: &SearchConfig, search_api_key: &str) -> Self {
        Self {
            server_label: search.server_label.clone(),
            server_url: search.server_url.replace("{api_key}", search_api_key),
            require_approval: ApprovalPolicy::Never,
        }
    }

    /// Wire form of the declaration.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "type": "mcp",
            "server_label": self.server_label,
            "server_url": self.server_url,
            "require_approval": self.require_approval,
        })
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("server_label", &self.server_label)
            .field("server_url", &"<redacted>")
            .field("require_approval", &self.require_approval)
            .finish()
    }
}

/// One request to the generation endpoint. Built fresh per `curate` call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Task text including the literal tool parameters.
    pub instructions: String,
    /// The single declared tool.
    pub tool_spec: ToolSpec,
    /// Model variant; must support tool declarations.
    pub model_id: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl GenerationRequest {
    /// Create a request with settings taken from `llm`.
    #[must_use]
    pub fn new(instructions: impl Into<String>, tool_spec: ToolSpec, llm: &LlmConfig) -> Self {
        Self {
            instructions: instructions.into(),
            tool_spec,
            model_id: llm.model.clone(),
            temperature: llm.temperature,
            timeout: Duration::from_millis(llm.request_timeout_ms),
        }
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// JSON body POSTed on every attempt.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({
            "model": self.model_id,
            "input": self.instructions,
            "tools": [self.tool_spec.to_json()],
            "temperature": self.temperature,
        })
    }
}

/// Raw HTTP reply as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
    /// Parsed `Retry-After` header, if any.
    pub retry_after: Option<Duration>,
}

impl HttpReply {
    /// Reply with a status and body and no `Retry-After`.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
