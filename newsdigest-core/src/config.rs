//! Configuration for the newsdigest pipeline.
//!
//! Maps directly to `newsdigest.toml`. Every field has a default, so an
//! empty file is a valid configuration. Credentials are deliberately not part
//! of the file; see [`Credentials`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DigestError, Result};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Generation endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Delegated search tool settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Retry budget and failure classification.
    #[serde(default)]
    pub retry: RetryConfig,
    /// What to curate and how much.
    #[serde(default)]
    pub curation: CurationConfig,
    /// Where digests are written.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl DigestConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `DigestError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| DigestError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    ///
    /// # Errors
    /// Returns `DigestError::Config` naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.curation.max_items == 0 {
            return Err(DigestError::Config("curation.max_items must be positive".into()));
        }
        if self.curation.directives.iter().all(|d| d.trim().is_empty()) {
            return Err(DigestError::Config(
                "curation.directives needs at least one non-empty directive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(DigestError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(DigestError::Config("retry.multiplier must be >= 1.0".into()));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(DigestError::Config("retry.jitter must be within [0, 1]".into()));
        }
        if let Some(code) = self
            .retry
            .rate_limit_statuses
            .iter()
            .find(|c| self.retry.upstream_tool_statuses.contains(c))
        {
            return Err(DigestError::Config(format!(
                "status {code} is listed as both rate-limit and upstream-tool failure"
            )));
        }
        if self.llm.request_timeout_ms == 0 {
            return Err(DigestError::Config("llm.request_timeout_ms must be positive".into()));
        }
        match self.persistence.backend.as_str() {
            "sqlite" | "json" => Ok(()),
            other => Err(DigestError::Config(format!(
                "persistence.backend must be \"sqlite\" or \"json\", got {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error. `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output: "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Generation endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Full URL of the generation endpoint.
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    /// Model variant. Must support remote tool declarations.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Environment variable holding the endpoint credential.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_ms: default_request_timeout(),
            api_key_env: default_llm_key_env(),
        }
    }
}

/// Delegated search tool configuration.
///
/// The search tool is never called directly; these values end up in the
/// tool declaration and in the literal parameters written into the
/// instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Label under which the remote tool server is declared.
    #[serde(default = "default_server_label")]
    pub server_label: String,
    /// Tool server URL. `{api_key}` is replaced with the search credential.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Name of the search function the model is told to call.
    #[serde(default = "default_tool_name")]
    pub tool_name: String,
    /// "basic" or "advanced".
    #[serde(default = "default_search_depth")]
    pub search_depth: String,
    /// Search topic, e.g. "news".
    #[serde(default = "default_search_topic")]
    pub topic: String,
    /// Recency window in days.
    #[serde(default = "default_1")]
    pub days: u32,
    /// Results per search call.
    #[serde(default = "default_15")]
    pub max_results: u32,
    /// Environment variable holding the search credential.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            server_label: default_server_label(),
            server_url: default_server_url(),
            tool_name: default_tool_name(),
            search_depth: default_search_depth(),
            topic: default_search_topic(),
            days: 1,
            max_results: 15,
            api_key_env: default_search_key_env(),
        }
    }
}

/// Retry budget and status-code classification.
///
/// Status codes are configuration because the remote service's error-code
/// semantics may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total HTTP attempts per `curate` call, first attempt included.
    #[serde(default = "default_3")]
    pub max_attempts: u32,
    /// Retries allowed for upstream tool failures within that budget.
    #[serde(default = "default_1")]
    pub upstream_tool_max_retries: u32,
    /// First backoff delay for rate limits, timeouts and tool failures.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Exponential growth factor.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Jitter as a fraction of the delay, in [0, 1].
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// Fixed delay before retrying a malformed answer.
    #[serde(default = "default_malformed_delay")]
    pub malformed_delay_ms: u64,
    /// Statuses meaning "too many requests".
    #[serde(default = "default_rate_limit_statuses")]
    pub rate_limit_statuses: Vec<u16>,
    /// Statuses meaning the delegated tool failed.
    #[serde(default = "default_upstream_statuses")]
    pub upstream_tool_statuses: Vec<u16>,
    /// Whether a per-attempt timeout is retried.
    #[serde(default = "default_true")]
    pub retry_on_timeout: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            upstream_tool_max_retries: 1,
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
            malformed_delay_ms: default_malformed_delay(),
            rate_limit_statuses: default_rate_limit_statuses(),
            upstream_tool_statuses: default_upstream_statuses(),
            retry_on_timeout: true,
        }
    }
}

/// What to curate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationConfig {
    /// Maximum entries in a digest.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Natural-language search directives, combined into one request.
    #[serde(default = "default_directives")]
    pub directives: Vec<String>,
    /// Synopsis used when the model leaves it out.
    #[serde(default = "default_introduction")]
    pub default_introduction: String,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            directives: default_directives(),
            default_introduction: default_introduction(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "sqlite" or "json".
    #[serde(default = "default_sqlite")]
    pub backend: String,
    /// Database file (sqlite) or output directory (json).
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Use WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify a CRC-32 of each record.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_sqlite(),
            path: default_store_path(),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Opaque credentials for the generation endpoint and the search tool.
///
/// Read once at startup and passed to the client by value. Never serialized;
/// `Debug` output is redacted.
#[derive(Clone)]
pub struct Credentials {
    /// Bearer token for the generation endpoint.
    pub llm_api_key: String,
    /// Key embedded in the search tool URL.
    pub search_api_key: String,
}

impl Credentials {
    /// Create credentials from explicit values.
    #[must_use]
    pub fn new(llm_api_key: impl Into<String>, search_api_key: impl Into<String>) -> Self {
        Self {
            llm_api_key: llm_api_key.into(),
            search_api_key: search_api_key.into(),
        }
    }

    /// Read both credentials from the variables named in `config`.
    ///
    /// # Errors
    /// Returns `DigestError::Config` listing every missing variable.
    pub fn from_env(config: &DigestConfig) -> Result<Self> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Same as [`Credentials::from_env`] with an injectable lookup.
    ///
    /// # Errors
    /// Returns `DigestError::Config` listing every missing variable.
    pub fn from_lookup<F>(config: &DigestConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = lookup(&config.llm.api_key_env).filter(|v| !v.trim().is_empty());
        let search = lookup(&config.search.api_key_env).filter(|v| !v.trim().is_empty());

        match (llm, search) {
            (Some(llm), Some(search)) => Ok(Self::new(llm, search)),
            (llm, search) => {
                let mut missing = Vec::new();
                if llm.is_none() {
                    missing.push(config.llm.api_key_env.as_str());
                }
                if search.is_none() {
                    missing.push(config.search.api_key_env.as_str());
                }
                Err(DigestError::Config(format!(
                    "missing environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &"<redacted>")
            .field("search_api_key", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }
fn default_llm_endpoint() -> String { "https://api.groq.com/openai/v1/responses".to_string() }
fn default_model() -> String { "openai/gpt-oss-120b".to_string() }
fn default_llm_key_env() -> String { "GROQ_API_KEY".to_string() }
fn default_server_label() -> String { "tavily".to_string() }
fn default_server_url() -> String { "https://mcp.tavily.com/mcp/?tavilyApiKey={api_key}".to_string() }
fn default_tool_name() -> String { "tavily_search".to_string() }
fn default_search_depth() -> String { "advanced".to_string() }
fn default_search_topic() -> String { "news".to_string() }
fn default_search_key_env() -> String { "TAVILY_API_KEY".to_string() }
fn default_sqlite() -> String { "sqlite".to_string() }
fn default_store_path() -> String { "digests.db".to_string() }
fn default_introduction() -> String {
    "Here's your daily roundup of the most important AI and technology news.".to_string()
}
fn default_directives() -> Vec<String> {
    vec![
        "AI industry news: startup funding rounds, acquisitions, and product launches from AI companies".to_string(),
        "AI technical news: new model releases, research papers, open-source projects, and regulation".to_string(),
    ]
}
fn default_rate_limit_statuses() -> Vec<u16> { vec![429] }
fn default_upstream_statuses() -> Vec<u16> { vec![424, 503] }
fn default_temperature() -> f32 { 0.3 }
fn default_multiplier() -> f64 { 2.0 }
fn default_jitter() -> f64 { 0.25 }
fn default_1() -> u32 { 1 }
fn default_3() -> u32 { 3 }
fn default_15() -> u32 { 15 }
fn default_max_items() -> usize { 10 }
fn default_malformed_delay() -> u64 { 500 }
fn default_base_delay() -> u64 { 2_000 }
fn default_max_delay() -> u64 { 30_000 }
fn default_request_timeout() -> u64 { 60_000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = DigestConfig::from_toml("").expect("parse");
        assert_eq!(config.curation.max_items, 10);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.rate_limit_statuses, vec![429]);
        assert_eq!(config.curation.directives.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sample_config_file_parses() {
        let config = DigestConfig::from_toml(include_str!("../../newsdigest.example.toml"))
            .expect("parse");
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.upstream_tool_statuses, vec![424, 503]);
        assert_eq!(config.search.tool_name, "tavily_search");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = DigestConfig::from_toml(
            r#"
            [retry]
            max_attempts = 5
            upstream_tool_statuses = [502]

            [curation]
            max_items = 7
            "#,
        )
        .expect("parse");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.upstream_tool_statuses, vec![502]);
        assert_eq!(config.retry.base_delay_ms, 2_000);
        assert_eq!(config.curation.max_items, 7);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        assert!(matches!(
            DigestConfig::from_toml("[retry\nmax_attempts = "),
            Err(DigestError::Config(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = DigestConfig::default();
        config.curation.max_items = 0;
        assert!(config.validate().is_err());

        let mut config = DigestConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = DigestConfig::default();
        config.retry.upstream_tool_statuses.push(429);
        assert!(config.validate().is_err());

        let mut config = DigestConfig::default();
        config.curation.directives = vec!["  ".into()];
        assert!(config.validate().is_err());

        let mut config = DigestConfig::default();
        config.persistence.backend = "notion".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_report_all_missing_vars() {
        let config = DigestConfig::default();
        let err = Credentials::from_lookup(&config, |_| None).expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("GROQ_API_KEY"));
        assert!(msg.contains("TAVILY_API_KEY"));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let config = DigestConfig::default();
        let creds = Credentials::from_lookup(&config, |name| Some(format!("secret-{name}")))
            .expect("creds");
        assert_eq!(creds.search_api_key, "secret-TAVILY_API_KEY");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("secret"));
    }
}
