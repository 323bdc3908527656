//! Curation error types.
//!
//! [`AttemptError`] describes why one HTTP attempt failed. [`CurateError`]
//! is what a caller of `curate` sees: retryable causes never reach it
//! unless the attempt budget ran out.

use std::fmt;

use thiserror::Error;

use newsdigest_core::DigestError;

/// Longest response excerpt kept in an error message.
const BODY_EXCERPT_CHARS: usize = 300;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Remote signalled "too many requests".
    #[error("rate limited (HTTP {status}): {body}")]
    RateLimited {
        /// HTTP status.
        status: u16,
        /// Response excerpt.
        body: String,
    },

    /// The delegated search tool failed on the remote side.
    #[error("upstream tool failure (HTTP {status}): {body}")]
    UpstreamToolFailure {
        /// HTTP status.
        status: u16,
        /// Response excerpt.
        body: String,
    },

    /// HTTP succeeded but the answer is not usable JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The answer is JSON but does not match the digest schema.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// The per-attempt timeout elapsed.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Any other HTTP status or transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl AttemptError {
    /// Taxonomy entry for this cause.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::UpstreamToolFailure { .. } => FailureKind::UpstreamToolFailure,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::SchemaValidation(_) => FailureKind::SchemaValidationFailure,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Transport(_) => FailureKind::TransportError,
        }
    }

    /// Build a [`AttemptError::Transport`] for an unexpected HTTP status.
    #[must_use]
    pub fn http_status(status: u16, body: &str) -> Self {
        Self::Transport(format!("HTTP {status}: {}", excerpt(body)))
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Timeout(0)
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

/// Terminal failure of a `curate` call.
#[derive(Debug, Error)]
pub enum CurateError {
    /// A non-retryable cause ended the call.
    #[error("curation failed on attempt {attempts}: {cause}")]
    Fatal {
        /// Attempts made, the failing one included.
        attempts: u32,
        /// The cause.
        cause: AttemptError,
    },

    /// Every allowed attempt failed with a retryable cause.
    #[error("all {attempts} curation attempts failed; last cause: {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Cause of the final attempt.
        last: AttemptError,
    },

    /// The answer parsed but no usable entry survived curation.
    #[error("curation produced no usable entries after {attempts} attempt(s): {received} received, {discarded} discarded")]
    EmptyResult {
        /// Attempts made.
        attempts: u32,
        /// Entries the model returned.
        received: usize,
        /// Entries dropped for missing title or source.
        discarded: usize,
    },

    /// The call was rejected before any attempt.
    #[error("invalid curation request: {0}")]
    Config(String),
}

impl CurateError {
    /// Taxonomy entry for this failure.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fatal { cause, .. } => cause.kind(),
            Self::RetriesExhausted { .. } => FailureKind::RetriesExhausted,
            Self::EmptyResult { .. } => FailureKind::EmptyResult,
            Self::Config(_) => FailureKind::Config,
        }
    }

    /// HTTP attempts made before the failure.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Fatal { attempts, .. }
            | Self::RetriesExhausted { attempts, .. }
            | Self::EmptyResult { attempts, .. } => *attempts,
            Self::Config(_) => 0,
        }
    }

    /// The underlying per-attempt cause, if there is one.
    #[must_use]
    pub fn last_cause(&self) -> Option<&AttemptError> {
        match self {
            Self::Fatal { cause, .. } => Some(cause),
            Self::RetriesExhausted { last, .. } => Some(last),
            Self::EmptyResult { .. } | Self::Config(_) => None,
        }
    }

    /// Map a curation-rule error from the core crate.
    #[must_use]
    pub fn from_digest(err: DigestError, attempts: u32) -> Self {
        match err {
            DigestError::EmptyResult {
                received,
                discarded,
            } => Self::EmptyResult {
                attempts,
                received,
                discarded,
            },
            other => Self::Config(other.to_string()),
        }
    }
}

/// Error taxonomy reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Too many requests.
    RateLimited,
    /// Delegated tool failed.
    UpstreamToolFailure,
    /// Answer not parseable.
    MalformedResponse,
    /// Fatal HTTP status or transport failure.
    TransportError,
    /// Answer did not match the schema.
    SchemaValidationFailure,
    /// Per-attempt timeout.
    Timeout,
    /// Budget exhausted on retryable causes.
    RetriesExhausted,
    /// No usable entries.
    EmptyResult,
    /// Rejected before any attempt.
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "RateLimited",
            Self::UpstreamToolFailure => "UpstreamToolFailure",
            Self::MalformedResponse => "MalformedResponse",
            Self::TransportError => "TransportError",
            Self::SchemaValidationFailure => "SchemaValidationFailure",
            Self::Timeout => "Timeout",
            Self::RetriesExhausted => "RetriesExhausted",
            Self::EmptyResult => "EmptyResult",
            Self::Config => "Config",
        };
        write!(f, "{name}")
    }
}

/// Trim a response body for inclusion in an error.
#[must_use]
pub fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
