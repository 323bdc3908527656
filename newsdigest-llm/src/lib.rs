//! # newsdigest-llm: tool-augmented generation client
//!
//! Sends one instruction to a remote model that is allowed to call a
//! declared search tool server, then turns the model's final answer into a
//! validated [`newsdigest_core::CuratedResult`].
//!
//! The remote side runs the tool round-trips; this crate sees one HTTP
//! request and one reply per attempt. Around that exchange it provides:
//!   - explicit tool instructions with literal parameters ([`prompt`])
//!   - failure classification and jittered backoff ([`retry`])
//!   - answer extraction tolerant of fences and prose ([`answer`])
//!   - a typed failure taxonomy ([`error`])
//!
//! # Attempt lifecycle
//!
//! ```text
//! Idle -> Requesting -> Succeeded
//!              |  ^
//!              v  |  (backoff)
//!            Retrying -> Failed (budget spent or fatal cause)
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod answer;
pub mod client;
pub mod error;
pub mod metrics;
pub mod prompt;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::{Curated, CurationClient};
pub use error::{AttemptError, CurateError, FailureKind};
pub use metrics::{CounterSnapshot, CurationCounters};
pub use retry::RetryPolicy;
pub use transport::{ReqwestTransport, Transport};
pub use types::{GenerationRequest, HttpReply, ToolSpec};
