//! Curation client: one tool-augmented generation request, retried within a
//! fixed attempt budget, validated into a [`CuratedResult`].

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use newsdigest_core::config::{DigestConfig, LlmConfig, SearchConfig};
use newsdigest_core::curation::{self, RawDigest};
use newsdigest_core::{Credentials, CuratedResult};

use crate::answer::{extract_final_text, parse_digest};
use crate::error::{AttemptError, CurateError, FailureKind};
use crate::metrics::CurationCounters;
use crate::prompt::build_instructions;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{GenerationRequest, ToolSpec};

/// A successful `curate` call.
#[derive(Debug, Clone)]
pub struct Curated {
    /// The validated digest.
    pub digest: CuratedResult,
    /// HTTP attempts it took, the successful one included.
    pub attempts: u32,
    /// Model that produced it.
    pub model: String,
    /// Wall-clock time including backoff sleeps.
    pub latency_ms: u64,
}

/// A failed attempt plus the server's pacing hint.
struct FailedAttempt {
    cause: AttemptError,
    retry_after: Option<Duration>,
}

impl From<AttemptError> for FailedAttempt {
    fn from(cause: AttemptError) -> Self {
        Self {
            cause,
            retry_after: None,
        }
    }
}

/// Client for the tool-augmented generation endpoint.
pub struct CurationClient {
    transport: Arc<dyn Transport>,
    llm: LlmConfig,
    search: SearchConfig,
    policy: RetryPolicy,
    credentials: Credentials,
    default_introduction: String,
    counters: Arc<CurationCounters>,
}

impl CurationClient {
    /// Create a client talking HTTP through `reqwest`.
    #[must_use]
    pub fn new(config: &DigestConfig, credentials: Credentials) -> Self {
        Self::with_transport(config, credentials, Arc::new(ReqwestTransport::new()))
    }

    /// Create a client over a custom transport.
    #[must_use]
    pub fn with_transport(
        config: &DigestConfig,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport,
            llm: config.llm.clone(),
            search: config.search.clone(),
            policy: RetryPolicy::new(config.retry.clone()),
            credentials,
            default_introduction: config.curation.default_introduction.clone(),
            counters: Arc::new(CurationCounters::new()),
        }
    }

    /// Share a counter set across clients.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<CurationCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Counters for this client.
    #[must_use]
    pub fn counters(&self) -> &CurationCounters {
        &self.counters
    }

    /// Model id sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.llm.model
    }

    /// The retry policy in effect.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Build the request a `curate` call would send.
    #[must_use]
    pub fn build_request(&self, directives: &[String], max_items: usize) -> GenerationRequest {
        let tool_spec = ToolSpec::from_config(&self.search, &self.credentials.search_api_key);
        let instructions = build_instructions(&self.search, directives, max_items);
        GenerationRequest::new(instructions, tool_spec, &self.llm)
    }

    /// Ask the model to search, select and summarize up to `max_items`
    /// stories for the given directives.
    ///
    /// All directives go into one request. At most `max_attempts` HTTP
    /// attempts are made; retryable causes are absorbed until the budget
    /// runs out.
    ///
    /// # Errors
    ///
    /// - [`CurateError::Config`] for `max_items == 0` or no non-blank
    ///   directive; no request is sent.
    /// - [`CurateError::Fatal`] on a non-retryable cause.
    /// - [`CurateError::RetriesExhausted`] when the budget is spent.
    /// - [`CurateError::EmptyResult`] when no entry survives curation.
    pub async fn curate(
        &self,
        directives: &[String],
        max_items: usize,
    ) -> Result<Curated, CurateError> {
        if max_items == 0 {
            return Err(CurateError::Config("max_items must be positive".into()));
        }
        if directives.iter().all(|d| d.trim().is_empty()) {
            return Err(CurateError::Config(
                "at least one search directive is required".into(),
            ));
        }

        let request = self.build_request(directives, max_items);
        let body = request.to_body();
        let max_attempts = self.policy.max_attempts();
        let started = Instant::now();
        self.counters.calls.fetch_add(1, Ordering::Relaxed);

        let mut attempt: u32 = 0;
        let mut upstream_failures: u32 = 0;
        loop {
            attempt += 1;
            self.counters.attempts.fetch_add(1, Ordering::Relaxed);
            info!(
                attempt,
                max_attempts,
                model = %request.model_id,
                "Requesting curation"
            );

            let failure = match self.attempt(&body, request.timeout).await {
                Ok(raw) => {
                    let received = raw.items.len();
                    let digest = curation::finalize(raw, max_items, &self.default_introduction)
                        .map_err(|e| {
                            self.record_failure(started);
                            let err = CurateError::from_digest(e, attempt);
                            error!(attempt, received, error = %err, "Curation failed");
                            err
                        })?;

                    let latency_ms = elapsed_ms(started);
                    self.record_success(digest.len(), latency_ms);
                    info!(
                        attempts = attempt,
                        received,
                        items = digest.len(),
                        latency_ms,
                        "Curation succeeded"
                    );
                    return Ok(Curated {
                        digest,
                        attempts: attempt,
                        model: request.model_id.clone(),
                        latency_ms,
                    });
                }
                Err(failure) => failure,
            };

            let cause = failure.cause;
            let kind = cause.kind();
            self.counters.record_attempt_failure(kind);
            if kind == FailureKind::UpstreamToolFailure {
                upstream_failures += 1;
            }

            match self
                .policy
                .decide(&cause, attempt, upstream_failures, failure.retry_after)
            {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        attempt,
                        max_attempts,
                        kind = %kind,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %cause,
                        "Retrying curation"
                    );
                    self.counters
                        .retries
                        .fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Exhausted => {
                    error!(attempts = attempt, kind = %kind, error = %cause, "Curation retries exhausted");
                    self.record_failure(started);
                    return Err(CurateError::RetriesExhausted {
                        attempts: attempt,
                        last: cause,
                    });
                }
                RetryDecision::Fatal => {
                    error!(attempts = attempt, kind = %kind, error = %cause, "Curation failed");
                    self.record_failure(started);
                    return Err(CurateError::Fatal {
                        attempts: attempt,
                        cause,
                    });
                }
            }
        }
    }

    /// One HTTP exchange, classified.
    async fn attempt(&self, body: &Value, timeout: Duration) -> Result<RawDigest, FailedAttempt> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let reply = tokio::time::timeout(
            timeout,
            self.transport.post_json(
                &self.llm.endpoint,
                &self.credentials.llm_api_key,
                body,
                timeout,
            ),
        )
        .await
        .map_err(|_| AttemptError::Timeout(timeout_ms))??;

        debug!(status = reply.status, bytes = reply.body.len(), "Reply received");

        if !reply.is_success() {
            return Err(FailedAttempt {
                cause: self.policy.classify_status(reply.status, &reply.body),
                retry_after: reply.retry_after,
            });
        }

        let text = extract_final_text(reply.status, &reply.body)?;
        parse_digest(&text).map_err(FailedAttempt::from)
    }

    fn record_success(&self, items: usize, latency_ms: u64) {
        self.counters.successes.fetch_add(1, Ordering::Relaxed);
        self.counters
            .items_delivered
            .fetch_add(items as u64, Ordering::Relaxed);
        self.counters.record_latency(latency_ms);
    }

    fn record_failure(&self, started: Instant) {
        self.counters
            .failures
            .fetch_add(1, Ordering::Relaxed);
        self.counters.record_latency(elapsed_ms(started));
    }
}

impl std::fmt::Debug for CurationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurationClient")
            .field("endpoint", &self.llm.endpoint)
            .field("model", &self.llm.model)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
