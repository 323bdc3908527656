//! Failure classification and backoff.
//!
//! | Cause               | Retried | Delay                              |
//! |---------------------|---------|------------------------------------|
//! | RateLimited         | yes     | exponential + jitter, `Retry-After` floor |
//! | UpstreamToolFailure | up to `upstream_tool_max_retries` | exponential + jitter, `Retry-After` floor |
//! | Timeout             | if `retry_on_timeout` | exponential + jitter     |
//! | Malformed / Schema  | yes     | fixed `malformed_delay_ms`         |
//! | Transport           | no      | -                                  |
//!
//! All retries share one budget of `max_attempts` HTTP attempts.

use std::time::Duration;

use rand::Rng;

use newsdigest_core::config::RetryConfig;

use crate::error::{excerpt, AttemptError};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then attempt again.
    RetryAfter(Duration),
    /// Retryable cause, but its budget is spent.
    Exhausted,
    /// Not retryable at all.
    Fatal,
}

/// Retry policy derived from [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Wrap a retry configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts allowed per operation (at least one).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Map a non-2xx status to a cause using the configured status sets.
    #[must_use]
    pub fn classify_status(&self, status: u16, body: &str) -> AttemptError {
        if self.config.rate_limit_statuses.contains(&status) {
            AttemptError::RateLimited {
                status,
                body: excerpt(body),
            }
        } else if self.config.upstream_tool_statuses.contains(&status) {
            AttemptError::UpstreamToolFailure {
                status,
                body: excerpt(body),
            }
        } else {
            AttemptError::http_status(status, body)
        }
    }

    /// Whether `cause` is retryable in principle, ignoring budgets.
    #[must_use]
    pub fn is_retryable(&self, cause: &AttemptError) -> bool {
        match cause {
            AttemptError::RateLimited { .. }
            | AttemptError::UpstreamToolFailure { .. }
            | AttemptError::MalformedResponse(_)
            | AttemptError::SchemaValidation(_) => true,
            AttemptError::Timeout(_) => self.config.retry_on_timeout,
            AttemptError::Transport(_) => false,
        }
    }

    /// Decide what follows a failed attempt.
    ///
    /// `attempts_made` counts the failed attempt; `upstream_failures` counts
    /// upstream tool failures so far, this one included.
    #[must_use]
    pub fn decide(
        &self,
        cause: &AttemptError,
        attempts_made: u32,
        upstream_failures: u32,
        retry_after: Option<Duration>,
    ) -> RetryDecision {
        if !self.is_retryable(cause) {
            return RetryDecision::Fatal;
        }
        if attempts_made >= self.max_attempts() {
            return RetryDecision::Exhausted;
        }

        let retry_index = attempts_made.saturating_sub(1);
        match cause {
            AttemptError::MalformedResponse(_) | AttemptError::SchemaValidation(_) => {
                RetryDecision::RetryAfter(Duration::from_millis(self.config.malformed_delay_ms))
            }
            AttemptError::UpstreamToolFailure { .. }
                if upstream_failures > self.config.upstream_tool_max_retries =>
            {
                RetryDecision::Exhausted
            }
            AttemptError::RateLimited { .. } | AttemptError::UpstreamToolFailure { .. } => {
                let backoff = self.backoff(retry_index);
                let floor = retry_after
                    .map(|d| d.min(Duration::from_millis(self.config.max_delay_ms)))
                    .unwrap_or_default();
                RetryDecision::RetryAfter(backoff.max(floor))
            }
            _ => RetryDecision::RetryAfter(self.backoff(retry_index)),
        }
    }

    /// Exponential delay for the `retry_index`-th retry (0-based), with jitter.
    #[must_use]
    pub fn backoff(&self, retry_index: u32) -> Duration {
        let exp = i32::try_from(retry_index).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let base = self.config.base_delay_ms as f64 * self.config.multiplier.powi(exp);
        #[allow(clippy::cast_precision_loss)]
        let capped = base.min(self.config.max_delay_ms as f64);

        let jittered = if self.config.jitter > 0.0 {
            let spread = capped * self.config.jitter;
            capped + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            capped
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            jitter: 0.0,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            ..RetryConfig::default()
        })
    }

    fn rate_limited() -> AttemptError {
        AttemptError::RateLimited {
            status: 429,
            body: String::new(),
        }
    }

    #[test]
    fn classify_uses_configured_sets() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.classify_status(429, "slow down"),
            AttemptError::RateLimited { status: 429, .. }
        ));
        assert!(matches!(
            policy.classify_status(424, "tool failed"),
            AttemptError::UpstreamToolFailure { status: 424, .. }
        ));
        assert!(matches!(
            policy.classify_status(500, "oops"),
            AttemptError::Transport(_)
        ));
    }

    #[test]
    fn classify_follows_custom_mapping() {
        let policy = RetryPolicy::new(RetryConfig {
            rate_limit_statuses: vec![420],
            upstream_tool_statuses: vec![500],
            ..RetryConfig::default()
        });
        assert!(matches!(policy.classify_status(420, ""), AttemptError::RateLimited { .. }));
        assert!(matches!(
            policy.classify_status(500, ""),
            AttemptError::UpstreamToolFailure { .. }
        ));
        assert!(matches!(policy.classify_status(429, ""), AttemptError::Transport(_)));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = no_jitter();
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(10), Duration::from_millis(1_000));
    }

    #[test]
    fn backoff_jitter_stays_in_band() {
        let policy = RetryPolicy::new(RetryConfig {
            jitter: 0.1,
            base_delay_ms: 1_000,
            ..RetryConfig::default()
        });
        for _ in 0..50 {
            let ms = policy.backoff(0).as_millis();
            assert!((900..=1_100).contains(&ms), "delay {ms}ms out of band");
        }
    }

    #[test]
    fn transport_is_fatal() {
        let policy = no_jitter();
        let decision = policy.decide(&AttemptError::Transport("reset".into()), 1, 0, None);
        assert_eq!(decision, RetryDecision::Fatal);
    }

    #[test]
    fn budget_exhaustion() {
        let policy = no_jitter();
        assert!(matches!(
            policy.decide(&rate_limited(), 2, 0, None),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(policy.decide(&rate_limited(), 3, 0, None), RetryDecision::Exhausted);
    }

    #[test]
    fn malformed_uses_short_fixed_delay() {
        let policy = RetryPolicy::new(RetryConfig {
            malformed_delay_ms: 5,
            ..RetryConfig::default()
        });
        let decision = policy.decide(&AttemptError::MalformedResponse("x".into()), 2, 0, None);
        assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_millis(5)));
    }

    #[test]
    fn upstream_failures_have_stricter_bound() {
        let policy = no_jitter();
        let cause = AttemptError::UpstreamToolFailure {
            status: 424,
            body: String::new(),
        };
        assert!(matches!(policy.decide(&cause, 1, 1, None), RetryDecision::RetryAfter(_)));
        assert_eq!(policy.decide(&cause, 2, 2, None), RetryDecision::Exhausted);
    }

    #[test]
    fn retry_after_is_a_capped_floor() {
        let policy = no_jitter();
        assert_eq!(
            policy.decide(&rate_limited(), 1, 0, Some(Duration::from_millis(700))),
            RetryDecision::RetryAfter(Duration::from_millis(700))
        );
        assert_eq!(
            policy.decide(&rate_limited(), 1, 0, Some(Duration::from_secs(3_600))),
            RetryDecision::RetryAfter(Duration::from_millis(1_000))
        );
    }

    #[test]
    fn upstream_failure_honours_retry_after() {
        let policy = no_jitter();
        let cause = AttemptError::UpstreamToolFailure {
            status: 503,
            body: String::new(),
        };
        assert_eq!(
            policy.decide(&cause, 1, 1, Some(Duration::from_millis(800))),
            RetryDecision::RetryAfter(Duration::from_millis(800))
        );
        assert_eq!(
            policy.decide(&cause, 1, 1, Some(Duration::from_secs(60))),
            RetryDecision::RetryAfter(Duration::from_millis(1_000))
        );
    }

    #[test]
    fn timeout_retry_is_configurable() {
        let policy = RetryPolicy::new(RetryConfig {
            retry_on_timeout: false,
            ..RetryConfig::default()
        });
        assert_eq!(
            policy.decide(&AttemptError::Timeout(10), 1, 0, None),
            RetryDecision::Fatal
        );
    }
}
