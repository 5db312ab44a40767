//! Judge transport error taxonomy and retry policy.

use rand::Rng;
use std::time::Duration;

/// Category of a judge call failure, used to pick the retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeErrorKind {
    /// Connection-level failure (DNS, refused, reset).
    Network,
    /// Request exceeded its deadline.
    Timeout,
    /// HTTP 429 from the endpoint.
    RateLimited,
    /// HTTP 5xx from the endpoint.
    ServerError,
    /// HTTP 4xx other than 429 (bad request, auth, oversized prompt).
    ClientError,
    /// Response body did not have the expected shape.
    Parse,
    /// Prompt template could not be loaded or rendered.
    Template,
}

impl std::fmt::Display for JudgeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JudgeErrorKind::Network => "network",
            JudgeErrorKind::Timeout => "timeout",
            JudgeErrorKind::RateLimited => "rate_limited",
            JudgeErrorKind::ServerError => "server_error",
            JudgeErrorKind::ClientError => "client_error",
            JudgeErrorKind::Parse => "parse",
            JudgeErrorKind::Template => "template",
        };
        f.write_str(s)
    }
}

/// Error from the judge client.
#[derive(Debug, Clone, thiserror::Error)]
#[error("judge {kind} error: {message}")]
pub struct JudgeError {
    pub kind: JudgeErrorKind,
    pub message: String,
}

impl JudgeError {
    pub fn new(kind: JudgeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(JudgeErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(JudgeErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(JudgeErrorKind::Parse, message)
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::new(JudgeErrorKind::Template, message)
    }

    /// Build an error from an HTTP status code and response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::new(
            classify_http_status(status),
            format!("HTTP {}: {}", status, body),
        )
    }
}

/// Map an HTTP status code onto an error kind.
pub fn classify_http_status(status: u16) -> JudgeErrorKind {
    match status {
        429 => JudgeErrorKind::RateLimited,
        500..=599 => JudgeErrorKind::ServerError,
        400..=499 => JudgeErrorKind::ClientError,
        _ => JudgeErrorKind::ServerError,
    }
}

/// Bounded exponential backoff with jitter for judge calls.
///
/// The delay before retry `n` (zero-based) is `base * 2^n` plus a uniform
/// sample from `[0, jitter)`. Retries stop after `max_retries` attempts
/// beyond the initial one; the last error is then surfaced to the caller.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
    /// Per-request deadline. A judge that accepts the connection but never
    /// answers fails the attempt instead of blocking the retry loop.
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Whether an error of this kind is worth retrying. Template errors are
    /// deterministic; everything the transport raises may be transient. A
    /// 4xx can clear up when the serving side reloads, so it is retried too,
    /// matching how the scorer treats the judge as a flaky collaborator.
    pub fn should_retry(&self, error: &JudgeError) -> bool {
        !matches!(error.kind, JudgeErrorKind::Template)
    }

    /// Backoff before retry `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return exp;
        }
        let extra = rand::thread_rng().gen_range(0..jitter_ms);
        exp + Duration::from_millis(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_http_status() {
        assert_eq!(classify_http_status(429), JudgeErrorKind::RateLimited);
        assert_eq!(classify_http_status(500), JudgeErrorKind::ServerError);
        assert_eq!(classify_http_status(503), JudgeErrorKind::ServerError);
        assert_eq!(classify_http_status(400), JudgeErrorKind::ClientError);
        assert_eq!(classify_http_status(200), JudgeErrorKind::ServerError);
    }

    #[test]
    fn test_delay_grows_and_is_bounded() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            jitter: Duration::from_millis(50),
            ..RetryConfig::default()
        };
        let mut previous_floor = Duration::ZERO;
        for attempt in 0..5 {
            let floor = config.base_delay * 2u32.pow(attempt);
            let ceiling = floor + config.jitter;
            let delay = config.delay_for(attempt);
            assert!(delay >= floor, "attempt {}: {:?} < {:?}", attempt, delay, floor);
            assert!(delay < ceiling, "attempt {}: {:?} >= {:?}", attempt, delay, ceiling);
            assert!(floor >= previous_floor);
            previous_floor = floor;
        }
    }

    #[test]
    fn test_template_errors_not_retried() {
        let config = RetryConfig::default();
        assert!(!config.should_retry(&JudgeError::template("missing file")));
        assert!(config.should_retry(&JudgeError::network("refused")));
        assert!(config.should_retry(&JudgeError::from_status(429, "slow down")));
        assert!(config.should_retry(&JudgeError::from_status(400, "bad request")));
    }
}
