//! LLM error types.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// What went wrong with a provider call. Drives cooldown policy in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmErrorKind {
    RateLimit,
    TokenLimit,
    Network,
    Auth,
    InvalidRequest,
    Server,
    Unknown,
}

impl LlmErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmErrorKind::RateLimit => "rate_limit",
            LlmErrorKind::TokenLimit => "token_limit",
            LlmErrorKind::Network => "network",
            LlmErrorKind::Auth => "auth",
            LlmErrorKind::InvalidRequest => "invalid_request",
            LlmErrorKind::Server => "server",
            LlmErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from a single provider call, or from the pool as a whole.
#[derive(Debug, Clone, Error)]
#[error("{provider}: {kind} error: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub provider: String,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider: provider.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Rate-limit error with an optional server-provided retry delay.
    pub fn rate_limited(
        provider: impl Into<String>,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self {
            retry_after,
            ..Self::new(LlmErrorKind::RateLimit, provider, message)
        }
    }

    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, provider, message)
    }

    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, provider, message)
    }

    pub fn server(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Server, provider, message)
    }

    pub fn unknown(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, provider, message)
    }

    /// Whether trying again (here or on another provider) can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            LlmErrorKind::RateLimit
                | LlmErrorKind::TokenLimit
                | LlmErrorKind::Network
                | LlmErrorKind::Server
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(LlmError::rate_limited("groq", "slow down", None).is_retryable());
        assert!(LlmError::network("groq", "timeout").is_retryable());
        assert!(LlmError::server("groq", "502").is_retryable());
        assert!(LlmError::new(LlmErrorKind::TokenLimit, "groq", "context").is_retryable());
        assert!(!LlmError::auth("groq", "bad key").is_retryable());
        assert!(!LlmError::new(LlmErrorKind::InvalidRequest, "groq", "bad").is_retryable());
        assert!(!LlmError::unknown("groq", "?").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = LlmError::rate_limited("openrouter", "Rate limit exceeded", Some(Duration::from_secs(5)));
        assert_eq!(err.to_string(), "openrouter: rate_limit error: Rate limit exceeded");
        assert_eq!(err.retry_after, Some(Duration::from_secs(5)));
    }
}
