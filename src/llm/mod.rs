//! LLM Orchestration
//!
//! The validator escalates the cases it cannot settle locally to a remote
//! chat model. Free-tier providers are small and rate limited, so requests go
//! through a [`ProviderPool`] that keeps each one under quota and fails over
//! between them.
//!
//! ```text
//! TermJudge ──prompt──▶ ProviderPool ──▶ groq / openrouter / huggingface
//!     ▲                      │
//!     └──── TRUE/FALSE ◀─────┘
//! ```

pub mod config;
pub mod error;
pub mod judge;
pub mod pool;
pub mod provider;

use std::time::Duration;

pub use config::{ProviderConfig, RateLimitConfig};
pub use error::{LlmError, LlmErrorKind};
pub use judge::{parse_verdict, LlmJudge, TermJudge};
pub use pool::{PooledProvider, ProviderPool, ProviderUsage};
pub use provider::{ChatCompletionsProvider, LlmProvider, ProviderKind};

/// A model reply.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub response_time: Duration,
}

impl LlmResponse {
    /// A plain text reply, mostly for scripted providers.
    pub fn text(provider: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            provider: provider.into(),
            ..Self::default()
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}
