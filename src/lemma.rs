//! Lemmatizers
//!
//! The validator only needs `word -> lemma`. Russian goes to a remote
//! morphology service (`GET <url>?word=<word>`, plain-text lemma in the body);
//! every other language uses the identity.

use std::time::Duration;
use thiserror::Error;

/// Default lemma service endpoint.
pub const DEFAULT_LEMMA_SERVICE_URL: &str = "http://127.0.0.1:5000/lemma";

/// Default timeout for one lemma request.
pub const DEFAULT_LEMMA_TIMEOUT: Duration = Duration::from_secs(5);

/// Lemmatizer failures. Any of these means the service cannot be relied on.
#[derive(Debug, Error)]
pub enum LemmaError {
    #[error("Lemma service returned status {status} for '{word}'")]
    Status { status: u16, word: String },

    #[error("Lemma service unreachable: {0}")]
    Transport(String),

    #[error("Failed to read lemma service response: {0}")]
    Body(#[from] std::io::Error),
}

/// Maps a word to its dictionary form.
pub trait Lemmatizer {
    fn lemmatize(&self, word: &str) -> Result<String, LemmaError>;
}

/// Returns words unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLemmatizer;

impl Lemmatizer for NoOpLemmatizer {
    fn lemmatize(&self, word: &str) -> Result<String, LemmaError> {
        Ok(word.to_string())
    }
}

/// HTTP client for the lemma service.
pub struct RemoteLemmatizer {
    url: String,
    agent: ureq::Agent,
}

impl RemoteLemmatizer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for RemoteLemmatizer {
    fn default() -> Self {
        Self::new(DEFAULT_LEMMA_SERVICE_URL, DEFAULT_LEMMA_TIMEOUT)
    }
}

impl Lemmatizer for RemoteLemmatizer {
    fn lemmatize(&self, word: &str) -> Result<String, LemmaError> {
        let response = self
            .agent
            .get(&self.url)
            .query("word", word)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => LemmaError::Status {
                    status,
                    word: word.to_string(),
                },
                other => LemmaError::Transport(other.to_string()),
            })?;

        if response.status() != 200 {
            return Err(LemmaError::Status {
                status: response.status(),
                word: word.to_string(),
            });
        }

        Ok(response.into_string()?.trim().to_string())
    }
}

/// Pick a lemmatizer for a language code.
pub fn create_lemmatizer(language: &str, url: &str, timeout: Duration) -> Box<dyn Lemmatizer> {
    match language.to_lowercase().as_str() {
        "ru" | "ru-ru" => {
            log::info!("Using remote lemmatizer at {}", url);
            Box::new(RemoteLemmatizer::new(url, timeout))
        }
        other => {
            log::info!("No lemmatizer for '{}', using identity", other);
            Box::new(NoOpLemmatizer)
        }
    }
}
