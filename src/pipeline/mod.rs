//! Labeling Pipeline
//!
//! ```text
//! topic text ─▶ sentences ─▶ pre-filters ─▶ candidates ─▶ Validator ─▶ LabeledSentence
//!                                                             │
//!                        blocked / rejected / cache / exact / lemma / judge
//! ```

pub mod labeler;
pub mod validator;

pub use labeler::{
    LabelEntry, LabeledSentence, LabelerOptions, LabelingMetadata, ProcessStatus,
    SentencesLabeler, Topic, TopicOutcome, TopicStats,
};
pub use validator::{Decision, Reason, Validator, Verdict};

use crate::config::ConfigError;
use crate::dictionary::DictionaryError;
use crate::lemma::LemmaError;
use thiserror::Error;

/// Errors that stop a labeling run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Lemma service unavailable: {0}")]
    LemmaServiceUnavailable(#[from] LemmaError),

    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
