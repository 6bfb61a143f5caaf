//! forum-labeler - Dictionary Term Recognition for Forum Text
//!
//! Finds mentions of a closed vocabulary (species names) in free-form forum
//! posts and decides, per occurrence, whether the mention really is a form of
//! a dictionary entry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ topic text   │──▶│ sentences +  │──▶│ CandidateGenerator│
//! │              │   │ pre-filters  │   │ (substring+word)  │
//! └──────────────┘   └──────────────┘   └─────────┬────────┘
//!                                                 ▼
//!            ┌──────────────────────── Validator ─────────────────────────┐
//!            │ duality ─ blocked ─ rejected ─ term cache ─ exact ─ lemma  │
//!            └───────────────────────────────┬────────────────────────────┘
//!                                            ▼ hard cases
//!                                ┌──────────────────────┐
//!                                │ TermJudge            │
//!                                │  └ ProviderPool      │  priority, quotas,
//!                                │     groq/openrouter/ │  cooldown, failover
//!                                │     huggingface      │
//!                                └──────────────────────┘
//! ```
//!
//! Confirmed surfaces and lemmas are persisted per forum, so a surface form
//! costs at most one lemmatizer or LLM call across runs.
//!
//! # Example
//!
//! ```rust
//! use forum_labeler::candidates::CandidateGenerator;
//! use forum_labeler::dictionary::{DictValue, DictionaryEntry, Specificity};
//!
//! let carp = DictionaryEntry::new(
//!     "1",
//!     "fish",
//!     vec![DictValue::new("карп", Specificity::Canonical).unwrap()],
//! );
//! let generator = CandidateGenerator::new(vec![carp]);
//!
//! let candidates = generator.generate("Поймал карпа на реке");
//! assert_eq!(candidates[0].surface, "карпа");
//! assert_eq!((candidates[0].start, candidates[0].end), (7, 12));
//! ```

#![warn(clippy::all)]

pub mod cache;
pub mod candidates;
pub mod config;
pub mod counters;
pub mod dictionary;
pub mod language;
pub mod lemma;
pub mod llm;
pub mod pipeline;

// Re-export commonly used types
pub use cache::{BlockedTerms, CacheStats, RejectedTerms, TermCache};
pub use candidates::{Candidate, CandidateGenerator};
pub use config::{ConfigError, LabelerConfig};
pub use counters::CountersManager;
pub use dictionary::{
    load_dictionaries, DictValue, DictionaryEntry, DictionaryError, Duality, DualityRule,
    Specificity,
};
pub use language::{Language, LanguageProfile};
pub use lemma::{create_lemmatizer, LemmaError, Lemmatizer, NoOpLemmatizer, RemoteLemmatizer};
pub use llm::{
    LlmError, LlmErrorKind, LlmJudge, LlmProvider, LlmResponse, PooledProvider, ProviderPool,
    TermJudge,
};
pub use pipeline::{
    Decision, LabelEntry, LabeledSentence, LabelerOptions, LabelingMetadata, PipelineError,
    ProcessStatus, Reason, SentencesLabeler, Topic, TopicOutcome, Validator, Verdict,
};

/// Version of the forum-labeler crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
