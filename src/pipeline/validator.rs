//! Candidate Validator
//!
//! Decides whether a candidate is a real mention of its dictionary entry.
//! Cheap local checks run first so that a surface form costs at most one
//! lemmatizer call and one LLM call over the lifetime of the caches:
//!
//! 1. duality: ambiguous surfaces go to the judge, others are accepted
//! 2. blocked terms, then rejected terms
//! 3. term cache
//! 4. exact match with the dictionary value
//! 5. lemma: veto, exact lemma, or is-form-of question to the judge
//!
//! Judge failures reject the candidate. Lemmatizer failures stop the run.

use super::PipelineResult;
use crate::cache::{BlockedTerms, RejectedTerms, TermCache};
use crate::candidates::Candidate;
use crate::language::Language;
use crate::lemma::Lemmatizer;
use crate::llm::{LlmError, TermJudge};
use std::fmt;

/// Outcome of validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
}

/// The step that settled a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Duality value matched unambiguously
    DualityUnambiguous,
    /// Judge said the ambiguous term refers to the entry type
    RelevanceAccepted,
    RelevanceRejected,
    Blocked,
    Rejected,
    Cached,
    Exact,
    /// Lemma does not contain the dictionary value
    LemmaVeto,
    /// Lemma is the dictionary value
    LemmaExact,
    JudgeAccepted,
    JudgeRejected,
    NoJudge,
    JudgeFailed,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::DualityUnambiguous => "duality-unambiguous",
            Reason::RelevanceAccepted => "relevance-accepted",
            Reason::RelevanceRejected => "relevance-rejected",
            Reason::Blocked => "blocked",
            Reason::Rejected => "rejected",
            Reason::Cached => "cached",
            Reason::Exact => "exact",
            Reason::LemmaVeto => "lemma-veto",
            Reason::LemmaExact => "lemma-exact",
            Reason::JudgeAccepted => "judge-accepted",
            Reason::JudgeRejected => "judge-rejected",
            Reason::NoJudge => "no-judge",
            Reason::JudgeFailed => "judge-failed",
        };
        f.write_str(s)
    }
}

/// A verdict and the step that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: Reason,
}

impl Decision {
    fn valid(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Valid,
            reason,
        }
    }

    fn invalid(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Invalid,
            reason,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }
}

/// Per-candidate decision procedure with its caches and collaborators.
pub struct Validator {
    language: Language,
    term_cache: TermCache,
    rejected: RejectedTerms,
    blocked: BlockedTerms,
    lemmatizer: Box<dyn Lemmatizer>,
    judge: Option<Box<dyn TermJudge>>,
}

impl Validator {
    pub fn new(
        language: Language,
        term_cache: TermCache,
        rejected: RejectedTerms,
        blocked: BlockedTerms,
        lemmatizer: Box<dyn Lemmatizer>,
        judge: Option<Box<dyn TermJudge>>,
    ) -> Self {
        Self {
            language,
            term_cache,
            rejected,
            blocked,
            lemmatizer,
            judge,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn term_cache(&self) -> &TermCache {
        &self.term_cache
    }

    pub fn rejected(&self) -> &RejectedTerms {
        &self.rejected
    }

    pub fn blocked(&self) -> &BlockedTerms {
        &self.blocked
    }

    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    /// Persist the term and lemma cache.
    pub fn save_cache(&self) -> std::io::Result<()> {
        self.term_cache.save()
    }

    /// Validate one candidate found in `sentence`.
    pub fn validate(&mut self, candidate: &Candidate<'_>, sentence: &str) -> PipelineResult<Decision> {
        let decision = self.decide(candidate, sentence)?;
        log::debug!(
            "{} '{}' ({}): {}",
            if decision.is_valid() { "VALID" } else { "INVALID" },
            candidate.surface,
            candidate.dict_value.value,
            decision.reason
        );
        Ok(decision)
    }

    fn decide(&mut self, candidate: &Candidate<'_>, sentence: &str) -> PipelineResult<Decision> {
        let surface = candidate.surface.as_str();
        let value = candidate.dict_value.value.as_str();
        let lower = surface.to_lowercase();

        if let Some(duality) = &candidate.dict_value.duality {
            if duality.rule.is_ambiguous(surface, value) {
                return Ok(self.ask_relevance(surface, sentence, candidate.entry_type));
            }
            self.term_cache.add_term(&lower);
            return Ok(Decision::valid(Reason::DualityUnambiguous));
        }

        if self.blocked.contains(surface) {
            return Ok(Decision::invalid(Reason::Blocked));
        }
        if self.rejected.contains(&lower) {
            return Ok(Decision::invalid(Reason::Rejected));
        }

        if self.term_cache.contains_term(&lower) {
            return Ok(Decision::valid(Reason::Cached));
        }

        let value_lower = value.to_lowercase();
        if lower == value_lower {
            self.term_cache.add_term(&lower);
            return Ok(Decision::valid(Reason::Exact));
        }

        let lemma = self.lemmatizer.lemmatize(&lower)?.to_lowercase();
        if !lemma.contains(&value_lower) {
            return Ok(Decision::invalid(Reason::LemmaVeto));
        }
        if lemma.chars().count() == value_lower.chars().count() {
            self.term_cache.add_term(&lower);
            self.term_cache.add_lemma(&lemma);
            return Ok(Decision::valid(Reason::LemmaExact));
        }

        let Some(judge) = &self.judge else {
            return Ok(Decision::invalid(Reason::NoJudge));
        };
        match judge.is_form_of(&lower, value, self.language, candidate.entry_type) {
            Ok(true) => {
                self.term_cache.add_term(&lower);
                self.term_cache.add_lemma(&lemma);
                Ok(Decision::valid(Reason::JudgeAccepted))
            }
            Ok(false) => {
                self.rejected.insert(&lower);
                Ok(Decision::invalid(Reason::JudgeRejected))
            }
            Err(e) => Ok(judge_failed(surface, &e)),
        }
    }

    fn ask_relevance(&self, surface: &str, sentence: &str, entry_type: &str) -> Decision {
        let Some(judge) = &self.judge else {
            return Decision::invalid(Reason::NoJudge);
        };
        match judge.is_relevant(surface, sentence, entry_type) {
            Ok(true) => Decision::valid(Reason::RelevanceAccepted),
            Ok(false) => Decision::invalid(Reason::RelevanceRejected),
            Err(e) => judge_failed(surface, &e),
        }
    }
}

fn judge_failed(surface: &str, error: &LlmError) -> Decision {
    log::error!("LLM call failed for '{}': {}", surface, error);
    Decision::invalid(Reason::JudgeFailed)
}
