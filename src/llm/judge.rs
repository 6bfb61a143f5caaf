//! Term Judge
//!
//! Turns the two questions the validator cannot answer locally into
//! TRUE/FALSE prompts for the provider pool:
//!
//! - is-form-of: is `candidate` a noun form of dictionary value `base`?
//! - relevance: does an ambiguous term refer to the entry type in this sentence?

use super::error::LlmError;
use super::pool::ProviderPool;
use crate::language::Language;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Answers the validator's escalation questions.
pub trait TermJudge {
    /// Whether `candidate` is a grammatical, diminutive or colloquial noun
    /// form of `base`.
    fn is_form_of(
        &self,
        candidate: &str,
        base: &str,
        language: Language,
        entry_type: &str,
    ) -> Result<bool, LlmError>;

    /// Whether `term` refers to an `entry_type` in `sentence`.
    fn is_relevant(&self, term: &str, sentence: &str, entry_type: &str) -> Result<bool, LlmError>;
}

const RU_IS_FORM_OF_PROMPT: &str = "\
You are a precise {entry_type} linguist of Russian. Answer only TRUE or FALSE.

Candidate: {candidate}
Base: {base}

Examples of TRUE (same word, different form):
- сома → сом: TRUE (genitive case)
- сомы → сом: TRUE (plural)
- сомик → сом: TRUE (diminutive)
- сомов → сом: TRUE (genitive plural)
- сомище → сом: TRUE (augmentative)

Examples of FALSE (different word type or not related):
- сомячий → сом: FALSE (adjective)
- сомячей → сом: FALSE (adjective)
- сомовьими → сом: FALSE (adjective)
- сомневается → сом: FALSE (verb)
- сомнение → сом: FALSE (candidate is not a form of Base)

Now evaluate:
If Candidate is a noun form of Base → TRUE
Otherwise → FALSE
";

const IS_FORM_OF_PROMPT: &str = "\
You are a precise {entry_type} linguist of {language}. Answer only TRUE or FALSE.

Candidate: {candidate}
Base: {base}

PRIORITY:
1. First, verify Candidate is a noun only.
   - Answer FALSE if Candidate is a verb, an adjective or an adverb.
2. Then, check if Candidate is a form of Base:
   - a grammatical inflection of Base
   - a diminutive, augmentative, or colloquial form of Base

Only answer TRUE if both conditions are satisfied.
Answer FALSE otherwise.
";

const RELEVANCE_PROMPT: &str = "\
You are a precise {entry_type} classifier.
Answer only TRUE or FALSE.

Context: \"{sentence}\"
Term: \"{term}\"

PRIORITY:
Evaluate ONLY whether the Term refers to a {entry_type} in this context.
Ignore all other possible meanings.

If it refers to a {entry_type}, answer TRUE.
If it does not, answer FALSE.";

/// Build the is-form-of prompt for a language.
pub fn is_form_of_prompt(candidate: &str, base: &str, language: Language, entry_type: &str) -> String {
    let template = match language {
        Language::Ru => RU_IS_FORM_OF_PROMPT,
        _ => IS_FORM_OF_PROMPT,
    };
    template
        .replace("{entry_type}", entry_type)
        .replace("{language}", language.name())
        .replace("{candidate}", candidate)
        .replace("{base}", base)
}

/// Build the duality relevance prompt.
pub fn relevance_prompt(term: &str, sentence: &str, entry_type: &str) -> String {
    RELEVANCE_PROMPT
        .replace("{entry_type}", entry_type)
        .replace("{sentence}", sentence)
        .replace("{term}", term)
}

/// Read a model reply as a verdict: `TRUE` or `YES` prefix, any case.
pub fn parse_verdict(reply: &str) -> bool {
    let reply = reply.trim().to_uppercase();
    reply.starts_with("TRUE") || reply.starts_with("YES")
}

/// Judge backed by the provider pool, optionally appending every exchange to
/// an audit log.
pub struct LlmJudge {
    pool: ProviderPool,
    audit_log: Option<PathBuf>,
}

impl LlmJudge {
    pub fn new(pool: ProviderPool) -> Self {
        Self {
            pool,
            audit_log: None,
        }
    }

    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    pub fn pool(&self) -> &ProviderPool {
        &self.pool
    }

    fn ask(&self, method: &str, prompt: &str) -> Result<bool, LlmError> {
        let response = self.pool.chat(None, prompt)?;
        let verdict = parse_verdict(&response.content);
        if let Some(path) = &self.audit_log {
            if let Err(e) = append_audit(path, method, prompt, verdict) {
                log::error!("Failed to write to LLM log {}: {}", path.display(), e);
            }
        }
        Ok(verdict)
    }
}

impl TermJudge for LlmJudge {
    fn is_form_of(
        &self,
        candidate: &str,
        base: &str,
        language: Language,
        entry_type: &str,
    ) -> Result<bool, LlmError> {
        let prompt = is_form_of_prompt(candidate, base, language, entry_type);
        let verdict = self.ask("isFormOf", &prompt)?;
        if verdict {
            log::info!("LLM accept: candidate '{}' is {}", candidate, base);
        } else {
            log::info!("LLM reject: candidate '{}' is not {}", candidate, base);
        }
        Ok(verdict)
    }

    fn is_relevant(&self, term: &str, sentence: &str, entry_type: &str) -> Result<bool, LlmError> {
        let prompt = relevance_prompt(term, sentence, entry_type);
        let verdict = self.ask("isRelevantType", &prompt)?;
        if verdict {
            log::info!("LLM accept: candidate '{}' is {}", term, entry_type);
        } else {
            log::info!("LLM reject: candidate '{}' is not {}", term, entry_type);
        }
        Ok(verdict)
    }
}

fn append_audit(path: &Path, method: &str, prompt: &str, verdict: bool) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write!(
        file,
        "=== {} ===\nMethod: {}\nPrompt:\n{}\nResult: {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        method,
        prompt,
        if verdict { "TRUE" } else { "FALSE" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict() {
        assert!(parse_verdict("TRUE"));
        assert!(parse_verdict("  true."));
        assert!(parse_verdict("Yes, it is"));
        assert!(!parse_verdict("FALSE"));
        assert!(!parse_verdict("It is TRUE"));
        assert!(!parse_verdict(""));
    }

    #[test]
    fn test_russian_prompt() {
        let prompt = is_form_of_prompt("карпа", "карп", Language::Ru, "fish");
        assert!(prompt.starts_with("You are a precise fish linguist of Russian."));
        assert!(prompt.contains("Candidate: карпа\nBase: карп"));
        assert!(prompt.contains("сомячий → сом: FALSE"));
    }

    #[test]
    fn test_generic_prompt_names_language() {
        let prompt = is_form_of_prompt("carps", "carp", Language::En, "fish");
        assert!(prompt.contains("linguist of English"));
        assert!(!prompt.contains("{"));
    }

    #[test]
    fn test_relevance_prompt() {
        let prompt = relevance_prompt("Сом", "Сом сказал что клюёт", "fish");
        assert!(prompt.contains("Context: \"Сом сказал что клюёт\""));
        assert!(prompt.contains("Term: \"Сом\""));
        assert!(prompt.contains("refers to a fish in this context"));
    }

    #[test]
    fn test_audit_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output/LLM_log.txt");
        append_audit(&path, "isFormOf", "prompt one", true).unwrap();
        append_audit(&path, "isFormOf", "prompt two", false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Method: isFormOf").count(), 2);
        assert!(content.contains("Result: TRUE"));
        assert!(content.contains("Result: FALSE"));
    }

    #[test]
    fn test_empty_pool_judge_errors() {
        let judge = LlmJudge::new(ProviderPool::new(Vec::new()));
        assert!(judge.is_form_of("карпа", "карп", Language::Ru, "fish").is_err());
    }
}
