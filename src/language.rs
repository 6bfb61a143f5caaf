//! Language Profiles
//!
//! Per-language sentence splitting and the cheap "is this sentence written in
//! the target language" pre-filter.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Default minimum share of target-language letters in a sentence.
pub const DEFAULT_MIN_LANGUAGE_RATIO: f64 = 0.3;

lazy_static! {
    static ref TERMINATOR: Regex = Regex::new(r"[.!?]+").expect("valid regex");

    static ref RU_LETTERS: Regex = Regex::new(r"[\x{0400}-\x{04FF}]+").expect("valid regex");
    static ref EN_LETTERS: Regex = Regex::new(r"[a-zA-Z]+").expect("valid regex");
    static ref HE_LETTERS: Regex = Regex::new(r"[\x{0590}-\x{05FF}]+").expect("valid regex");

    /// What must follow a terminator for it to end a sentence
    static ref RU_SENTENCE_START: Regex = Regex::new(r"^\s+[A-ZА-ЯЁ]").expect("valid regex");
    static ref EN_SENTENCE_START: Regex = Regex::new(r"^\s+[A-Z]").expect("valid regex");
    static ref HE_SENTENCE_START: Regex =
        Regex::new(r"^\s+[\x{0590}-\x{05FF}]").expect("valid regex");
}

/// Supported text languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Ru,
    En,
    He,
}

impl Language {
    /// Lowercase ISO code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::En => "en",
            Language::He => "he",
        }
    }

    /// English name, used in prompts.
    pub fn name(self) -> &'static str {
        match self {
            Language::Ru => "Russian",
            Language::En => "English",
            Language::He => "Hebrew",
        }
    }

    fn letters(self) -> &'static Regex {
        match self {
            Language::Ru => &*RU_LETTERS,
            Language::En => &*EN_LETTERS,
            Language::He => &*HE_LETTERS,
        }
    }

    fn sentence_start(self) -> &'static Regex {
        match self {
            Language::Ru => &*RU_SENTENCE_START,
            Language::En => &*EN_SENTENCE_START,
            Language::He => &*HE_SENTENCE_START,
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ru" | "ru-ru" => Ok(Language::Ru),
            "en" | "en-us" => Ok(Language::En),
            "he" | "he-il" => Ok(Language::He),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A language together with its filtering threshold.
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    pub language: Language,
    pub min_language_ratio: f64,
}

impl LanguageProfile {
    pub fn new(language: Language, min_language_ratio: f64) -> Self {
        Self {
            language,
            min_language_ratio,
        }
    }

    /// Split text into sentences.
    ///
    /// A run of `.`, `!` or `?` ends a sentence when it is followed by
    /// whitespace and an upper-case letter of the language, or by the end of
    /// the text. Terminators are dropped, as are trailing empty pieces.
    pub fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let start = self.language.sentence_start();
        let mut sentences = Vec::new();
        let mut last = 0;

        for m in TERMINATOR.find_iter(text) {
            let rest = &text[m.end()..];
            if rest.is_empty() || start.is_match(rest) {
                sentences.push(&text[last..m.start()]);
                last = m.end();
            }
        }
        if last < text.len() {
            sentences.push(&text[last..]);
        }

        while sentences.last().is_some_and(|s| s.is_empty()) {
            sentences.pop();
        }
        sentences
    }

    /// Whether the share of target-language letters is above the threshold.
    pub fn is_target_language(&self, sentence: &str) -> bool {
        if sentence.is_empty() {
            return false;
        }
        if self.min_language_ratio <= 0.0 {
            return true;
        }

        let letters: usize = self
            .language
            .letters()
            .find_iter(sentence)
            .map(|m| m.as_str().chars().count())
            .sum();
        let total = sentence.chars().count();

        letters as f64 / total as f64 > self.min_language_ratio
    }
}

impl From<Language> for LanguageProfile {
    fn from(language: Language) -> Self {
        Self::new(language, DEFAULT_MIN_LANGUAGE_RATIO)
    }
}
