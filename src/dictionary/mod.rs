//! Dictionary Model
//!
//! In-memory vocabulary entries. A dictionary is loaded once per run and is
//! read-only afterwards; every other component borrows from it.
//!
//! # Structure
//!
//! ```text
//! DictionaryEntry { uid, type }
//!   ├── DictValue  "карп"    CANONICAL
//!   ├── DictValue  "карпик"  VARIANT
//!   └── DictValue  "Сазан"   MOSTLY_USED  duality: CASE_SENSITIVE
//! ```

pub mod loader;

pub use loader::{load_dictionaries, parse_dictionary, DictionaryError, DictionaryResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How specific a dictionary value is relative to its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Specificity {
    /// The preferred display form of the entry
    Canonical,
    /// An alternate, still-acceptable name
    #[default]
    Variant,
    /// An alternate name that is more common than the canonical one
    MostlyUsed,
}

impl Specificity {
    /// Whether a match on this value is reported as a variant in labels.
    pub fn is_variant(self) -> bool {
        matches!(self, Specificity::Variant | Specificity::MostlyUsed)
    }
}

impl FromStr for Specificity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CANONICAL" => Ok(Specificity::Canonical),
            "VARIANT" => Ok(Specificity::Variant),
            "MOSTLY_USED" => Ok(Specificity::MostlyUsed),
            other => Err(other.to_string()),
        }
    }
}

/// Disambiguation rule for values that collide with an unrelated word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DualityRule {
    /// A same-length occurrence with different casing is ambiguous.
    CaseSensitive,
}

impl DualityRule {
    /// Whether `surface` needs a contextual check before it can be trusted
    /// as an occurrence of `value`.
    pub fn is_ambiguous(self, surface: &str, value: &str) -> bool {
        match self {
            DualityRule::CaseSensitive => {
                surface.chars().count() == value.chars().count() && surface != value
            }
        }
    }
}

impl FromStr for DualityRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASE_SENSITIVE" => Ok(DualityRule::CaseSensitive),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for DualityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DualityRule::CaseSensitive => write!(f, "CASE_SENSITIVE"),
        }
    }
}

/// Marks a value that is also a common, unrelated word (e.g. a personal name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duality {
    pub rule: DualityRule,
    pub alternate_meaning: Option<String>,
}

/// A single name of a dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictValue {
    pub value: String,
    pub specificity: Specificity,
    pub duality: Option<Duality>,
}

impl DictValue {
    /// Create a value. Empty values are rejected.
    pub fn new(value: impl Into<String>, specificity: Specificity) -> DictionaryResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(DictionaryError::EmptyValue);
        }
        Ok(Self {
            value,
            specificity,
            duality: None,
        })
    }

    /// Attach a duality marker.
    pub fn with_duality(mut self, duality: Duality) -> Self {
        self.duality = Some(duality);
        self
    }
}

/// A vocabulary entry: one concept with all of its names in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub uid: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub values: Vec<DictValue>,
}

impl DictionaryEntry {
    pub fn new(uid: impl Into<String>, entry_type: impl Into<String>, values: Vec<DictValue>) -> Self {
        Self {
            uid: uid.into(),
            entry_type: entry_type.into(),
            values,
        }
    }

    /// The first value marked `CANONICAL`, if any.
    pub fn canonical(&self) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.specificity == Specificity::Canonical)
            .map(|v| v.value.as_str())
    }
}
