//! Dictionary Loader
//!
//! Reads dictionary JSON files of the form:
//!
//! ```text
//! { "data": [ { "uid": "...", "type": "fish",
//!               "ru": [ { "value": "карп", "specificity": "CANONICAL" } ],
//!               "en": [ { "value": "carp" } ] } ] }
//! ```
//!
//! Only the arrays of the requested language are kept.

use super::{DictValue, DictionaryEntry, Duality, DualityRule, Specificity};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Language arrays read when no language is requested.
const DEFAULT_LANGUAGES: [&str; 3] = ["en", "ru", "he"];

/// Dictionary loading errors.
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Failed to read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse dictionary {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Dictionary value cannot be empty")]
    EmptyValue,

    #[error("Unknown duality rule '{rule}' on value '{value}'")]
    UnknownDualityRule { rule: String, value: String },

    #[error("No dictionaries loaded - cannot continue")]
    NothingLoaded,
}

impl DictionaryError {
    /// Configuration errors that must abort the run even when other
    /// dictionary files load fine.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DictionaryError::EmptyValue | DictionaryError::UnknownDualityRule { .. }
        )
    }
}

/// Result type for dictionary operations.
pub type DictionaryResult<T> = Result<T, DictionaryError>;

#[derive(Debug, Deserialize)]
struct RawDictionary {
    #[serde(default)]
    data: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    uid: Value,
    #[serde(default, rename = "type")]
    entry_type: Value,
    #[serde(flatten)]
    names: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    value: String,
    #[serde(default)]
    specificity: Option<String>,
    #[serde(default)]
    duality: Option<RawDuality>,
}

#[derive(Debug, Deserialize)]
struct RawDuality {
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    alternate_meaning: Option<String>,
}

/// Load and concatenate several dictionary files.
///
/// Unreadable or malformed files are logged and skipped. Invalid values and
/// unknown duality rules abort loading, as does ending up with no entries.
pub fn load_dictionaries<P: AsRef<Path>>(
    paths: &[P],
    language: Option<&str>,
) -> DictionaryResult<Vec<DictionaryEntry>> {
    let mut entries = Vec::new();

    if paths.is_empty() {
        log::error!("No dictionary paths configured");
    }

    for path in paths {
        let path = path.as_ref();
        match load_dictionary(path, language) {
            Ok(loaded) => {
                log::info!(
                    "Loaded {} entries from {} (lang: {})",
                    loaded.len(),
                    path.display(),
                    language.unwrap_or("all")
                );
                entries.extend(loaded);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => log::error!("{}", e),
        }
    }

    if entries.is_empty() {
        return Err(DictionaryError::NothingLoaded);
    }

    Ok(entries)
}

/// Load a single dictionary file.
pub fn load_dictionary(path: &Path, language: Option<&str>) -> DictionaryResult<Vec<DictionaryEntry>> {
    let content = fs::read_to_string(path).map_err(|source| DictionaryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawDictionary =
        serde_json::from_str(&content).map_err(|source| DictionaryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    convert(raw, language, path)
}

/// Parse dictionary JSON held in memory.
pub fn parse_dictionary(json: &str, language: Option<&str>) -> DictionaryResult<Vec<DictionaryEntry>> {
    let raw: RawDictionary = serde_json::from_str(json).map_err(|source| DictionaryError::Parse {
        path: PathBuf::from("<memory>"),
        source,
    })?;
    convert(raw, language, Path::new("<memory>"))
}

fn convert(
    raw: RawDictionary,
    language: Option<&str>,
    path: &Path,
) -> DictionaryResult<Vec<DictionaryEntry>> {
    let languages: Vec<String> = match language {
        Some(lang) if !lang.is_empty() => vec![lang.to_lowercase()],
        _ => DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
    };

    let mut entries = Vec::new();
    for item in raw.data {
        let mut values = Vec::new();
        for lang in &languages {
            let Some(names) = item.names.get(lang) else {
                continue;
            };
            let Some(names) = names.as_array() else {
                continue;
            };
            for name in names {
                let name: RawName = serde_json::from_value(name.clone()).map_err(|source| {
                    DictionaryError::Parse {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                values.push(convert_name(name)?);
            }
        }

        if !values.is_empty() {
            entries.push(DictionaryEntry::new(
                value_text(&item.uid),
                value_text(&item.entry_type),
                values,
            ));
        }
    }
    Ok(entries)
}

fn convert_name(name: RawName) -> DictionaryResult<DictValue> {
    let specificity = match name.specificity.as_deref() {
        None => Specificity::Variant,
        Some(s) => s.parse::<Specificity>().unwrap_or_else(|other: String| {
            log::warn!(
                "Unknown specificity '{}' on '{}', treating as VARIANT",
                other,
                name.value
            );
            Specificity::Variant
        }),
    };

    let mut value = DictValue::new(name.value, specificity)?;

    if let Some(duality) = name.duality {
        let rule_name = duality.rule.unwrap_or_default();
        let rule = rule_name
            .parse::<DualityRule>()
            .map_err(|rule| DictionaryError::UnknownDualityRule {
                rule,
                value: value.value.clone(),
            })?;
        value = value.with_duality(Duality {
            rule,
            alternate_meaning: duality.alternate_meaning,
        });
    }

    Ok(value)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
