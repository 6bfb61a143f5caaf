//! Labeler Configuration
//!
//! Handles parsing and management of labeler.toml configuration files.
//!
//! ```toml
//! [labeler]
//! language = "ru"
//! forum_name = "israfish"
//! dictionary_paths = ["dictionaries/species_dict.json"]
//!
//! [llm]
//! config_dir = "config/llm"
//! audit_log = "output/LLM_log.txt"
//!
//! [lemmatizer]
//! url = "http://127.0.0.1:5000/lemma"
//! ```

use crate::cache::DEFAULT_REJECTED_TERMS_LIMIT;
use crate::language::{Language, DEFAULT_MIN_LANGUAGE_RATIO};
use crate::lemma::DEFAULT_LEMMA_SERVICE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "labeler.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching labeler.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LabelerConfig {
    /// Labeling run settings
    #[serde(default)]
    pub labeler: LabelerSection,

    /// LLM provider pool
    #[serde(default)]
    pub llm: LlmSection,

    /// Lemma service
    #[serde(default)]
    pub lemmatizer: LemmatizerSection,
}

impl LabelerConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: LabelerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The configured target language.
    pub fn language(&self) -> ConfigResult<Language> {
        self.labeler
            .language
            .parse()
            .map_err(|_| ConfigError::UnknownLanguage(self.labeler.language.clone()))
    }

    /// Directory holding this forum's caches.
    pub fn forum_data_dir(&self) -> PathBuf {
        self.labeler.data_dir.join(&self.labeler.forum_name)
    }

    /// Output file name, `<forum>_<lang>.json` unless configured.
    pub fn output_file_name(&self) -> String {
        self.labeler.output_file_name.clone().unwrap_or_else(|| {
            format!(
                "{}_{}.json",
                self.labeler.forum_name,
                self.labeler.language.to_lowercase()
            )
        })
    }
}

/// Labeling run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelerSection {
    /// Shorter sentences (in characters) are skipped
    #[serde(default = "default_min_sentence_length")]
    pub min_sentence_length: usize,

    /// Share of target-language letters a sentence must exceed; 0 disables
    #[serde(default = "default_min_language_ratio")]
    pub min_language_ratio: f64,

    /// Stop after this many labeled sentences; 0 means no limit
    #[serde(default)]
    pub max_sentences: usize,

    /// Save the term cache every N labeled sentences
    #[serde(default = "default_cache_save_interval")]
    pub cache_save_interval: usize,

    /// Capacity of the rejected-term cache
    #[serde(default = "default_rejected_terms_limit")]
    pub rejected_terms_limit: usize,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_forum_name")]
    pub forum_name: String,

    #[serde(default = "default_dictionary_paths")]
    pub dictionary_paths: Vec<PathBuf>,

    /// Root of per-forum cache directories
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub output_file_name: Option<String>,
}

fn default_min_sentence_length() -> usize {
    15
}

fn default_min_language_ratio() -> f64 {
    DEFAULT_MIN_LANGUAGE_RATIO
}

fn default_cache_save_interval() -> usize {
    5
}

fn default_rejected_terms_limit() -> usize {
    DEFAULT_REJECTED_TERMS_LIMIT
}

fn default_language() -> String {
    "ru".to_string()
}

fn default_forum_name() -> String {
    "forum".to_string()
}

fn default_dictionary_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("dictionaries/species_dict.json")]
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for LabelerSection {
    fn default() -> Self {
        Self {
            min_sentence_length: default_min_sentence_length(),
            min_language_ratio: default_min_language_ratio(),
            max_sentences: 0,
            cache_save_interval: default_cache_save_interval(),
            rejected_terms_limit: default_rejected_terms_limit(),
            language: default_language(),
            forum_name: default_forum_name(),
            dictionary_paths: default_dictionary_paths(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            output_file_name: None,
        }
    }
}

/// LLM settings. Without `config_dir` no judge is used.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmSection {
    /// Directory of provider JSON configs
    #[serde(default)]
    pub config_dir: Option<PathBuf>,

    /// Append every prompt and verdict to this file
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

/// Lemma service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LemmatizerSection {
    #[serde(default = "default_lemma_url")]
    pub url: String,

    #[serde(default = "default_lemma_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_lemma_url() -> String {
    DEFAULT_LEMMA_SERVICE_URL.to_string()
}

fn default_lemma_timeout_ms() -> u64 {
    5000
}

impl LemmatizerSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LemmatizerSection {
    fn default() -> Self {
        Self {
            url: default_lemma_url(),
            timeout_ms: default_lemma_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LabelerConfig::default();
        assert_eq!(config.labeler.min_sentence_length, 15);
        assert_eq!(config.labeler.min_language_ratio, 0.3);
        assert_eq!(config.labeler.cache_save_interval, 5);
        assert_eq!(config.labeler.rejected_terms_limit, 1000);
        assert_eq!(config.labeler.max_sentences, 0);
        assert_eq!(config.language().unwrap(), Language::Ru);
        assert!(config.llm.config_dir.is_none());
        assert_eq!(config.lemmatizer.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[labeler]
language = "ru"
forum_name = "israfish"
max_sentences = 100
dictionary_paths = ["dicts/species_dict.json"]

[llm]
config_dir = "config/llm"
"#;
        let config: LabelerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.labeler.forum_name, "israfish");
        assert_eq!(config.labeler.max_sentences, 100);
        assert_eq!(config.labeler.min_sentence_length, 15);
        assert_eq!(config.llm.config_dir, Some(PathBuf::from("config/llm")));
        assert_eq!(config.forum_data_dir(), PathBuf::from("data/israfish"));
        assert_eq!(config.output_file_name(), "israfish_ru.json");
    }

    #[test]
    fn test_unknown_language() {
        let mut config = LabelerConfig::default();
        config.labeler.language = "xx".to_string();
        assert!(matches!(config.language(), Err(ConfigError::UnknownLanguage(_))));
    }

    #[test]
    fn test_save_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let mut config = LabelerConfig::default();
        config.labeler.forum_name = "saved".to_string();
        config.save(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let found = LabelerConfig::find_and_load(&nested).unwrap();
        assert_eq!(found.labeler.forum_name, "saved");
    }

    #[test]
    fn test_load_missing() {
        let result = LabelerConfig::load(Path::new("/nonexistent/labeler.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
