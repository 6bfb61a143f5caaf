//! Provider Configuration
//!
//! One JSON file per provider in the LLM config directory, for example
//! `groq.json`:
//!
//! ```json
//! {
//!   "name": "groq",
//!   "apiUrl": "https://api.groq.com/openai/v1/chat/completions",
//!   "model": "llama-3.1-8b-instant",
//!   "apiKeyEnvVar": "GROQ_API_KEY",
//!   "priority": 1,
//!   "rateLimit": { "requestsPerMinute": 30, "requestsPerDay": 14400 }
//! }
//! ```
//!
//! A sibling `groq_key.json` (`{ "key": "..." }`) overrides the key so secrets
//! can live outside the shared config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};
use thiserror::Error;

/// Suffix of key files, which are never parsed as provider configs.
pub const KEY_FILE_SUFFIX: &str = "_key.json";

/// Provider config loading errors.
#[derive(Debug, Error)]
pub enum ProviderConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Static configuration of one chat provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub api_url: String,

    pub model: String,

    /// Inline key; usually left empty in favour of a key file or env var
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_key_env_var: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower values are tried first
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Published provider quotas. Zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    #[serde(default)]
    pub requests_per_minute: u32,

    #[serde(default)]
    pub requests_per_day: u32,

    #[serde(default)]
    pub tokens_per_day: u32,
}

#[derive(Deserialize)]
struct KeyFile {
    key: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    64
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ProviderConfig {
    /// Parse a provider config file.
    pub fn load(path: &Path) -> Result<Self, ProviderConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ProviderConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ProviderConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override `api_key` from `<dir>/<name>_key.json` when present.
    pub fn inject_key(&mut self, dir: &Path) {
        let key_path = dir.join(format!("{}{}", self.name, KEY_FILE_SUFFIX));
        if !key_path.exists() {
            return;
        }

        let parsed = fs::read_to_string(&key_path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<KeyFile>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(KeyFile { key: Some(key) }) if !key.is_empty() => {
                self.api_key = Some(key);
                log::info!("Injected API key for provider: {}", self.name);
            }
            Ok(_) => log::warn!("Key file for {} has no key", self.name),
            Err(e) => log::warn!("Failed to load key file for {}: {}", self.name, e),
        }
    }

    /// The inline key, falling back to the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.api_key_env_var
                    .as_deref()
                    .and_then(|var| env::var(var).ok())
                    .filter(|k| !k.is_empty())
            })
    }

    /// Name to show to humans.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn limits(&self) -> RateLimitConfig {
        self.rate_limit.unwrap_or_default()
    }
}

/// Provider config files in a directory, sorted by file name. Key files and
/// non-JSON files are skipped.
pub fn config_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".json") && !n.ends_with(KEY_FILE_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROQ: &str = r#"{
        "name": "groq",
        "displayName": "Groq",
        "apiUrl": "https://api.groq.com/openai/v1/chat/completions",
        "model": "llama-3.1-8b-instant",
        "apiKeyEnvVar": "FORUM_LABELER_TEST_UNSET_VAR",
        "priority": 2,
        "temperature": 0.1,
        "rateLimit": { "requestsPerMinute": 30, "requestsPerDay": 14400 }
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let config: ProviderConfig = serde_json::from_str(GROQ).unwrap();
        assert_eq!(config.name, "groq");
        assert_eq!(config.label(), "Groq");
        assert!(config.enabled);
        assert_eq!(config.priority, 2);
        assert_eq!(config.max_tokens, 64);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.limits().requests_per_minute, 30);
        assert_eq!(config.limits().tokens_per_day, 0);
    }

    #[test]
    fn test_key_file_overrides_inline_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("groq_key.json"), r#"{"key": "from-file"}"#).unwrap();

        let mut config: ProviderConfig = serde_json::from_str(GROQ).unwrap();
        config.api_key = Some("inline".to_string());
        config.inject_key(dir.path());
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_missing_key_resolves_to_none() {
        let config: ProviderConfig = serde_json::from_str(GROQ).unwrap();
        assert!(config.resolve_api_key().is_none());
    }

    #[test]
    fn test_config_files_skip_key_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("groq.json"), GROQ).unwrap();
        fs::write(dir.path().join("groq_key.json"), r#"{"key":"k"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = config_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("groq.json")]);
    }
}
