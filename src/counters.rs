//! Term Counters
//!
//! How often each dictionary value and each confirmed surface form was found.
//! Counts carry over between runs: on creation the newest
//! `<base>_counters*.json` in the output directory is merged in, and each run
//! writes its own timestamped file.
//!
//! ```json
//! {
//!   "dictionary": [ { "value": "карп", "found": 12 } ],
//!   "text": [ { "value": "карпа", "found": 7 } ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CountItem {
    value: String,
    found: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CountersFile {
    #[serde(default)]
    dictionary: Vec<CountItem>,
    #[serde(default)]
    text: Vec<CountItem>,
}

/// Dictionary-value and surface-form counts for a labeling run.
#[derive(Debug)]
pub struct CountersManager {
    path: PathBuf,
    dictionary: BTreeMap<String, u64>,
    surfaces: BTreeMap<String, u64>,
}

impl CountersManager {
    /// Create counters for `output_file_name` (e.g. `israfish_ru.json`) in
    /// `output_dir`, merging the newest previous counters file.
    pub fn new(output_dir: &Path, output_file_name: &str) -> Self {
        let base = output_file_name
            .strip_suffix(".json")
            .unwrap_or(output_file_name);
        let mut counters = Self {
            path: unique_path(output_dir, base),
            dictionary: BTreeMap::new(),
            surfaces: BTreeMap::new(),
        };

        if let Some(latest) = find_latest(output_dir, base) {
            match counters.merge_file(&latest) {
                Ok(()) => log::info!("Merged existing counters from {}", latest.display()),
                Err(e) => log::warn!("Failed to merge counters {}: {}", latest.display(), e),
            }
        }
        counters
    }

    fn merge_file(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let file: CountersFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        for item in file.dictionary {
            *self.dictionary.entry(item.value).or_default() += item.found;
        }
        for item in file.text {
            *self.surfaces.entry(item.value).or_default() += item.found;
        }
        Ok(())
    }

    pub fn increment_dictionary(&mut self, value: &str) {
        *self.dictionary.entry(value.to_string()).or_default() += 1;
    }

    pub fn increment_surface(&mut self, surface: &str) {
        *self.surfaces.entry(surface.to_string()).or_default() += 1;
    }

    pub fn dictionary_count(&self, value: &str) -> u64 {
        self.dictionary.get(value).copied().unwrap_or(0)
    }

    pub fn surface_count(&self, surface: &str) -> u64 {
        self.surfaces.get(surface).copied().unwrap_or(0)
    }

    pub fn dictionary_total(&self) -> u64 {
        self.dictionary.values().sum()
    }

    pub fn surface_total(&self) -> u64 {
        self.surfaces.values().sum()
    }

    /// File this run writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all counts, creating the output directory.
    pub fn save(&self) -> std::io::Result<()> {
        let file = CountersFile {
            dictionary: to_items(&self.dictionary),
            text: to_items(&self.surfaces),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, json)
    }
}

fn to_items(counts: &BTreeMap<String, u64>) -> Vec<CountItem> {
    counts
        .iter()
        .map(|(value, found)| CountItem {
            value: value.clone(),
            found: *found,
        })
        .collect()
}

fn unique_path(output_dir: &Path, base: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let path = output_dir.join(format!("{}_counters_{}.json", base, stamp));
    if !path.exists() {
        return path;
    }
    let millis = chrono::Utc::now().timestamp_millis();
    output_dir.join(format!("{}_counters_{}_{}.json", base, stamp, millis))
}

/// Newest `<base>_counters*.json` by modification time, then by name.
fn find_latest(output_dir: &Path, base: &str) -> Option<PathBuf> {
    let prefix = format!("{}_counters", base);
    fs::read_dir(output_dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .max_by_key(|path| {
            let modified = fs::metadata(path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path.clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let mut counters = CountersManager::new(dir.path(), "israfish_ru.json");
        counters.increment_dictionary("карп");
        counters.increment_dictionary("карп");
        counters.increment_surface("карпа");

        assert_eq!(counters.dictionary_count("карп"), 2);
        assert_eq!(counters.surface_count("карпа"), 1);
        assert_eq!(counters.dictionary_total(), 2);
        assert_eq!(counters.surface_total(), 1);
    }

    #[test]
    fn test_save_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut counters = CountersManager::new(dir.path(), "israfish_ru.json");
        counters.increment_dictionary("сом");
        counters.save().unwrap();

        let name = counters.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("israfish_ru_counters_"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(counters.path()).unwrap()).unwrap();
        assert_eq!(json["dictionary"][0]["value"], "сом");
        assert_eq!(json["dictionary"][0]["found"], 1);
        assert!(json["text"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_merges_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("israfish_ru_counters_2024-01-01_00-00-00.json"),
            r#"{"dictionary":[{"value":"карп","found":3}],"text":[{"value":"карпа","found":2}]}"#,
        )
        .unwrap();

        let mut counters = CountersManager::new(dir.path(), "israfish_ru.json");
        counters.increment_dictionary("карп");
        assert_eq!(counters.dictionary_count("карп"), 4);
        assert_eq!(counters.surface_count("карпа"), 2);
    }

    #[test]
    fn test_corrupt_previous_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f_counters_old.json"), "not json").unwrap();

        let counters = CountersManager::new(dir.path(), "f.json");
        assert_eq!(counters.dictionary_total(), 0);
    }
}
