//! Term/Lemma Cache
//!
//! Confirmed lowercase surface forms and lemmas for one forum. The cache only
//! grows during a run; it is the reason a surface form costs at most one
//! lemmatizer or LLM call across runs.
//!
//! Files: `<data_dir>/<forum>/terms_seen.txt` and `lemmas_seen.txt`, one entry
//! per line, sorted on save.

use super::{read_set_file, CacheStats};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const TERMS_FILE: &str = "terms_seen.txt";
const LEMMAS_FILE: &str = "lemmas_seen.txt";

/// Persistent sets of confirmed surfaces and lemmas.
#[derive(Debug)]
pub struct TermCache {
    terms_path: PathBuf,
    lemmas_path: PathBuf,
    terms: HashSet<String>,
    lemmas: HashSet<String>,
    stats: CacheStats,
}

impl TermCache {
    /// Create an empty cache backed by the given files.
    pub fn new(terms_path: impl Into<PathBuf>, lemmas_path: impl Into<PathBuf>) -> Self {
        Self {
            terms_path: terms_path.into(),
            lemmas_path: lemmas_path.into(),
            terms: HashSet::new(),
            lemmas: HashSet::new(),
            stats: CacheStats::default(),
        }
    }

    /// Create an empty cache for a forum under the data directory.
    pub fn for_forum(data_dir: &Path, forum: &str) -> Self {
        let forum_dir = data_dir.join(forum);
        Self::new(forum_dir.join(TERMS_FILE), forum_dir.join(LEMMAS_FILE))
    }

    /// Load both sets from disk. Missing or unreadable files give empty sets.
    pub fn load(&mut self) {
        self.terms = load_or_empty(&self.terms_path);
        self.lemmas = load_or_empty(&self.lemmas_path);
        log::info!(
            "Cache loaded: terms={}, lemmas={}",
            self.terms.len(),
            self.lemmas.len()
        );
    }

    /// Write both sets, sorted, creating parent directories.
    pub fn save(&self) -> std::io::Result<()> {
        save_sorted(&self.terms_path, &self.terms)?;
        save_sorted(&self.lemmas_path, &self.lemmas)?;
        log::debug!(
            "Cache saved: terms={}, lemmas={}",
            self.terms.len(),
            self.lemmas.len()
        );
        Ok(())
    }

    /// Look up a confirmed surface form.
    pub fn contains_term(&mut self, term: &str) -> bool {
        let hit = self.terms.contains(term);
        self.stats.record(hit);
        hit
    }

    pub fn contains_lemma(&self, lemma: &str) -> bool {
        self.lemmas.contains(lemma)
    }

    pub fn add_term(&mut self, term: &str) {
        if !self.terms.contains(term) {
            self.terms.insert(term.to_string());
        }
    }

    pub fn add_lemma(&mut self, lemma: &str) {
        if !self.lemmas.contains(lemma) {
            self.lemmas.insert(lemma.to_string());
        }
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn lemma_count(&self) -> usize {
        self.lemmas.len()
    }

    pub fn terms(&self) -> &HashSet<String> {
        &self.terms
    }

    pub fn lemmas(&self) -> &HashSet<String> {
        &self.lemmas
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

fn load_or_empty(path: &Path) -> HashSet<String> {
    if !path.exists() {
        return HashSet::new();
    }
    match read_set_file(path) {
        Ok(set) => {
            log::debug!("Loaded {} entries from {}", set.len(), path.display());
            set
        }
        Err(e) => {
            log::warn!("Failed to load cache file {}: {}", path.display(), e);
            HashSet::new()
        }
    }
}

fn save_sorted(path: &Path, set: &HashSet<String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut lines: Vec<&str> = set.iter().map(String::as_str).collect();
    lines.sort_unstable();
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TermCache::for_forum(dir.path(), "israfish");
        cache.add_term("карпа");
        cache.add_term("сомы");
        cache.add_lemma("карп");
        cache.save().unwrap();

        let mut reloaded = TermCache::for_forum(dir.path(), "israfish");
        reloaded.load();
        assert_eq!(reloaded.terms(), cache.terms());
        assert_eq!(reloaded.lemmas(), cache.lemmas());
    }

    #[test]
    fn test_save_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let terms = dir.path().join("nested/terms.txt");
        let lemmas = dir.path().join("nested/lemmas.txt");
        let mut cache = TermCache::new(&terms, &lemmas);
        cache.add_term("сом");
        cache.add_term("карп");
        cache.add_term("амур");
        cache.save().unwrap();

        let content = fs::read_to_string(&terms).unwrap();
        assert_eq!(content, "амур\nкарп\nсом\n");
        assert_eq!(fs::read_to_string(&lemmas).unwrap(), "");
    }

    #[test]
    fn test_load_missing_files_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TermCache::for_forum(dir.path(), "nowhere");
        cache.load();
        assert_eq!(cache.term_count(), 0);
        assert_eq!(cache.lemma_count(), 0);
    }

    #[test]
    fn test_lookup_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TermCache::for_forum(dir.path(), "f");
        cache.add_term("карпа");

        assert!(cache.contains_term("карпа"));
        assert!(!cache.contains_term("сома"));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }
}
