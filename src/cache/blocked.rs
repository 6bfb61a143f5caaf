//! Blocked-Terms Set
//!
//! Operator-maintained, case-sensitive denylist, e.g. a personal name that
//! collides with a species name. Loaded once, never modified.
//!
//! For a dictionary `dictionaries/species_dict.json` and language `ru` the file
//! is `ru_species_blocked_terms.txt`, looked up next to the dictionary first and
//! then in the forum data directory.

use super::read_set_file;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Read-only, case-sensitive set of surfaces that are never labels.
#[derive(Debug, Clone, Default)]
pub struct BlockedTerms {
    terms: HashSet<String>,
    source: Option<PathBuf>,
}

impl BlockedTerms {
    /// An empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from in-memory terms.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            source: None,
        }
    }

    /// Load from a newline-delimited file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            terms: read_set_file(path)?,
            source: Some(path.to_path_buf()),
        })
    }

    /// Find and load the blocked-terms file for a dictionary. A missing or
    /// unreadable file results in an empty set.
    pub fn resolve(
        dictionary_paths: &[PathBuf],
        forum_data_dir: &Path,
        language: Option<&str>,
    ) -> Self {
        let Some(path) = dictionary_paths
            .first()
            .and_then(|dict| derive_path(dict, forum_data_dir, language))
        else {
            log::info!("No blocked terms file found");
            return Self::empty();
        };

        match Self::load(&path) {
            Ok(blocked) => {
                log::info!(
                    "Blocked terms loaded: {} terms from {}",
                    blocked.len(),
                    path.display()
                );
                blocked
            }
            Err(e) => {
                log::error!("Failed to load blocked terms {}: {}", path.display(), e);
                Self::empty()
            }
        }
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, surface: &str) -> bool {
        self.terms.contains(surface)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// File the set was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// File name of the blocked-terms list for a dictionary file name.
pub fn blocked_file_name(dictionary_file: &str, language: Option<&str>) -> String {
    let base = if let Some(stem) = dictionary_file.strip_suffix("_dict.json") {
        format!("{}_blocked_terms.txt", stem)
    } else if let Some(stem) = dictionary_file.strip_suffix(".json") {
        format!("{}_blocked_terms.txt", stem)
    } else {
        dictionary_file.to_string()
    };

    match language {
        Some(lang) => format!("{}_{}", lang.to_lowercase(), base),
        None => base,
    }
}

/// First existing blocked-terms file: next to the dictionary, then in the
/// forum data directory.
pub fn derive_path(
    dictionary_path: &Path,
    forum_data_dir: &Path,
    language: Option<&str>,
) -> Option<PathBuf> {
    let file_name = dictionary_path.file_name()?.to_str()?;
    let blocked_name = blocked_file_name(file_name, language);

    let beside_dictionary = dictionary_path
        .parent()
        .map(|dir| dir.join(&blocked_name));
    let in_forum_dir = Some(forum_data_dir.join(&blocked_name));

    [beside_dictionary, in_forum_dir]
        .into_iter()
        .flatten()
        .find(|p| p.exists())
}
