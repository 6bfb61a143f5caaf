//! Term Caches
//!
//! Three denylists/allowlists consulted by the validator:
//!
//! - [`TermCache`]: confirmed surface forms and lemmas, persisted per forum
//! - [`RejectedTerms`]: bounded LRU of surfaces the LLM rejected this session
//! - [`BlockedTerms`]: read-only, case-sensitive denylist loaded at startup

pub mod blocked;
pub mod rejected;
pub mod terms;

pub use blocked::BlockedTerms;
pub use rejected::{RejectedTerms, DEFAULT_REJECTED_TERMS_LIMIT};
pub use terms::TermCache;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total cache lookups
    pub lookups: u64,
    /// Cache hits
    pub hits: u64,
    /// Cache misses
    pub misses: u64,
}

impl CacheStats {
    /// Get hit rate as percentage
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.hits as f64 / self.lookups as f64) * 100.0
        }
    }

    fn record(&mut self, hit: bool) {
        self.lookups += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Read a newline-delimited set file. Lines are trimmed; blank lines and
/// `#` comments are skipped.
pub(crate) fn read_set_file(path: &Path) -> std::io::Result<HashSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
