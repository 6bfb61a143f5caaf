//! Candidate Generator
//!
//! Finds every occurrence of every dictionary value inside a normalized
//! sentence. Matching is a case-insensitive substring search followed by
//! expansion to the surrounding alphanumeric word, so `карп` inside `карпа`
//! yields the surface `карпа`.
//!
//! Offsets are character offsets into the normalized sentence.

use crate::dictionary::{DictValue, DictionaryEntry};

/// A single occurrence of a dictionary value in a sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'d> {
    /// Word containing the match, original case
    pub surface: String,
    /// First character of the word
    pub start: usize,
    /// One past the last character of the word
    pub end: usize,
    pub canonical: &'d str,
    pub entry_type: &'d str,
    pub uid: &'d str,
    pub dict_value: &'d DictValue,
}

struct FoldedValue {
    entry: usize,
    value: usize,
    chars: Vec<char>,
}

/// Scans sentences against a fixed dictionary.
pub struct CandidateGenerator {
    entries: Vec<DictionaryEntry>,
    folded: Vec<FoldedValue>,
}

impl CandidateGenerator {
    /// Build a generator. Entries without a canonical value never produce
    /// candidates.
    pub fn new(entries: Vec<DictionaryEntry>) -> Self {
        let mut folded = Vec::new();
        for (e, entry) in entries.iter().enumerate() {
            if entry.canonical().is_none() {
                log::debug!("Entry {} has no canonical value, skipping", entry.uid);
                continue;
            }
            for (v, value) in entry.values.iter().enumerate() {
                folded.push(FoldedValue {
                    entry: e,
                    value: v,
                    chars: fold(&value.value),
                });
            }
        }
        Self { entries, folded }
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// Cheap check: does the sentence contain any dictionary value at all.
    pub fn contains_any_value(&self, sentence: &str) -> bool {
        let haystack = fold(sentence);
        self.folded
            .iter()
            .any(|v| find_from(&haystack, &v.chars, 0).is_some())
    }

    /// All candidates in entry, then value, then position order.
    pub fn generate(&self, sentence: &str) -> Vec<Candidate<'_>> {
        let chars: Vec<char> = sentence.chars().collect();
        let haystack = fold(sentence);
        let mut candidates = Vec::new();

        for folded in &self.folded {
            let entry = &self.entries[folded.entry];
            let Some(canonical) = entry.canonical() else {
                continue;
            };
            let dict_value = &entry.values[folded.value];

            let mut from = 0;
            while let Some(idx) = find_from(&haystack, &folded.chars, from) {
                let end = idx + folded.chars.len();
                let (word_start, word_end) = expand_word(&chars, idx, end);

                candidates.push(Candidate {
                    surface: chars[word_start..word_end].iter().collect(),
                    start: word_start,
                    end: word_end,
                    canonical,
                    entry_type: &entry.entry_type,
                    uid: &entry.uid,
                    dict_value,
                });

                from = end;
            }
        }

        candidates
    }
}

/// Collapse whitespace runs and drop everything that is neither a letter nor
/// whitespace.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(text)
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect()
}

/// Replace whitespace runs with a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-character lowercase, keeping one char per input char so offsets line up.
fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn expand_word(chars: &[char], start: usize, end: usize) -> (usize, usize) {
    let mut word_start = start;
    let mut word_end = end;
    while word_start > 0 && chars[word_start - 1].is_alphanumeric() {
        word_start -= 1;
    }
    while word_end < chars.len() && chars[word_end].is_alphanumeric() {
        word_end += 1;
    }
    (word_start, word_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Specificity;

    fn carp_entry() -> DictionaryEntry {
        DictionaryEntry::new(
            "carp",
            "fish",
            vec![
                DictValue::new("карп", Specificity::Canonical).unwrap(),
                DictValue::new("карпик", Specificity::Variant).unwrap(),
            ],
        )
    }

    #[test]
    fn test_expands_to_word() {
        let gen = CandidateGenerator::new(vec![carp_entry()]);
        let candidates = gen.generate("Поймал Карпа вчера");

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.surface, "Карпа");
        assert_eq!((c.start, c.end), (7, 12));
        assert_eq!(c.canonical, "карп");
        assert_eq!(c.entry_type, "fish");
    }

    #[test]
    fn test_overlapping_values_all_emitted() {
        let gen = CandidateGenerator::new(vec![carp_entry()]);
        let candidates = gen.generate("маленький карпик и большой карп");

        let found: Vec<(&str, &str, usize)> = candidates
            .iter()
            .map(|c| (c.dict_value.value.as_str(), c.surface.as_str(), c.start))
            .collect();
        assert_eq!(
            found,
            vec![
                ("карп", "карпик", 10),
                ("карп", "карп", 27),
                ("карпик", "карпик", 10),
            ]
        );
    }

    #[test]
    fn test_entry_without_canonical_ignored() {
        let entry = DictionaryEntry::new(
            "x",
            "fish",
            vec![DictValue::new("сом", Specificity::Variant).unwrap()],
        );
        let gen = CandidateGenerator::new(vec![entry]);
        assert!(gen.generate("большой сом").is_empty());
        assert!(!gen.contains_any_value("большой сом"));
    }

    #[test]
    fn test_contains_any_value_is_case_insensitive() {
        let gen = CandidateGenerator::new(vec![carp_entry()]);
        assert!(gen.contains_any_value("КАРП плывёт"));
        assert!(!gen.contains_any_value("щука плывёт"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Карп,   сом!\tи 3 щуки. "), "Карп сом и  щуки");
    }
}
