//! Sentence Labeler
//!
//! Drives the pipeline over forum topics: splits text into sentences, applies
//! the cheap pre-filters, validates candidates and collects labeled
//! sentences. The term cache is saved every `cache_save_interval` labeled
//! sentences and on [`SentencesLabeler::flush`], which also runs on drop.

use super::validator::Validator;
use super::PipelineResult;
use crate::cache::{BlockedTerms, RejectedTerms, TermCache};
use crate::candidates::{collapse_whitespace, normalize, CandidateGenerator};
use crate::config::LabelerConfig;
use crate::counters::CountersManager;
use crate::dictionary::load_dictionaries;
use crate::language::LanguageProfile;
use crate::lemma::create_lemmatizer;
use crate::llm::{LlmJudge, ProviderPool, TermJudge};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One labeled occurrence in a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelEntry {
    pub surface: String,
    pub canonical: String,
    /// The matched value when it was not the canonical name
    pub variant: Option<String>,
    pub start: usize,
    pub end: usize,
    pub is_valid: bool,
}

/// A sentence with at least one valid label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledSentence {
    pub forum_url: String,
    pub topic_url: String,
    pub lang: String,
    /// Sentence with whitespace collapsed
    pub text: String,
    /// Letters and spaces only; label offsets refer to this text
    pub normalized: String,
    pub valid_labels: Vec<LabelEntry>,
    pub invalid_labels: Vec<LabelEntry>,
}

/// Summary of a labeling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelingMetadata {
    pub language: String,
    pub extraction_date: String,
    pub total_sentences: usize,
    pub total_labels_loaded: usize,
    pub total_topics_processed: usize,
}

/// A forum topic to label.
#[derive(Debug, Clone, Default)]
pub struct Topic {
    pub forum_url: String,
    pub topic_url: String,
    pub content: String,
}

/// Whether the run can take more topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Continue,
    /// `max_sentences` reached
    Stopped,
}

/// Per-topic sentence counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicStats {
    pub raw: usize,
    pub short: usize,
    pub language_filtered: usize,
    pub no_candidate: usize,
    /// Had candidates, none valid
    pub unlabeled: usize,
    pub labeled: usize,
}

/// Result of [`SentencesLabeler::process_topic`].
#[derive(Debug, Clone)]
pub struct TopicOutcome {
    pub sentences: Vec<LabeledSentence>,
    pub stats: TopicStats,
    pub status: ProcessStatus,
}

/// Tunables of the sentence driver.
#[derive(Debug, Clone, Copy)]
pub struct LabelerOptions {
    pub min_sentence_length: usize,
    /// 0 means no limit
    pub max_sentences: usize,
    /// 0 disables periodic saves
    pub cache_save_interval: usize,
}

impl Default for LabelerOptions {
    fn default() -> Self {
        Self {
            min_sentence_length: 15,
            max_sentences: 0,
            cache_save_interval: 5,
        }
    }
}

enum SentenceOutcome {
    TooShort,
    OtherLanguage,
    NoCandidate,
    Unlabeled,
    Labeled(LabeledSentence),
}

/// Labels forum text against a dictionary.
pub struct SentencesLabeler {
    options: LabelerOptions,
    profile: LanguageProfile,
    generator: CandidateGenerator,
    validator: Validator,
    counters: Option<CountersManager>,
    sentences_labeled: usize,
    labels_added: usize,
    topics_processed: usize,
    last_cache_save: usize,
    stopped: bool,
}

impl SentencesLabeler {
    pub fn new(
        options: LabelerOptions,
        profile: LanguageProfile,
        generator: CandidateGenerator,
        validator: Validator,
        counters: Option<CountersManager>,
    ) -> Self {
        Self {
            options,
            profile,
            generator,
            validator,
            counters,
            sentences_labeled: 0,
            labels_added: 0,
            topics_processed: 0,
            last_cache_save: 0,
            stopped: false,
        }
    }

    /// Wire up a labeler from configuration: dictionary, caches, lemmatizer,
    /// provider pool and counters.
    pub fn from_config(config: &LabelerConfig) -> PipelineResult<Self> {
        let language = config.language()?;
        let section = &config.labeler;

        let entries = load_dictionaries(&section.dictionary_paths, Some(language.code()))?;
        log::info!("Dictionary loaded: {} entries", entries.len());

        let forum_dir = config.forum_data_dir();
        let mut term_cache = TermCache::for_forum(&section.data_dir, &section.forum_name);
        term_cache.load();

        let blocked = BlockedTerms::resolve(&section.dictionary_paths, &forum_dir, Some(language.code()));
        let rejected = RejectedTerms::new(section.rejected_terms_limit);
        let lemmatizer = create_lemmatizer(
            language.code(),
            &config.lemmatizer.url,
            config.lemmatizer.timeout(),
        );

        let judge: Option<Box<dyn TermJudge>> = match &config.llm.config_dir {
            Some(dir) => {
                let pool = ProviderPool::from_dir(dir);
                if pool.is_empty() {
                    log::warn!("No LLM providers available, escalations will be rejected");
                    None
                } else {
                    let mut judge = LlmJudge::new(pool);
                    if let Some(audit) = &config.llm.audit_log {
                        judge = judge.with_audit_log(audit);
                    }
                    Some(Box::new(judge))
                }
            }
            None => None,
        };

        let validator = Validator::new(language, term_cache, rejected, blocked, lemmatizer, judge);
        let counters = CountersManager::new(&section.output_dir, &config.output_file_name());

        Ok(Self::new(
            LabelerOptions {
                min_sentence_length: section.min_sentence_length,
                max_sentences: section.max_sentences,
                cache_save_interval: section.cache_save_interval,
            },
            LanguageProfile::new(language, section.min_language_ratio),
            CandidateGenerator::new(entries),
            validator,
            Some(counters),
        ))
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn counters(&self) -> Option<&CountersManager> {
        self.counters.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Label one sentence. `None` when it is filtered out, has no valid
    /// label, or the labeler has stopped at `max_sentences`.
    pub fn label_sentence(&mut self, text: &str) -> PipelineResult<Option<LabeledSentence>> {
        if self.stopped {
            return Ok(None);
        }
        match self.label(text, "", "")? {
            SentenceOutcome::Labeled(sentence) => {
                self.record_labeled(&sentence);
                Ok(Some(sentence))
            }
            _ => Ok(None),
        }
    }

    /// Label every sentence of a topic until `max_sentences` is reached.
    pub fn process_topic(&mut self, topic: &Topic) -> PipelineResult<TopicOutcome> {
        let mut outcome = TopicOutcome {
            sentences: Vec::new(),
            stats: TopicStats::default(),
            status: ProcessStatus::Continue,
        };
        if self.stopped {
            outcome.status = ProcessStatus::Stopped;
            return Ok(outcome);
        }

        let content = collapse_whitespace(&topic.content);
        if content.is_empty() {
            return Ok(outcome);
        }

        for raw in self.profile.split_sentences(&content) {
            outcome.stats.raw += 1;
            match self.label(raw, &topic.forum_url, &topic.topic_url)? {
                SentenceOutcome::TooShort => outcome.stats.short += 1,
                SentenceOutcome::OtherLanguage => outcome.stats.language_filtered += 1,
                SentenceOutcome::NoCandidate => outcome.stats.no_candidate += 1,
                SentenceOutcome::Unlabeled => outcome.stats.unlabeled += 1,
                SentenceOutcome::Labeled(sentence) => {
                    outcome.stats.labeled += 1;
                    self.record_labeled(&sentence);
                    outcome.sentences.push(sentence);
                    if self.stopped {
                        outcome.status = ProcessStatus::Stopped;
                        break;
                    }
                }
            }
        }
        self.topics_processed += 1;

        let stats = outcome.stats;
        if stats.labeled == 0 && stats.raw > 0 {
            log::info!(
                "Topic {}: {} total, {} short, {} lang, {} no candidate, {} labeled",
                topic.topic_url,
                stats.raw,
                stats.short,
                stats.language_filtered,
                stats.no_candidate,
                stats.labeled
            );
        }

        Ok(outcome)
    }

    /// Save the term cache and counters. Failures are logged.
    pub fn flush(&mut self) {
        let stats = self.validator.term_cache().stats();
        if stats.lookups > 0 {
            log::info!(
                "Term cache: {} lookups, {} hits, {:.1}% hit rate",
                stats.lookups,
                stats.hits,
                stats.hit_rate()
            );
        }
        if let Err(e) = self.validator.save_cache() {
            log::error!("Failed to save term cache: {}", e);
        }
        if let Some(counters) = &self.counters {
            if let Err(e) = counters.save() {
                log::error!("Failed to save counters {}: {}", counters.path().display(), e);
            }
        }
        self.last_cache_save = self.sentences_labeled;
    }

    /// Totals for the run so far.
    pub fn result(&self) -> LabelingMetadata {
        LabelingMetadata {
            language: self.profile.language.code().to_string(),
            extraction_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            total_sentences: self.sentences_labeled,
            total_labels_loaded: self.labels_added,
            total_topics_processed: self.topics_processed,
        }
    }

    fn label(&mut self, raw: &str, forum_url: &str, topic_url: &str) -> PipelineResult<SentenceOutcome> {
        if raw.chars().count() < self.options.min_sentence_length {
            return Ok(SentenceOutcome::TooShort);
        }
        let text = collapse_whitespace(raw);
        if text.is_empty() || !self.profile.is_target_language(&text) {
            return Ok(SentenceOutcome::OtherLanguage);
        }

        let normalized = normalize(&text);
        if !self.generator.contains_any_value(&normalized) {
            return Ok(SentenceOutcome::NoCandidate);
        }

        let mut valid_labels = Vec::new();
        let mut invalid_labels = Vec::new();
        let mut valid_spans: HashSet<(&str, usize, usize)> = HashSet::new();

        for candidate in self.generator.generate(&normalized) {
            let span = (candidate.uid, candidate.start, candidate.end);
            if valid_spans.contains(&span) {
                continue;
            }

            let decision = self.validator.validate(&candidate, &normalized)?;
            let entry = LabelEntry {
                surface: candidate.surface.clone(),
                canonical: candidate.canonical.to_string(),
                variant: candidate
                    .dict_value
                    .specificity
                    .is_variant()
                    .then(|| candidate.dict_value.value.clone()),
                start: candidate.start,
                end: candidate.end,
                is_valid: decision.is_valid(),
            };

            if decision.is_valid() {
                if let Some(counters) = self.counters.as_mut() {
                    counters.increment_dictionary(&candidate.dict_value.value);
                    counters.increment_surface(&candidate.surface);
                }
                valid_spans.insert(span);
                valid_labels.push(entry);
            } else {
                invalid_labels.push(entry);
            }
        }

        if valid_labels.is_empty() {
            return Ok(SentenceOutcome::Unlabeled);
        }

        Ok(SentenceOutcome::Labeled(LabeledSentence {
            forum_url: forum_url.to_string(),
            topic_url: topic_url.to_string(),
            lang: self.profile.language.code().to_string(),
            text,
            normalized,
            valid_labels,
            invalid_labels,
        }))
    }

    fn record_labeled(&mut self, sentence: &LabeledSentence) {
        self.sentences_labeled += 1;
        self.labels_added += sentence.valid_labels.len();

        if self.sentences_labeled % 10 == 0 {
            let cache = self.validator.term_cache();
            log::info!(
                "Labeled {} sentences (terms: {}, lemmas: {}, cache hit rate: {:.1}%)",
                self.sentences_labeled,
                cache.term_count(),
                cache.lemma_count(),
                cache.stats().hit_rate()
            );
        }

        let max = self.options.max_sentences;
        if max > 0 && self.sentences_labeled >= max {
            log::info!("Max sentences reached: {}", max);
            self.stopped = true;
        }

        let interval = self.options.cache_save_interval;
        if interval > 0 && self.sentences_labeled - self.last_cache_save >= interval {
            if let Err(e) = self.validator.save_cache() {
                log::error!("Failed to save term cache: {}", e);
            }
            self.last_cache_save = self.sentences_labeled;
        }
    }
}

impl Drop for SentencesLabeler {
    fn drop(&mut self) {
        self.flush();
    }
}
