use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use dashmap::DashMap;

use crate::vectorizer::token::TokenFrequency;

/// Corpus-wide statistics of one term
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermStat {
    /// number of documents containing the term
    pub doc_freq: u64,
    /// occurrences across all documents
    pub total_count: u64,
}

/// keep document count and term statistics in a thread-safe way
/// so documents can be added from a rayon pool while fitting
#[derive(Debug, Default)]
pub struct Corpus {
    doc_num: AtomicU64,
    term_stats: DashMap<Box<str>, TermStat, RandomState>,
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            doc_num: AtomicU64::new(0),
            term_stats: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Add one document's term counts
    pub fn add_doc(&self, doc: &TokenFrequency) {
        self.doc_num.fetch_add(1, Ordering::Relaxed);
        for (term, count) in doc.iter() {
            self.term_stats
                .entry(term.into())
                .and_modify(|stat| {
                    stat.doc_freq += 1;
                    stat.total_count += count as u64;
                })
                .or_insert(TermStat { doc_freq: 1, total_count: count as u64 });
        }
    }

    /// Get the number of documents in the corpus
    pub fn doc_num(&self) -> u64 {
        self.doc_num.load(Ordering::Relaxed)
    }

    pub fn term_stat(&self, term: &str) -> TermStat {
        self.term_stats.get(term).map_or(TermStat::default(), |s| *s)
    }

    /// The `limit` most frequent terms (total occurrences descending,
    /// ties by term ascending), returned in lexicographic order.
    pub fn top_terms(&self, limit: usize) -> Vec<(String, TermStat)> {
        let mut all: Vec<(String, TermStat)> = self
            .term_stats
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect();
        all.sort_by(|a, b| b.1.total_count.cmp(&a.1.total_count).then_with(|| a.0.cmp(&b.0)));
        all.truncate(limit);
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
