pub mod corpus;
pub mod stop_words;
pub mod token;

use indexmap::IndexSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::VectorizeError;
use crate::utils::SparseVec;
use crate::vectorizer::{corpus::Corpus, token::TokenFrequency};

/// Default cap on the vocabulary size
pub const DEFAULT_MAX_FEATURES: usize = 3000;

/// TF-IDF Vectorizer
///
/// Holds the fitted Vocabulary (term -> index, by position in the set)
/// and one smoothed IDF weight per vocabulary index.
/// Immutable once fitted or loaded; `vectorize` takes `&self` and is
/// safe to call from any number of threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    vocabulary: IndexSet<String>,
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    /// Build from a vocabulary and its IDF table, checking they agree.
    pub fn from_parts(vocabulary: IndexSet<String>, idf: Vec<f64>) -> Result<Self, String> {
        let vectorizer = Self { vocabulary, idf };
        vectorizer.check()?;
        Ok(vectorizer)
    }

    /// Fit vocabulary and IDF on a document collection.
    ///
    /// Terms are ranked by total frequency and the top `max_features` kept;
    /// indices are then assigned in lexicographic term order.
    /// idf(t) = ln((1 + n) / (1 + df(t))) + 1
    pub fn fit<T>(docs: &[T], max_features: usize) -> Self
    where
        T: AsRef<str> + Sync,
    {
        let corpus = Corpus::new();
        docs.par_iter()
            .for_each(|doc| corpus.add_doc(&TokenFrequency::from_text(doc.as_ref())));

        let n = corpus.doc_num() as f64;
        let (vocabulary, idf) = corpus
            .top_terms(max_features)
            .into_iter()
            .map(|(term, stat)| (term, ((1.0 + n) / (1.0 + stat.doc_freq as f64)).ln() + 1.0))
            .unzip();
        Self { vocabulary, idf }
    }

    /// False for text that went through a lossy decode (U+FFFD) or carries NUL.
    #[inline]
    pub fn accepts(text: &str) -> bool {
        !text.contains('\0') && !text.contains(char::REPLACEMENT_CHARACTER)
    }

    /// Map text to its L2-normalized TF-IDF vector.
    ///
    /// Terms outside the vocabulary are dropped. A text without known terms
    /// yields the zero vector. Output dimension is always `dim()`.
    pub fn vectorize(&self, text: &str) -> Result<SparseVec<f64>, VectorizeError> {
        if !Self::accepts(text) {
            return Err(VectorizeError::InvalidEncoding);
        }
        let freq = TokenFrequency::from_text(text);
        let mut inds = Vec::with_capacity(freq.len());
        let mut vals = Vec::with_capacity(freq.len());
        for (term, count) in freq.iter() {
            if let Some(index) = self.vocabulary.get_index_of(term) {
                let idf = self
                    .idf
                    .get(index)
                    .copied()
                    .ok_or(VectorizeError::MissingIdf { index })?;
                inds.push(index as u32);
                vals.push(count as f64 * idf);
            }
        }
        let vec = SparseVec::from_unsorted(self.dim() as u32, inds, vals).l2_normalized();
        if vec.values().iter().any(|v| !v.is_finite()) {
            return Err(VectorizeError::NonFinite);
        }
        Ok(vec)
    }

    /// |Vocabulary|
    #[inline]
    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    /// Term at a vocabulary index
    #[inline]
    pub fn term(&self, index: usize) -> Option<&str> {
        self.vocabulary.get_index(index).map(String::as_str)
    }

    /// Vocabulary index of a term
    #[inline]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get_index_of(term)
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// idf table must match the vocabulary and hold positive finite weights
    pub fn check(&self) -> Result<(), String> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(format!(
                "idf table has {} entries for a vocabulary of {}",
                self.idf.len(),
                self.vocabulary.len()
            ));
        }
        if let Some(pos) = self.idf.iter().position(|w| !w.is_finite() || *w <= 0.0) {
            return Err(format!("idf weight at index {pos} is not a positive finite number"));
        }
        if self.vocabulary.len() > u32::MAX as usize {
            return Err("vocabulary exceeds u32 index space".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<&'static str> {
        vec![
            "senate passes budget bill after long debate",
            "aliens secretly control senate shocking truth",
            "budget debate continues in senate",
        ]
    }

    #[test]
    fn fit_assigns_lexicographic_indices_and_smoothed_idf() {
        let v = TfIdfVectorizer::fit(&docs(), 3000);
        let terms: Vec<&str> = (0..v.dim()).filter_map(|i| v.term(i)).collect();
        let mut sorted = terms.clone();
        sorted.sort();
        assert_eq!(terms, sorted);

        // "senate" appears in all 3 docs -> ln(4/4) + 1
        let senate = v.index_of("senate").unwrap();
        assert!((v.idf()[senate] - 1.0).abs() < 1e-12);
        // "aliens" appears once -> ln(4/2) + 1
        let aliens = v.index_of("aliens").unwrap();
        assert!((v.idf()[aliens] - (2.0f64.ln() + 1.0)).abs() < 1e-12);
        assert!(v.index_of("senate passes").is_some());
    }

    #[test]
    fn fit_caps_vocabulary() {
        let v = TfIdfVectorizer::fit(&docs(), 2);
        assert_eq!(v.dim(), 2);
        // senate (3) and budget/debate (2 each) -> budget wins the tie
        assert_eq!(v.term(0), Some("budget"));
        assert_eq!(v.term(1), Some("senate"));
    }

    #[test]
    fn vectorize_is_deterministic_and_unit_length() {
        let v = TfIdfVectorizer::fit(&docs(), 3000);
        let a = v.vectorize("The senate budget debate, unknownword").unwrap();
        let b = v.vectorize("The senate budget debate, unknownword").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len() as usize, v.dim());
        assert!((a.norm_sq() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn vectorize_unknown_text_yields_zero_vector() {
        let v = TfIdfVectorizer::fit(&docs(), 3000);
        let z = v.vectorize("completely unrelated words").unwrap();
        assert!(z.is_empty());
        assert_eq!(z.len() as usize, v.dim());
    }

    #[test]
    fn vectorize_rejects_lossy_text() {
        let v = TfIdfVectorizer::fit(&docs(), 3000);
        assert_eq!(v.vectorize("senate\u{FFFD}"), Err(VectorizeError::InvalidEncoding));
        assert_eq!(v.vectorize("senate\0"), Err(VectorizeError::InvalidEncoding));
    }

    #[test]
    fn from_parts_rejects_mismatched_idf() {
        let vocab: IndexSet<String> = ["a1".to_string(), "b2".to_string()].into_iter().collect();
        assert!(TfIdfVectorizer::from_parts(vocab.clone(), vec![1.0]).is_err());
        assert!(TfIdfVectorizer::from_parts(vocab.clone(), vec![1.0, f64::NAN]).is_err());
        assert!(TfIdfVectorizer::from_parts(vocab, vec![1.0, 2.0]).is_ok());
    }
}
