use rayon::prelude::*;
use tracing::warn;

use crate::utils::{sparse::cosine_with_norms, SparseVec};

/// Nearest reference article to a query
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<'a> {
    /// insertion-order index in the Reference Corpus
    pub index: usize,
    /// 1 - cosine similarity
    pub distance: f64,
    pub text: &'a str,
}

/// Outcome of a nearest-neighbor lookup. Degraded outcomes are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Similarity<'a> {
    Found(Neighbor<'a>),
    /// No reference article loaded
    EmptyCorpus,
    /// Query does not fit the index
    Unavailable,
}

/// Reference Corpus of known-real articles with precomputed norms.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    dim: u32,
    vectors: Vec<SparseVec<f64>>,
    norms: Vec<f64>,
    texts: Vec<String>,
}

impl SimilarityIndex {
    /// Build the index; every vector must have dimension `dim`
    /// and there must be exactly one text per vector.
    pub fn new(dim: u32, vectors: Vec<SparseVec<f64>>, texts: Vec<String>) -> Result<Self, String> {
        if vectors.len() != texts.len() {
            return Err(format!("{} reference vectors but {} texts", vectors.len(), texts.len()));
        }
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(format!("reference vector {i} has dimension {}, expected {dim}", v.len()));
            }
            v.check().map_err(|e| format!("reference vector {i}: {e}"))?;
            if v.values().iter().any(|x| !x.is_finite() || *x < 0.0) {
                return Err(format!("reference vector {i} holds a negative or non-finite weight"));
            }
        }
        let norms = vectors.par_iter().map(|v| v.norm_sq().sqrt()).collect();
        Ok(Self { dim, vectors, norms, texts })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        self.texts.get(index).map(String::as_str)
    }

    /// Entry with the smallest cosine distance to `query`.
    /// Equal distances resolve to the lowest index.
    pub fn nearest(&self, query: &SparseVec<f64>) -> Similarity<'_> {
        if self.is_empty() {
            return Similarity::EmptyCorpus;
        }
        if query.len() != self.dim {
            warn!(stage = "similarity", expected = self.dim, got = query.len(), "query dimension mismatch");
            return Similarity::Unavailable;
        }
        let query_norm = query.norm_sq().sqrt();
        let best = self
            .vectors
            .par_iter()
            .zip(self.norms.par_iter())
            .enumerate()
            .map(|(i, (v, &norm))| {
                let distance = 1.0 - cosine_with_norms(query, query_norm, v, norm);
                (i, if distance.is_finite() { distance } else { f64::INFINITY })
            })
            .reduce_with(|a, b| {
                if b.1 < a.1 || (b.1 == a.1 && b.0 < a.0) {
                    b
                } else {
                    a
                }
            });
        match best.and_then(|(index, distance)| self.text(index).map(|text| (index, distance, text))) {
            Some((index, distance, text)) => Similarity::Found(Neighbor { index, distance, text }),
            None => {
                warn!(stage = "similarity", "nearest entry has no reference text");
                Similarity::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse(entries: &[(u32, f64)]) -> SparseVec<f64> {
        let (i, v) = entries.iter().copied().unzip();
        SparseVec::from_unsorted(4, i, v)
    }

    fn index(vectors: Vec<SparseVec<f64>>) -> SimilarityIndex {
        let texts = (0..vectors.len()).map(|i| format!("article {i}")).collect();
        SimilarityIndex::new(4, vectors, texts).unwrap()
    }

    #[test]
    fn finds_the_closest_direction() {
        let idx = index(vec![sparse(&[(0, 1.0)]), sparse(&[(1, 1.0), (2, 0.1)]), sparse(&[(3, 1.0)])]);
        match idx.nearest(&sparse(&[(1, 2.0)])) {
            Similarity::Found(n) => {
                assert_eq!(n.index, 1);
                assert_eq!(n.text, "article 1");
                assert!(n.distance < 0.01);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn equal_distances_resolve_to_lowest_index() {
        let vectors = (0..200).map(|_| sparse(&[(2, 1.0)])).collect();
        let idx = index(vectors);
        for _ in 0..5 {
            match idx.nearest(&sparse(&[(2, 0.3)])) {
                Similarity::Found(n) => assert_eq!(n.index, 0),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn zero_query_is_equidistant_and_picks_first() {
        let idx = index(vec![sparse(&[(1, 1.0)]), sparse(&[(0, 1.0)])]);
        match idx.nearest(&SparseVec::zeros(4)) {
            Similarity::Found(n) => {
                assert_eq!(n.index, 0);
                assert_eq!(n.distance, 1.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_corpus_and_mismatched_query() {
        let empty = index(vec![]);
        assert_eq!(empty.nearest(&sparse(&[(0, 1.0)])), Similarity::EmptyCorpus);
        let idx = index(vec![sparse(&[(0, 1.0)])]);
        assert_eq!(idx.nearest(&SparseVec::zeros(9)), Similarity::Unavailable);
    }

    #[test]
    fn new_rejects_inconsistent_corpus() {
        assert!(SimilarityIndex::new(4, vec![sparse(&[(0, 1.0)])], vec![]).is_err());
        let wrong_dim = SparseVec::from_unsorted(3, vec![0], vec![1.0]);
        assert!(SimilarityIndex::new(4, vec![wrong_dim], vec!["x".into()]).is_err());
        assert!(SimilarityIndex::new(4, vec![sparse(&[(0, -1.0)])], vec!["x".into()]).is_err());
    }
}
