//! Word-contribution explanations.
//!
//! A feature's contribution to the predicted class is
//! `weight[label][i] * x_i`. The reasons are the terms with the largest
//! absolute contribution.

use tracing::warn;

use crate::model::classifier::{Label, NaiveBayes};
use crate::utils::SparseVec;
use crate::vectorizer::TfIdfVectorizer;

/// Number of reasons reported per prediction
pub const TOP_REASONS: usize = 3;

/// Reason reported when the text has no vocabulary term
pub const NO_FEATURES_REASON: &str = "No specific reasons identified";

/// Reason reported when the explanation could not be computed
pub const UNAVAILABLE_REASON: &str = "Explanation unavailable";

/// Outcome of the explanation step. Degraded outcomes are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Explanation {
    /// Up to `TOP_REASONS` terms, strongest first
    Reasons(Vec<String>),
    /// No active feature in the vector
    NoFeatures,
    /// Weight table or vocabulary lookup failed
    Unavailable,
}

impl Explanation {
    /// Reason strings for the response; sentinels for the degraded cases
    pub fn into_reasons(self) -> Vec<String> {
        match self {
            Explanation::Reasons(reasons) => reasons,
            Explanation::NoFeatures => vec![NO_FEATURES_REASON.to_string()],
            Explanation::Unavailable => vec![UNAVAILABLE_REASON.to_string()],
        }
    }
}

/// (vocabulary index, contribution) for every active feature,
/// sorted by |contribution| descending then index ascending.
/// `None` when an index falls outside the weight table.
pub fn ranked_contributions(
    classifier: &NaiveBayes,
    vec: &SparseVec<f64>,
    label: Label,
) -> Option<Vec<(usize, f64)>> {
    let weights = classifier.weights(label);
    let mut contributions = vec
        .iter()
        .filter(|&(_, x)| x > 0.0)
        .map(|(i, x)| weights.get(i as usize).map(|w| (i as usize, w * x)))
        .collect::<Option<Vec<_>>>()?;
    contributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then_with(|| a.0.cmp(&b.0)));
    Some(contributions)
}

/// Top terms supporting `label` for the given feature vector.
pub fn explain(
    vectorizer: &TfIdfVectorizer,
    classifier: &NaiveBayes,
    vec: &SparseVec<f64>,
    label: Label,
) -> Explanation {
    let Some(ranked) = ranked_contributions(classifier, vec, label) else {
        warn!(stage = "explain", nnz = vec.nnz(), "feature index outside weight table");
        return Explanation::Unavailable;
    };
    if ranked.is_empty() {
        return Explanation::NoFeatures;
    }
    let reasons = ranked
        .iter()
        .take(TOP_REASONS)
        .map(|&(i, _)| vectorizer.term(i).map(str::to_string))
        .collect::<Option<Vec<_>>>();
    match reasons {
        Some(reasons) => Explanation::Reasons(reasons),
        None => {
            warn!(stage = "explain", "feature index outside vocabulary");
            Explanation::Unavailable
        }
    }
}
