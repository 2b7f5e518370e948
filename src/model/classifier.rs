use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::utils::SparseVec;

/// Binary class. The discriminant is the row of the weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Fake = 0,
    Real = 1,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Fake, Label::Real];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Fake => "fake",
            Label::Real => "real",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicted label and (p_fake, p_real)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub probability: [f64; 2],
}

/// Multinomial naive bayes over TF-IDF features.
///
/// `feature_log_prob[c][i]` is the Class Weight Table: ln P(term i | class c).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayes {
    class_log_prior: [f64; 2],
    feature_log_prob: [Vec<f64>; 2],
}

impl NaiveBayes {
    pub fn from_parts(class_log_prior: [f64; 2], feature_log_prob: [Vec<f64>; 2]) -> Result<Self, String> {
        let model = Self { class_log_prior, feature_log_prob };
        model.check()?;
        Ok(model)
    }

    /// Fit with additive smoothing `alpha`.
    ///
    /// weight[c][i] = ln(count[c][i] + α) − ln(Σ_j count[c][j] + α·dim)
    /// prior[c]     = ln(n_c / n)
    ///
    /// Returns `None` unless both classes are present.
    pub fn fit(samples: &[(SparseVec<f64>, Label)], dim: usize, alpha: f64) -> Option<Self> {
        let mut class_count = [0usize; 2];
        let mut feature_count = [vec![0.0f64; dim], vec![0.0f64; dim]];
        for (vec, label) in samples {
            let c = label.index();
            class_count[c] += 1;
            for (i, v) in vec.iter() {
                if let Some(slot) = feature_count[c].get_mut(i as usize) {
                    *slot += v;
                }
            }
        }
        if class_count.iter().any(|&n| n == 0) {
            return None;
        }

        let total = samples.len() as f64;
        let class_log_prior = class_count.map(|n| (n as f64 / total).ln());
        let feature_log_prob = feature_count.map(|counts| {
            let denom = (counts.iter().sum::<f64>() + alpha * dim as f64).ln();
            counts.into_iter().map(|c| (c + alpha).ln() - denom).collect::<Vec<f64>>()
        });
        Some(Self { class_log_prior, feature_log_prob })
    }

    /// Number of features the weight table covers
    #[inline]
    pub fn dim(&self) -> usize {
        self.feature_log_prob[0].len()
    }

    /// Class Weight Table row for `label`
    #[inline]
    pub fn weights(&self, label: Label) -> &[f64] {
        &self.feature_log_prob[label.index()]
    }

    pub fn class_log_prior(&self) -> [f64; 2] {
        self.class_log_prior
    }

    /// Σ weight[c][i]·x_i + prior[c], for both classes
    pub fn joint_log_likelihood(&self, vec: &SparseVec<f64>) -> Result<[f64; 2], ModelError> {
        let dim = self.dim();
        if vec.len() as usize != dim {
            return Err(ModelError::DimensionMismatch { expected: dim, got: vec.len() as usize });
        }
        let mut jll = self.class_log_prior;
        for (i, x) in vec.iter() {
            let i = i as usize;
            for label in Label::ALL {
                let w = self
                    .weights(label)
                    .get(i)
                    .ok_or(ModelError::IndexOutOfRange { index: i, dim })?;
                jll[label.index()] += w * x;
            }
        }
        if jll.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        Ok(jll)
    }

    /// Label = argmax of the joint log-likelihood, ties going to `Real`.
    /// Probabilities are the max-shifted softmax of the two scores.
    pub fn predict(&self, vec: &SparseVec<f64>) -> Result<Prediction, ModelError> {
        let jll = self.joint_log_likelihood(vec)?;
        let label = if jll[Label::Fake.index()] > jll[Label::Real.index()] {
            Label::Fake
        } else {
            Label::Real
        };
        let max = jll[0].max(jll[1]);
        let exp = jll.map(|v| (v - max).exp());
        let sum = exp[0] + exp[1];
        let probability = exp.map(|e| e / sum);
        if probability.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        Ok(Prediction { label, probability })
    }

    /// Indices of the `n` highest weights of a class (descending, ties by index)
    pub fn top_features(&self, label: Label, n: usize) -> Vec<usize> {
        let weights = self.weights(label);
        let mut order: Vec<usize> = (0..weights.len()).collect();
        order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then_with(|| a.cmp(&b)));
        order.truncate(n);
        order
    }

    /// Both rows share one dimension; every weight and prior is finite
    pub fn check(&self) -> Result<(), String> {
        let [fake, real] = &self.feature_log_prob;
        if fake.len() != real.len() {
            return Err(format!("weight rows differ in length ({} vs {})", fake.len(), real.len()));
        }
        if self.class_log_prior.iter().any(|p| !p.is_finite()) {
            return Err("class prior is not finite".to_string());
        }
        if fake.iter().chain(real.iter()).any(|w| !w.is_finite()) {
            return Err("weight table contains a non-finite value".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec(dim: u32, entries: &[(u32, f64)]) -> SparseVec<f64> {
        let (i, v) = entries.iter().copied().unzip();
        SparseVec::from_unsorted(dim, i, v)
    }

    fn toy() -> NaiveBayes {
        // feature 0 leans fake, feature 1 leans real, feature 2 neutral
        NaiveBayes::from_parts(
            [0.5f64.ln(), 0.5f64.ln()],
            [
                vec![0.7f64.ln(), 0.1f64.ln(), 0.2f64.ln()],
                vec![0.1f64.ln(), 0.7f64.ln(), 0.2f64.ln()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn predict_picks_the_leaning_class() {
        let m = toy();
        let p = m.predict(&vec(3, &[(0, 1.0)])).unwrap();
        assert_eq!(p.label, Label::Fake);
        assert!(p.probability[0] > p.probability[1]);
        let p = m.predict(&vec(3, &[(1, 1.0)])).unwrap();
        assert_eq!(p.label, Label::Real);
        assert!((p.probability[0] + p.probability[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn equal_likelihood_breaks_toward_real() {
        let m = toy();
        let p = m.predict(&vec(3, &[(2, 1.0)])).unwrap();
        assert_eq!(p.label, Label::Real);
        assert!((p.probability[0] - 0.5).abs() < 1e-12);
        let p = m.predict(&SparseVec::zeros(3)).unwrap();
        assert_eq!(p.label, Label::Real);
    }

    #[test]
    fn softmax_is_stable_for_large_scores() {
        let m = NaiveBayes::from_parts([-1000.0, -1e6], [vec![0.0], vec![0.0]]).unwrap();
        let p = m.predict(&SparseVec::zeros(1)).unwrap();
        assert_eq!(p.label, Label::Fake);
        assert!((p.probability[0] - 1.0).abs() < 1e-12);
        assert_eq!(p.probability[1], 0.0);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let m = toy();
        assert_eq!(
            m.predict(&SparseVec::zeros(4)),
            Err(ModelError::DimensionMismatch { expected: 3, got: 4 })
        );
    }

    #[test]
    fn fit_matches_hand_computed_weights() {
        let samples = vec![
            (vec(2, &[(0, 1.0)]), Label::Fake),
            (vec(2, &[(1, 1.0)]), Label::Real),
            (vec(2, &[(1, 1.0)]), Label::Real),
        ];
        let m = NaiveBayes::fit(&samples, 2, 1.0).unwrap();
        assert!((m.class_log_prior()[0] - (1.0f64 / 3.0).ln()).abs() < 1e-12);
        // fake counts [1, 0] -> ln(2/3), ln(1/3)
        assert!((m.weights(Label::Fake)[0] - (2.0f64 / 3.0).ln()).abs() < 1e-12);
        assert!((m.weights(Label::Fake)[1] - (1.0f64 / 3.0).ln()).abs() < 1e-12);
        // real counts [0, 2] -> ln(1/4), ln(3/4)
        assert!((m.weights(Label::Real)[1] - 0.75f64.ln()).abs() < 1e-12);
        assert_eq!(m.top_features(Label::Real, 1), vec![1]);
    }

    #[test]
    fn fit_needs_both_classes() {
        let samples = vec![(vec(2, &[(0, 1.0)]), Label::Fake)];
        assert!(NaiveBayes::fit(&samples, 2, 1.0).is_none());
    }

    #[test]
    fn label_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Label::Fake).unwrap(), "\"fake\"");
    }
}
