pub mod artifacts;
pub mod classifier;
pub mod explain;
pub mod similarity;
pub mod train;

use std::path::Path;

use tracing::info;

use crate::error::{ArtifactError, StartupError};
use crate::model::artifacts::{Artifact, Artifacts};
use crate::model::classifier::{NaiveBayes, Prediction};
use crate::model::similarity::SimilarityIndex;
use crate::vectorizer::TfIdfVectorizer;

/// Fixed input used by the startup self-check and the health endpoint
pub const CANARY_TEXT: &str = "This is a test news article about current events.";

/// Most indicative vocabulary terms per class, kept for inspection
#[derive(Debug, Clone, Default)]
pub struct Indicators {
    pub fake: Vec<String>,
    pub real: Vec<String>,
}

/// Everything inference needs, validated and immutable.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug)]
pub struct Model {
    pub vectorizer: TfIdfVectorizer,
    pub classifier: NaiveBayes,
    pub similarity: SimilarityIndex,
    pub indicators: Indicators,
}

fn corrupt(artifact: Artifact, reason: impl Into<String>) -> ArtifactError {
    ArtifactError::Corrupt { name: artifact.name(), reason: reason.into() }
}

impl Model {
    /// Cross-check the raw artifacts against each other.
    pub fn from_artifacts(artifacts: Artifacts) -> Result<Self, ArtifactError> {
        let Artifacts { classifier, vectorizer, fake_words, real_words, real_vectors, real_texts } = artifacts;

        vectorizer.check().map_err(|e| corrupt(Artifact::Vectorizer, e))?;
        classifier.check().map_err(|e| corrupt(Artifact::Classifier, e))?;
        let dim = vectorizer.dim();
        if classifier.dim() != dim {
            return Err(corrupt(
                Artifact::Classifier,
                format!("weight table covers {} features, vocabulary has {dim}", classifier.dim()),
            ));
        }

        for (artifact, words) in [(Artifact::FakeIndicators, &fake_words), (Artifact::RealIndicators, &real_words)] {
            if let Some(word) = words.iter().find(|w| vectorizer.index_of(w).is_none()) {
                return Err(corrupt(artifact, format!("`{word}` is not in the vocabulary")));
            }
        }

        let reference_artifact = if real_vectors.len() == real_texts.len() {
            Artifact::ReferenceVectors
        } else {
            Artifact::ReferenceTexts
        };
        let similarity =
            SimilarityIndex::new(dim as u32, real_vectors, real_texts).map_err(|e| corrupt(reference_artifact, e))?;

        Ok(Self {
            vectorizer,
            classifier,
            similarity,
            indicators: Indicators { fake: fake_words, real: real_words },
        })
    }

    /// Load, validate and self-check the model stored in `dir`.
    pub fn load(dir: &Path) -> Result<Self, StartupError> {
        let model = Self::from_artifacts(Artifacts::load(dir)?)?;
        model.self_check()?;
        info!(
            vocabulary = model.vectorizer.dim(),
            references = model.similarity.len(),
            fake_indicators = model.indicators.fake.len(),
            real_indicators = model.indicators.real.len(),
            "model loaded"
        );
        Ok(model)
    }

    /// Vectorize and classify the canary; the output must be a proper
    /// probability pair.
    pub fn self_check(&self) -> Result<Prediction, StartupError> {
        let vec = self
            .vectorizer
            .vectorize(CANARY_TEXT)
            .map_err(|e| StartupError::SelfCheck(e.to_string()))?;
        let prediction = self
            .classifier
            .predict(&vec)
            .map_err(|e| StartupError::SelfCheck(e.to_string()))?;
        let [p_fake, p_real] = prediction.probability;
        if !(p_fake.is_finite() && p_real.is_finite()) || (p_fake + p_real - 1.0).abs() > 1e-6 {
            return Err(StartupError::SelfCheck(format!(
                "canary probabilities [{p_fake}, {p_real}] do not form a distribution"
            )));
        }
        Ok(prediction)
    }
}
