//! Request pipeline: Validate -> Vectorize -> Classify -> Explain ->
//! FindSimilar (fake only) -> Assemble.

pub mod http;

use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, warn};

use crate::error::RequestError;
use crate::model::classifier::Label;
use crate::model::explain::explain;
use crate::model::similarity::Similarity;
use crate::model::{Model, CANARY_TEXT};

/// Longest accepted text, in Unicode scalar values
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Name reported by the health endpoint
pub const SERVICE_NAME: &str = "fake-news-detector";

/// Body of `POST /predict`
#[derive(Debug, Clone, Default)]
pub struct PredictRequest {
    pub text: Option<String>,
}

/// Only a JSON object is a request; arrays and scalars are rejected.
/// Unknown keys are ignored, a missing or null `text` is `None`.
impl<'de> Deserialize<'de> for PredictRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RequestVisitor;

        impl<'de> Visitor<'de> for RequestVisitor {
            type Value = PredictRequest;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object with a string field `text`")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PredictRequest, A::Error> {
                let mut text: Option<Option<String>> = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == "text" {
                        if text.is_some() {
                            return Err(de::Error::duplicate_field("text"));
                        }
                        text = Some(map.next_value()?);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(PredictRequest { text: text.flatten() })
            }
        }

        deserializer.deserialize_map(RequestVisitor)
    }
}

/// Text that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedText(String);

impl ValidatedText {
    /// Present, not blank, at most `MAX_TEXT_CHARS` long.
    pub fn parse(text: Option<String>) -> Result<Self, RequestError> {
        let text = text.ok_or(RequestError::TextRequired)?;
        if text.trim().is_empty() {
            return Err(RequestError::TextRequired);
        }
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(RequestError::TextTooLong { max: MAX_TEXT_CHARS });
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    pub prediction: Label,
    /// (p_fake, p_real)
    pub probability: [f64; 2],
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_real: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub models_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnhealthyReport {
    pub status: &'static str,
    pub error: String,
}

/// Stateless pipeline over a loaded model
#[derive(Debug)]
pub struct InferenceService {
    model: Model,
}

impl InferenceService {
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn predict(&self, request: PredictRequest) -> Result<PredictResponse, RequestError> {
        let text = ValidatedText::parse(request.text)?;
        let text_len = text.as_str().chars().count();

        let vec = self.model.vectorizer.vectorize(text.as_str()).map_err(|e| {
            if e.is_client_error() {
                warn!(stage = "vectorize", text_len, error = %e, "rejected text");
            } else {
                error!(stage = "vectorize", text_len, error = %e, "vectorization failed");
            }
            RequestError::from(e)
        })?;

        let prediction = self.model.classifier.predict(&vec).map_err(|e| {
            error!(stage = "classify", text_len, nnz = vec.nnz(), error = %e, "classification failed");
            RequestError::from(e)
        })?;

        let reasons = explain(&self.model.vectorizer, &self.model.classifier, &vec, prediction.label).into_reasons();

        let similar_real = match prediction.label {
            Label::Fake => match self.model.similarity.nearest(&vec) {
                Similarity::Found(neighbor) => {
                    debug!(stage = "similarity", index = neighbor.index, distance = neighbor.distance, "nearest reference");
                    Some(neighbor.text.to_string())
                }
                Similarity::EmptyCorpus | Similarity::Unavailable => None,
            },
            Label::Real => None,
        };

        debug!(text_len, nnz = vec.nnz(), label = %prediction.label, "prediction served");
        Ok(PredictResponse {
            prediction: prediction.label,
            probability: prediction.probability,
            reasons,
            similar_real,
        })
    }

    /// Run the canary through vectorizer and classifier.
    pub fn health(&self) -> Result<HealthReport, UnhealthyReport> {
        match self.model.self_check() {
            Ok(_) => Ok(HealthReport {
                status: "healthy",
                service: SERVICE_NAME,
                version: env!("CARGO_PKG_VERSION"),
                models_loaded: true,
            }),
            Err(e) => {
                error!(stage = "health", canary_len = CANARY_TEXT.len(), error = %e, "health check failed");
                Err(UnhealthyReport { status: "unhealthy", error: e.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorizeError;
    use crate::model::explain::{NO_FEATURES_REASON, TOP_REASONS};
    use crate::model::fixtures;
    use crate::model::similarity::SimilarityIndex;

    fn service() -> InferenceService {
        InferenceService::new(fixtures::model())
    }

    fn request(text: &str) -> PredictRequest {
        PredictRequest { text: Some(text.to_string()) }
    }

    #[test]
    fn request_body_must_be_an_object() {
        for body in [r#"["shocking secret miracle hoax"]"#, "[]", r#""text""#, "42", "null"] {
            assert!(serde_json::from_str::<PredictRequest>(body).is_err(), "{body} was accepted");
        }
        let parsed: PredictRequest = serde_json::from_str(r#"{"source": 1, "text": "x"}"#).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("x"));
        let parsed: PredictRequest = serde_json::from_str(r#"{"text": null}"#).unwrap();
        assert!(parsed.text.is_none());
        assert!(serde_json::from_str::<PredictRequest>(r#"{"text": "a", "text": "b"}"#).is_err());
        assert!(serde_json::from_str::<PredictRequest>(r#"{"text": 42}"#).is_err());
    }

    #[test]
    fn validation_rejects_missing_and_blank_text() {
        assert!(matches!(ValidatedText::parse(None), Err(RequestError::TextRequired)));
        assert!(matches!(ValidatedText::parse(Some(String::new())), Err(RequestError::TextRequired)));
        assert!(matches!(ValidatedText::parse(Some(" \n\t ".into())), Err(RequestError::TextRequired)));
    }

    #[test]
    fn length_limit_counts_characters() {
        assert!(ValidatedText::parse(Some("x".repeat(MAX_TEXT_CHARS))).is_ok());
        assert!(matches!(
            ValidatedText::parse(Some("x".repeat(MAX_TEXT_CHARS + 1))),
            Err(RequestError::TextTooLong { max: MAX_TEXT_CHARS })
        ));
        // multi-byte characters count once
        assert!(ValidatedText::parse(Some("é".repeat(MAX_TEXT_CHARS))).is_ok());
    }

    #[test]
    fn fake_prediction_carries_similar_real() {
        let svc = service();
        let r = svc.predict(request("Shocking secret miracle hoax!")).unwrap();
        assert_eq!(r.prediction, Label::Fake);
        assert!((r.probability[0] + r.probability[1] - 1.0).abs() < 1e-6);
        assert!(r.probability[0] > r.probability[1]);
        assert!(!r.reasons.is_empty() && r.reasons.len() <= TOP_REASONS);
        assert!(r.reasons.iter().all(|w| svc.model().vectorizer.index_of(w).is_some()));
        let similar = r.similar_real.unwrap();
        assert!(!svc.model().similarity.is_empty());
        assert!(fixtures::rows().iter().any(|row| row.label == Label::Real && row.text == similar));
    }

    #[test]
    fn real_prediction_has_no_similar_real() {
        let r = service().predict(request("Parliament approved the budget")).unwrap();
        assert_eq!(r.prediction, Label::Real);
        assert_eq!(r.similar_real, None);
    }

    #[test]
    fn unknown_words_give_sentinel_reason() {
        let r = service().predict(request("zebra xylophone quokka")).unwrap();
        assert_eq!(r.reasons, vec![NO_FEATURES_REASON.to_string()]);
        // equal priors and a zero vector tie, which resolves to real
        assert_eq!(r.prediction, Label::Real);
    }

    #[test]
    fn predictions_are_deterministic() {
        let svc = service();
        let a = svc.predict(request("aliens control the budget")).unwrap();
        let b = svc.predict(request("aliens control the budget")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn lossy_text_is_a_vectorize_error() {
        let err = service().predict(request("secret \u{FFFD} plot")).unwrap_err();
        assert!(matches!(err, RequestError::Vectorize(VectorizeError::InvalidEncoding)));
    }

    #[test]
    fn empty_reference_corpus_omits_similar_real() {
        let mut model = fixtures::model();
        model.similarity = SimilarityIndex::new(model.vectorizer.dim() as u32, vec![], vec![]).unwrap();
        let r = InferenceService::new(model).predict(request("shocking secret miracle hoax")).unwrap();
        assert_eq!(r.prediction, Label::Fake);
        assert_eq!(r.similar_real, None);
    }

    #[test]
    fn health_reports_loaded_model() {
        let report = service().health().unwrap();
        assert_eq!(report.status, "healthy");
        assert!(report.models_loaded);
        assert_eq!(report.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn health_reports_failing_canary() {
        let report = InferenceService::new(fixtures::unhealthy_model()).health().unwrap_err();
        assert_eq!(report.status, "unhealthy");
        assert!(report.error.starts_with("self-validation failed"));
    }

    #[test]
    fn response_omits_absent_similar_real() {
        let r = PredictResponse {
            prediction: Label::Real,
            probability: [0.25, 0.75],
            reasons: vec!["budget".into()],
            similar_real: None,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!({"prediction": "real", "probability": [0.25, 0.75], "reasons": ["budget"]}));
    }
}
