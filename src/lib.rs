/// This crate is a fake/real news classifier built on a TF-IDF vectorizer,
/// a multinomial naive bayes model and a cosine nearest-neighbor index.
pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod utils;
pub mod vectorizer;

/// TF-IDF Vectorizer
/// Maps raw text to an L2-normalized sparse TF-IDF vector over a fixed
/// vocabulary of unigrams and bigrams (lowercased, English stop words removed).
///
/// Indices are assigned in lexicographic term order when fitting, and stay
/// stable for as long as the vectorizer lives.
///
/// # Serialization
/// Supported. Stored as the `vectorizer.cbor` artifact.
pub use vectorizer::TfIdfVectorizer;

/// Multinomial naive bayes classifier and its two classes.
///
/// `predict` returns the label (ties favor `Real`) and the `(p_fake, p_real)`
/// pair computed with a max-shifted softmax.
pub use model::classifier::{Label, NaiveBayes, Prediction};

/// Validated model bundle loaded once at startup.
pub use model::Model;

/// Request pipeline and its HTTP wire types.
pub use service::{InferenceService, PredictRequest, PredictResponse};

/// Sparse vector with sorted indices
pub use utils::SparseVec;
