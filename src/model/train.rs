//! Offline fitting: labelled CSV rows in, the six artifacts out.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::TrainError;
use crate::model::artifacts::Artifacts;
use crate::model::classifier::{Label, NaiveBayes};
use crate::utils::SparseVec;
use crate::vectorizer::{TfIdfVectorizer, DEFAULT_MAX_FEATURES};

/// One training row
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledText {
    pub text: String,
    pub label: Label,
}

impl LabeledText {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self { text: text.into(), label }
    }
}

/// Fitting parameters
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// vocabulary cap
    pub max_features: usize,
    /// fraction of rows held out for evaluation
    pub test_size: f64,
    pub seed: u64,
    /// length of each indicator word list
    pub top_words: usize,
    /// additive smoothing
    pub alpha: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            test_size: 0.2,
            seed: 42,
            top_words: 100,
            alpha: 1.0,
        }
    }
}

/// Fitted artifacts plus evaluation numbers
#[derive(Debug)]
pub struct FitReport {
    pub artifacts: Artifacts,
    pub train_rows: usize,
    pub test_rows: usize,
    /// held-out accuracy, `None` without a test split
    pub accuracy: Option<f64>,
}

/// 0 -> fake, 1 -> real. Accepts "1", "1.0", " 0 ".
pub fn parse_label(raw: &str) -> Option<Label> {
    match raw.trim().parse::<f64>().ok()? {
        v if v == 0.0 => Some(Label::Fake),
        v if v == 1.0 => Some(Label::Real),
        _ => None,
    }
}

/// Read a headed CSV with `text` and `label` columns.
/// Rows with blank text, text that is not clean UTF-8 or a label other
/// than 0/1 are dropped and counted.
pub fn read_csv(path: &Path) -> Result<Vec<LabeledText>, TrainError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| TrainError::Csv { path: path.to_path_buf(), source })?;
    let headers = reader
        .headers()
        .map_err(|source| TrainError::Csv { path: path.to_path_buf(), source })?
        .clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(TrainError::MissingColumn { path: path.to_path_buf(), column: name })
    };
    let text_col = column("text")?;
    let label_col = column("label")?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.byte_records() {
        let record = record.map_err(|source| TrainError::Csv { path: path.to_path_buf(), source })?;
        let field = |col: usize| record.get(col).and_then(|raw| std::str::from_utf8(raw).ok());
        let text = field(text_col).filter(|t| !t.trim().is_empty() && TfIdfVectorizer::accepts(t));
        match (text, field(label_col).and_then(parse_label)) {
            (Some(text), Some(label)) => rows.push(LabeledText::new(text, label)),
            _ => dropped += 1,
        }
    }
    info!(path = %path.display(), rows = rows.len(), dropped, "dataset read");
    Ok(rows)
}

/// Keep a seeded random `frac` of the rows (rounded to nearest).
pub fn sample(mut rows: Vec<LabeledText>, frac: f64, rng: &mut ChaCha8Rng) -> Vec<LabeledText> {
    if frac >= 1.0 {
        return rows;
    }
    let keep = (rows.len() as f64 * frac.max(0.0)).round() as usize;
    rows.shuffle(rng);
    rows.truncate(keep);
    rows
}

fn vectorize_all(vectorizer: &TfIdfVectorizer, rows: &[LabeledText]) -> Result<Vec<SparseVec<f64>>, TrainError> {
    rows.par_iter()
        .map(|row| vectorizer.vectorize(&row.text).map_err(TrainError::from))
        .collect()
}

/// Fit vectorizer, classifier, indicator lists and Reference Corpus.
///
/// The Reference Corpus is every real row of `rows`, in input order.
/// Rows the vectorizer refuses are skipped.
pub fn fit(mut rows: Vec<LabeledText>, options: &FitOptions) -> Result<FitReport, TrainError> {
    let before = rows.len();
    rows.retain(|r| TfIdfVectorizer::accepts(&r.text));
    if rows.len() < before {
        warn!(dropped = before - rows.len(), "rows with NUL or U+FFFD text skipped");
    }
    if rows.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    let references: Vec<LabeledText> = rows.iter().filter(|r| r.label == Label::Real).cloned().collect();

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut shuffled = rows;
    shuffled.shuffle(&mut rng);
    let n = shuffled.len();
    let test_rows = ((n as f64 * options.test_size.clamp(0.0, 1.0)).ceil() as usize).min(n - 1);
    let train = shuffled.split_off(test_rows);
    let test = shuffled;

    let texts: Vec<&str> = train.iter().map(|r| r.text.as_str()).collect();
    let vectorizer = TfIdfVectorizer::fit(&texts, options.max_features);
    info!(vocabulary = vectorizer.dim(), train_rows = train.len(), "vectorizer fitted");

    let train_vectors = vectorize_all(&vectorizer, &train)?;
    let samples: Vec<(SparseVec<f64>, Label)> =
        train_vectors.into_iter().zip(train.iter().map(|r| r.label)).collect();
    let classifier =
        NaiveBayes::fit(&samples, vectorizer.dim(), options.alpha).ok_or(TrainError::SingleClass)?;

    let accuracy = if test.is_empty() {
        None
    } else {
        let test_vectors = vectorize_all(&vectorizer, &test)?;
        let mut correct = 0usize;
        for (vec, row) in test_vectors.iter().zip(&test) {
            if classifier.predict(vec)?.label == row.label {
                correct += 1;
            }
        }
        Some(correct as f64 / test.len() as f64)
    };
    if let Some(accuracy) = accuracy {
        info!(accuracy, test_rows = test.len(), "held-out evaluation");
    }

    let indicators = |label: Label| -> Vec<String> {
        classifier
            .top_features(label, options.top_words)
            .into_iter()
            .filter_map(|i| vectorizer.term(i).map(str::to_string))
            .collect()
    };
    let fake_words = indicators(Label::Fake);
    let real_words = indicators(Label::Real);

    let real_vectors = vectorize_all(&vectorizer, &references)?;
    let real_texts = references.into_iter().map(|r| r.text).collect();
    debug!(reference_rows = real_vectors.len(), "reference corpus built");

    Ok(FitReport {
        artifacts: Artifacts {
            classifier,
            vectorizer,
            fake_words,
            real_words,
            real_vectors,
            real_texts,
        },
        train_rows: train.len(),
        test_rows: test.len(),
        accuracy,
    })
}

/// Read every dataset, sample, fit, and write the artifacts to `out`.
pub fn run(data: &[PathBuf], out: &Path, sample_frac: f64, options: &FitOptions) -> Result<FitReport, TrainError> {
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut rows = Vec::new();
    for path in data {
        let read = read_csv(path)?;
        rows.extend(sample(read, sample_frac, &mut rng));
    }
    let report = fit(rows, options)?;
    report.artifacts.save(out)?;
    info!(out = %out.display(), "artifacts written");
    Ok(report)
}
