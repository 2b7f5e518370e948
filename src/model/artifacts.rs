//! The six files a fitted model is made of, stored as CBOR documents.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::ArtifactError;
use crate::model::classifier::NaiveBayes;
use crate::utils::SparseVec;
use crate::vectorizer::TfIdfVectorizer;

/// Named artifact and the file it lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Classifier,
    Vectorizer,
    FakeIndicators,
    RealIndicators,
    ReferenceVectors,
    ReferenceTexts,
}

impl Artifact {
    pub const ALL: [Artifact; 6] = [
        Artifact::Classifier,
        Artifact::Vectorizer,
        Artifact::FakeIndicators,
        Artifact::RealIndicators,
        Artifact::ReferenceVectors,
        Artifact::ReferenceTexts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::Classifier => "classifier weights",
            Artifact::Vectorizer => "vectorizer",
            Artifact::FakeIndicators => "fake indicator words",
            Artifact::RealIndicators => "real indicator words",
            Artifact::ReferenceVectors => "reference vectors",
            Artifact::ReferenceTexts => "reference texts",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Classifier => "model.cbor",
            Artifact::Vectorizer => "vectorizer.cbor",
            Artifact::FakeIndicators => "top_fake_words.cbor",
            Artifact::RealIndicators => "top_real_words.cbor",
            Artifact::ReferenceVectors => "real_vectors.cbor",
            Artifact::ReferenceTexts => "real_texts.cbor",
        }
    }
}

/// Raw, not yet cross-checked contents of the six artifacts
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub classifier: NaiveBayes,
    pub vectorizer: TfIdfVectorizer,
    pub fake_words: Vec<String>,
    pub real_words: Vec<String>,
    pub real_vectors: Vec<SparseVec<f64>>,
    pub real_texts: Vec<String>,
}

impl Artifacts {
    /// Read all six artifacts from `dir`
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        Ok(Self {
            classifier: read(dir, Artifact::Classifier)?,
            vectorizer: read(dir, Artifact::Vectorizer)?,
            fake_words: read(dir, Artifact::FakeIndicators)?,
            real_words: read(dir, Artifact::RealIndicators)?,
            real_vectors: read(dir, Artifact::ReferenceVectors)?,
            real_texts: read(dir, Artifact::ReferenceTexts)?,
        })
    }

    /// Write all six artifacts into `dir`, creating it when needed
    pub fn save(&self, dir: &Path) -> Result<(), ArtifactError> {
        fs::create_dir_all(dir).map_err(|source| ArtifactError::Io { name: "artifact directory", source })?;
        write(dir, Artifact::Classifier, &self.classifier)?;
        write(dir, Artifact::Vectorizer, &self.vectorizer)?;
        write(dir, Artifact::FakeIndicators, &self.fake_words)?;
        write(dir, Artifact::RealIndicators, &self.real_words)?;
        write(dir, Artifact::ReferenceVectors, &self.real_vectors)?;
        write(dir, Artifact::ReferenceTexts, &self.real_texts)?;
        Ok(())
    }
}

fn read<T: DeserializeOwned>(dir: &Path, artifact: Artifact) -> Result<T, ArtifactError> {
    let path = dir.join(artifact.file_name());
    let name = artifact.name();
    let file = File::open(&path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ArtifactError::Missing { name, path: path.clone() },
        _ => ArtifactError::Io { name, source },
    })?;
    let value = serde_cbor::from_reader(BufReader::new(file))
        .map_err(|source| ArtifactError::Decode { name, source })?;
    debug!(artifact = name, path = %path.display(), "artifact loaded");
    Ok(value)
}

fn write<T: Serialize>(dir: &Path, artifact: Artifact, value: &T) -> Result<(), ArtifactError> {
    let path = dir.join(artifact.file_name());
    let name = artifact.name();
    let file = File::create(&path).map_err(|source| ArtifactError::Io { name, source })?;
    let mut writer = BufWriter::new(file);
    serde_cbor::to_writer(&mut writer, value).map_err(|source| ArtifactError::Encode { name, source })?;
    writer.flush().map_err(|source| ArtifactError::Io { name, source })?;
    debug!(artifact = name, path = %path.display(), "artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[test]
    fn save_then_load_restores_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = fixtures::artifacts();
        artifacts.save(dir.path()).unwrap();
        for artifact in Artifact::ALL {
            assert!(dir.path().join(artifact.file_name()).is_file());
        }

        let loaded = Artifacts::load(dir.path()).unwrap();
        assert_eq!(loaded.vectorizer.dim(), artifacts.vectorizer.dim());
        assert_eq!(loaded.classifier.weights(crate::Label::Fake), artifacts.classifier.weights(crate::Label::Fake));
        assert_eq!(loaded.real_vectors, artifacts.real_vectors);
        assert_eq!(loaded.real_texts, artifacts.real_texts);
        assert_eq!(loaded.fake_words, artifacts.fake_words);
    }

    #[test]
    fn missing_artifact_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::artifacts().save(dir.path()).unwrap();
        fs::remove_file(dir.path().join("real_texts.cbor")).unwrap();
        match Artifacts::load(dir.path()) {
            Err(ArtifactError::Missing { name, .. }) => assert_eq!(name, "reference texts"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_artifact_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::artifacts().save(dir.path()).unwrap();
        fs::write(dir.path().join("model.cbor"), b"\xff\xff\xff").unwrap();
        assert!(matches!(Artifacts::load(dir.path()), Err(ArtifactError::Decode { .. })));
    }
}
