use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vectorizer::stop_words::is_stop_word;

/// Minimum number of characters for a word token
const MIN_WORD_CHARS: usize = 2;

/// Split text into lowercase word tokens, stop-words removed.
///
/// A word is a maximal run of alphanumeric characters or `_`
/// at least two characters long.
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() >= MIN_WORD_CHARS)
        .filter(|w| !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Unigrams followed by bigrams of the surviving words.
pub fn terms(text: &str) -> Vec<String> {
    let words = words(text);
    let mut terms = Vec::with_capacity(words.len() * 2);
    terms.extend(words.iter().cloned());
    terms.extend(words.windows(2).map(|w| format!("{} {}", w[0], w[1])));
    terms
}

///  TokenFrequency
/// Counts term occurrences within one document.
/// Insertion order of first occurrence is preserved.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TokenFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    token_count: IndexMap<String, u32>,
}

impl TokenFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the unigram + bigram terms of `text`
    pub fn from_text(text: &str) -> Self {
        let mut freq = Self::new();
        freq.add_tokens(&terms(text));
        freq
    }

    /// add a token
    #[inline]
    pub fn add_token(&mut self, token: &str) -> &mut Self {
        match self.token_count.get_mut(token) {
            Some(count) => *count += 1,
            None => {
                self.token_count.insert(token.to_string(), 1);
            }
        }
        self
    }

    /// add several tokens
    #[inline]
    pub fn add_tokens<T>(&mut self, tokens: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for token in tokens {
            self.add_token(token.as_ref());
        }
        self
    }

    /// occurrences of `token`, 0 when absent
    #[inline]
    pub fn token_count(&self, token: &str) -> u32 {
        self.token_count.get(token).copied().unwrap_or(0)
    }

    /// number of distinct tokens
    #[inline]
    pub fn len(&self) -> usize {
        self.token_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token_count.is_empty()
    }

    /// (token, count) in first-occurrence order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.token_count.iter().map(|(t, &c)| (t.as_str(), c))
    }
}
