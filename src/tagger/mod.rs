// Part-of-speech tagging boundary.
// The compiler only sees the `Tagger` trait; any implementation can be plugged in
// as long as it returns exactly one token per input word, in order.

use crate::error::{CorpusError, Result};

pub mod lexicon;

pub use lexicon::LexiconTagger;

/// A surface word paired with its part-of-speech tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub tag: String,
}

impl Token {
    pub fn new(word: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            tag: tag.into(),
        }
    }
}

/// Tagging capability.
///
/// Implementations must not merge, split, drop, or reorder tokens: the
/// returned sequence has the same length and order as `words`.
pub trait Tagger: Send + Sync {
    fn tag(&self, words: &[String]) -> anyhow::Result<Vec<Token>>;
}

/// Whether `tag` can be stored in a space-joined tag stream
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && !tag.chars().any(char::is_whitespace)
}

/// Tag `words` and return the tag sequence.
///
/// Fails if the tagger broke alignment with its input: a different token
/// count, a token whose word differs from the input word at the same
/// position, or a tag that is empty or contains whitespace.
pub fn tag_aligned<T: Tagger + ?Sized>(
    tagger: &T,
    words: &[String],
    source_id: &str,
) -> Result<Vec<String>> {
    let tokens = tagger.tag(words).map_err(|e| CorpusError::Tagger {
        source_id: source_id.to_string(),
        message: format!("{e:#}"),
    })?;

    if tokens.len() != words.len() {
        return Err(CorpusError::TagAlignment {
            source_id: source_id.to_string(),
            expected: words.len(),
            actual: tokens.len(),
        });
    }

    let mut tags = Vec::with_capacity(tokens.len());
    for (position, (token, word)) in tokens.into_iter().zip(words).enumerate() {
        if &token.word != word {
            return Err(CorpusError::TagMismatch {
                source_id: source_id.to_string(),
                position,
                expected: word.clone(),
                actual: token.word,
            });
        }
        if !is_valid_tag(&token.tag) {
            return Err(CorpusError::InvalidTag {
                source_id: source_id.to_string(),
                word: token.word,
                tag: token.tag,
            });
        }
        tags.push(token.tag);
    }

    Ok(tags)
}
