//! Error taxonomy for the corpus compiler.
//!
//! Per-file structural errors (`Format`, the tag alignment family, `Timeout`,
//! `Tagger`) are governed by the configured [`crate::assembler::ErrorPolicy`].
//! Everything else aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Library result type alias
pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Debug, Error)]
pub enum CorpusError {
    /// Section-label line opened with `[` but never closed
    #[error("format error in {source_id}: missing closing bracket on line {line}")]
    Format { source_id: String, line: usize },

    /// Tagger returned a different number of tokens than it was given
    #[error(
        "tag alignment error in {source_id}: tagger returned {actual} tokens for {expected} words"
    )]
    TagAlignment {
        source_id: String,
        expected: usize,
        actual: usize,
    },

    /// Tagger changed, merged or reordered the words it was given
    #[error(
        "tag alignment error in {source_id}: token {position} is {actual:?}, expected {expected:?}"
    )]
    TagMismatch {
        source_id: String,
        position: usize,
        expected: String,
        actual: String,
    },

    /// Tag that cannot be stored in the space-joined tag stream
    #[error("invalid tag {tag:?} for word {word:?} in {source_id}")]
    InvalidTag {
        source_id: String,
        word: String,
        tag: String,
    },

    /// Tagger reported a failure of its own
    #[error("tagger failed on {source_id}: {message}")]
    Tagger { source_id: String, message: String },

    /// Per-file work exceeded the configured tagging deadline
    #[error("processing {source_id} timed out after {timeout_ms}ms")]
    Timeout { source_id: String, timeout_ms: u64 },

    /// Two raw files resolved to the same song key
    #[error("song key collision on {key:?}: {first:?} and {second:?}")]
    KeyCollision {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Record parts that violate the song record invariants
    #[error("invalid record for {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output document could not be rendered
    #[error("failed to serialize {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Persisted document could not be parsed back
    #[error("malformed corpus document: {0}")]
    Json(#[from] serde_json::Error),
}

impl CorpusError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CorpusError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is isolated to a single raw file and therefore
    /// subject to the skip/abort policy.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            CorpusError::Format { .. }
                | CorpusError::TagAlignment { .. }
                | CorpusError::TagMismatch { .. }
                | CorpusError::InvalidTag { .. }
                | CorpusError::Tagger { .. }
                | CorpusError::Timeout { .. }
        )
    }
}
