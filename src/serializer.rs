//! Persisted documents: the corpus, the optional frequency index and the
//! optional source map.
//!
//! The corpus document maps each song key to
//! `{"end_positions": [..], "words": "..", "tags": ".."}` where `words` and
//! `tags` are space-joined. Keys are emitted in sorted order so identical
//! input yields identical bytes.

use crate::assembler::{Corpus, SongRecord};
use crate::error::{CorpusError, Result};
use crate::frequency::FrequencyIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output formatting options
#[derive(Debug, Clone, Default)]
pub struct SerializerConfig {
    /// Indent JSON output
    pub pretty: bool,
}

/// Wire form of one song record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    pub end_positions: Vec<usize>,
    pub words: String,
    pub tags: String,
}

impl From<&SongRecord> for WireRecord {
    fn from(record: &SongRecord) -> Self {
        Self {
            end_positions: record.end_positions().to_vec(),
            words: record.words().join(" "),
            tags: record.tags().join(" "),
        }
    }
}

fn split_joined(joined: &str) -> Vec<String> {
    joined.split_whitespace().map(str::to_string).collect()
}

fn to_bytes<T: Serialize>(value: &T, config: &SerializerConfig) -> serde_json::Result<Vec<u8>> {
    if config.pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
}

/// Render the corpus document
pub fn serialize_corpus(
    corpus: &Corpus,
    config: &SerializerConfig,
) -> serde_json::Result<Vec<u8>> {
    let wire: BTreeMap<&str, WireRecord> = corpus
        .iter()
        .map(|(key, record)| (key.as_str(), WireRecord::from(record)))
        .collect();
    to_bytes(&wire, config)
}

/// Render the frequency index document
pub fn serialize_frequencies(
    index: &FrequencyIndex,
    config: &SerializerConfig,
) -> serde_json::Result<Vec<u8>> {
    to_bytes(index, config)
}

/// Render the song key -> raw path document, paths relative to `root`
pub fn serialize_sources(
    corpus: &Corpus,
    root: &Path,
    config: &SerializerConfig,
) -> serde_json::Result<Vec<u8>> {
    let sources: BTreeMap<&str, String> = corpus
        .sources()
        .iter()
        .map(|(key, path)| {
            let relative = path.strip_prefix(root).unwrap_or(path);
            (key.as_str(), relative.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    to_bytes(&sources, config)
}

/// Parse a corpus document back into records.
///
/// Source paths are not part of the document, so the returned corpus maps
/// every key to an empty source path.
pub fn parse_corpus(bytes: &[u8]) -> Result<Corpus> {
    let wire: BTreeMap<String, WireRecord> = serde_json::from_slice(bytes)?;
    let mut corpus = Corpus::new();
    for (key, record) in wire {
        let parsed = SongRecord::new(
            &key,
            record.end_positions,
            split_joined(&record.words),
            split_joined(&record.tags),
        )?;
        corpus.insert(key, parsed, Path::new(""))?;
    }
    Ok(corpus)
}

pub fn parse_frequencies(bytes: &[u8]) -> Result<FrequencyIndex> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Documents to write for one compile run
#[derive(Debug, Default)]
pub struct OutputPlan {
    pub corpus: PathBuf,
    pub frequencies: Option<PathBuf>,
    pub sources: Option<PathBuf>,
}

/// Render every requested document, stage each one in a `.tmp` sibling, and
/// rename the staged files into place only once all of them are written.
/// Nothing is written if any rendering fails, and a failed staging write
/// removes the files already staged.
pub async fn write_outputs(
    plan: &OutputPlan,
    corpus: &Corpus,
    index: Option<&FrequencyIndex>,
    root: &Path,
    config: &SerializerConfig,
) -> Result<()> {
    let render_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: serde_json::Error| CorpusError::Serialize { path, source }
    };

    let mut documents = vec![(
        plan.corpus.clone(),
        serialize_corpus(corpus, config).map_err(render_err(&plan.corpus))?,
    )];
    if let (Some(path), Some(index)) = (&plan.frequencies, index) {
        let bytes = serialize_frequencies(index, config).map_err(render_err(path))?;
        documents.push((path.clone(), bytes));
    }
    if let Some(path) = &plan.sources {
        let bytes = serialize_sources(corpus, root, config).map_err(render_err(path))?;
        documents.push((path.clone(), bytes));
    }

    let mut staged = Vec::with_capacity(documents.len());
    for (path, bytes) in &documents {
        match stage(path, bytes).await {
            Ok(tmp_path) => staged.push((tmp_path, path)),
            Err(e) => {
                for (tmp_path, _) in &staged {
                    let _ = tokio::fs::remove_file(tmp_path).await;
                }
                return Err(e);
            }
        }
    }

    for (tmp_path, path) in staged {
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| CorpusError::io(path, e))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

/// Write `bytes` to the `.tmp` sibling of `path`, creating parent directories
async fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CorpusError::io(parent, e))?;
        }
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| CorpusError::io(&tmp_path, e))?;
    Ok(tmp_path)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    path.with_file_name(tmp_name)
}
