//! Corpus assembly: turns raw song files into tagged [`SongRecord`]s and
//! collects them into a [`Corpus`] keyed by song key.
//!
//! Per-file work (read, normalize, segment, tag) runs concurrently with a
//! bounded window. Completed records are inserted one at a time in discovery
//! order, so collision reporting and skip/abort decisions do not depend on
//! completion order.

use crate::discovery::RawLyricFile;
use crate::error::{CorpusError, Result};
use crate::normalizer::normalize;
use crate::reader::AsyncFileReader;
use crate::run_stats::{FileStats, FileStatus};
use crate::segmenter::segment;
use crate::tagger::{tag_aligned, Tagger};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What to do when a single file fails with a per-file error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the whole run on the first per-file error
    #[default]
    Abort,
    /// Leave the file out of the corpus, report it, keep going
    Skip,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ErrorPolicy::Abort),
            "skip" => Ok(ErrorPolicy::Skip),
            other => Err(format!(
                "unknown error policy {other:?}, expected abort or skip"
            )),
        }
    }
}

/// Configuration for corpus assembly
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub policy: ErrorPolicy,
    /// Maximum number of files in flight at once
    pub concurrency: usize,
    /// Deadline for normalizing, segmenting and tagging one file.
    ///
    /// Blocking-pool work cannot be cancelled: a timed-out file is reported
    /// at once, but its tagging call keeps its pool thread until it returns.
    pub tag_timeout: Option<Duration>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            policy: ErrorPolicy::Abort,
            concurrency: num_cpus::get().max(1),
            tag_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Tokenized and tagged lyrics of one song.
///
/// `words` and `tags` always have the same length, and every entry of either
/// is non-empty with no whitespace. `end_positions` holds the
/// cumulative word count after each content line; it is non-decreasing, ends
/// at `words.len()`, and repeats a value only for a content line that had no
/// words left after punctuation stripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
    end_positions: Vec<usize>,
    words: Vec<String>,
    tags: Vec<String>,
}

impl SongRecord {
    pub fn new(
        key: &str,
        end_positions: Vec<usize>,
        words: Vec<String>,
        tags: Vec<String>,
    ) -> Result<Self> {
        let invalid = |reason: String| CorpusError::InvalidRecord {
            key: key.to_string(),
            reason,
        };

        if words.len() != tags.len() {
            return Err(invalid(format!(
                "{} words but {} tags",
                words.len(),
                tags.len()
            )));
        }
        let unstorable = |items: &[String]| {
            items
                .iter()
                .position(|item| item.is_empty() || item.chars().any(char::is_whitespace))
        };
        if let Some(position) = unstorable(&words) {
            return Err(invalid(format!("word {position} is empty or contains whitespace")));
        }
        if let Some(position) = unstorable(&tags) {
            return Err(invalid(format!("tag {position} is empty or contains whitespace")));
        }
        if end_positions.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(invalid("end positions decrease".to_string()));
        }
        match end_positions.last() {
            Some(&last) if last != words.len() => {
                return Err(invalid(format!(
                    "last end position {last} does not match {} words",
                    words.len()
                )));
            }
            None if !words.is_empty() => {
                return Err(invalid("words without any line boundary".to_string()));
            }
            _ => {}
        }

        Ok(Self {
            end_positions,
            words,
            tags,
        })
    }

    pub fn end_positions(&self) -> &[usize] {
        &self.end_positions
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn line_count(&self) -> usize {
        self.end_positions.len()
    }

    /// Words of each content line, recovered from `end_positions`
    pub fn lines(&self) -> impl Iterator<Item = &[String]> + '_ {
        let starts = std::iter::once(0).chain(self.end_positions.iter().copied());
        starts
            .zip(self.end_positions.iter().copied())
            .map(move |(start, end)| &self.words[start..end])
    }
}

/// Mapping from song key to song record. Keys are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    songs: BTreeMap<String, SongRecord>,
    sources: BTreeMap<String, PathBuf>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, failing if the key is already taken
    pub fn insert(&mut self, key: String, record: SongRecord, source: &Path) -> Result<()> {
        if let Some(first) = self.sources.get(&key) {
            return Err(CorpusError::KeyCollision {
                key,
                first: first.clone(),
                second: source.to_path_buf(),
            });
        }
        self.sources.insert(key.clone(), source.to_path_buf());
        self.songs.insert(key, record);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&SongRecord> {
        self.songs.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.songs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Songs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SongRecord)> {
        self.songs.iter()
    }

    /// Raw file each song key was built from
    pub fn sources(&self) -> &BTreeMap<String, PathBuf> {
        &self.sources
    }
}

/// A file left out of the corpus under [`ErrorPolicy::Skip`]
#[derive(Debug)]
pub struct SkippedFile {
    pub file: RawLyricFile,
    pub error: CorpusError,
}

/// Result of a completed assembly
#[derive(Debug, Default)]
pub struct Assembly {
    pub corpus: Corpus,
    pub skipped: Vec<SkippedFile>,
    pub file_stats: Vec<FileStats>,
}

/// Normalize, segment and tag one file's text into a record
pub fn build_record<T: Tagger + ?Sized>(
    text: &str,
    source_id: &str,
    tagger: &T,
) -> Result<SongRecord> {
    let normalized = normalize(text);
    let segmented = segment(&normalized, source_id)?;
    let tags = tag_aligned(tagger, &segmented.words, source_id)?;
    SongRecord::new(source_id, segmented.end_positions, segmented.words, tags)
}

/// One file's processing result as handed to the [`Collector`]
struct Processed {
    file: RawLyricFile,
    outcome: Result<SongRecord>,
    bytes_read: u64,
    elapsed: Duration,
}

/// Single owner of the corpus being built. Applies the collision check and
/// error policy to each per-file outcome.
struct Collector {
    policy: ErrorPolicy,
    /// Song key -> first raw file that produced it, skipped files included
    claimed: HashMap<String, PathBuf>,
    assembly: Assembly,
}

impl Collector {
    fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            claimed: HashMap::new(),
            assembly: Assembly::default(),
        }
    }

    fn accept(&mut self, processed: Processed) -> Result<()> {
        let Processed {
            file,
            outcome,
            bytes_read,
            elapsed,
        } = processed;
        let key = file.song_key();

        // The key is fixed by the path, so a file that fails still owns it.
        if let Some(first) = self.claimed.get(&key) {
            return Err(CorpusError::KeyCollision {
                key,
                first: first.clone(),
                second: file.path,
            });
        }
        self.claimed.insert(key.clone(), file.path.clone());

        let mut stats = FileStats {
            path: file.source_id(),
            key: key.clone(),
            bytes: bytes_read,
            words: 0,
            lines: 0,
            processing_time_ms: elapsed.as_millis() as u64,
            status: FileStatus::Success,
            error: None,
        };

        match outcome {
            Ok(record) => {
                stats.words = record.word_count() as u64;
                stats.lines = record.line_count() as u64;
                debug!("Assembled {}: {} words, {} lines", key, stats.words, stats.lines);
                self.assembly.corpus.insert(key, record, &file.path)?;
            }
            Err(error) if error.is_per_file() && self.policy == ErrorPolicy::Skip => {
                warn!("Skipping {}: {}", file.path.display(), error);
                stats.status = FileStatus::Skipped;
                stats.error = Some(error.to_string());
                self.assembly.skipped.push(SkippedFile { file, error });
            }
            Err(error) => return Err(error),
        }

        self.assembly.file_stats.push(stats);
        Ok(())
    }

    fn finish(self) -> Assembly {
        info!(
            "Assembly complete: {} songs, {} skipped",
            self.assembly.corpus.len(),
            self.assembly.skipped.len()
        );
        self.assembly
    }
}

/// Assemble a corpus sequentially on the current thread
pub fn assemble<T: Tagger + ?Sized>(
    files: &[RawLyricFile],
    tagger: &T,
    policy: ErrorPolicy,
) -> Result<Assembly> {
    let mut collector = Collector::new(policy);

    for file in files {
        let start = Instant::now();
        let text =
            std::fs::read_to_string(&file.path).map_err(|e| CorpusError::io(&file.path, e))?;
        let outcome = build_record(&text, &file.source_id(), tagger);
        collector.accept(Processed {
            file: file.clone(),
            outcome,
            bytes_read: text.len() as u64,
            elapsed: start.elapsed(),
        })?;
    }

    Ok(collector.finish())
}

/// Assemble a corpus with up to `config.concurrency` files in flight.
///
/// Reads are async; normalization, segmentation and tagging run on the
/// blocking pool under `config.tag_timeout`. A timeout counts as a per-file
/// error.
pub async fn assemble_concurrent(
    files: Vec<RawLyricFile>,
    tagger: Arc<dyn Tagger>,
    reader: AsyncFileReader,
    config: &AssemblerConfig,
) -> Result<Assembly> {
    info!(
        "Assembling {} files (concurrency {}, policy {:?})",
        files.len(),
        config.concurrency,
        config.policy
    );

    let timeout = config.tag_timeout;
    let mut results = Box::pin(
        stream::iter(files)
            .map(|file| {
                let tagger = Arc::clone(&tagger);
                let reader = reader.clone();
                async move {
                    let start = Instant::now();
                    let (text, read_stats) = reader.read_file(&file.path).await?;
                    let outcome = process_blocking(text, file.source_id(), tagger, timeout).await;
                    Ok::<_, CorpusError>(Processed {
                        file,
                        outcome,
                        bytes_read: read_stats.bytes_read,
                        elapsed: start.elapsed(),
                    })
                }
            })
            .buffered(config.concurrency.max(1)),
    );

    let mut collector = Collector::new(config.policy);
    while let Some(processed) = results.try_next().await? {
        collector.accept(processed)?;
    }

    Ok(collector.finish())
}

async fn process_blocking(
    text: String,
    source_id: String,
    tagger: Arc<dyn Tagger>,
    timeout: Option<Duration>,
) -> Result<SongRecord> {
    let id = source_id.clone();
    let task =
        tokio::task::spawn_blocking(move || build_record(&text, &id, tagger.as_ref()));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                return Err(CorpusError::Timeout {
                    source_id,
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        },
        None => task.await,
    };

    joined.map_err(|e| CorpusError::Tagger {
        source_id,
        message: format!("tagging task failed: {e}"),
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::{LexiconTagger, Token};
    use tempfile::TempDir;

    /// Drops the last word of any song that contains `marker`
    struct DroppingTagger {
        marker: &'static str,
    }

    impl Tagger for DroppingTagger {
        fn tag(&self, words: &[String]) -> anyhow::Result<Vec<Token>> {
            let mut tokens: Vec<Token> =
                words.iter().map(|w| Token::new(w.as_str(), "NN")).collect();
            if words.iter().any(|w| w == self.marker) {
                tokens.pop();
            }
            Ok(tokens)
        }
    }

    struct SlowTagger;

    impl Tagger for SlowTagger {
        fn tag(&self, words: &[String]) -> anyhow::Result<Vec<Token>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(words.iter().map(|w| Token::new(w.as_str(), "NN")).collect())
        }
    }

    fn write_song(root: &Path, album: &str, song: &str, content: &str) -> RawLyricFile {
        let file = RawLyricFile::new(root, album, song);
        std::fs::create_dir_all(file.path.parent().unwrap()).unwrap();
        std::fs::write(&file.path, content).unwrap();
        file
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_build_record_end_to_end() {
        let text = "[Verse]\nHello, world!\nIt\u{2019}s fine.\n";
        let record = build_record(text, "test", &LexiconTagger::new()).unwrap();
        assert_eq!(record.words(), words(&["Hello", "world", "Its", "fine"]).as_slice());
        assert_eq!(record.end_positions(), &[2, 4]);
        assert_eq!(record.tags().len(), 4);
    }

    #[test]
    fn test_record_lines_recovery() {
        let record = SongRecord::new(
            "k",
            vec![2, 2, 3],
            words(&["a", "b", "c"]),
            words(&["DT", "NN", "NN"]),
        )
        .unwrap();
        let lines: Vec<&[String]> = record.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], words(&["a", "b"]).as_slice());
        assert!(lines[1].is_empty());
        assert_eq!(lines[2], words(&["c"]).as_slice());
    }

    #[test]
    fn test_record_rejects_broken_invariants() {
        let mismatched = SongRecord::new("k", vec![1], words(&["a"]), vec![]);
        assert!(matches!(mismatched, Err(CorpusError::InvalidRecord { .. })));

        let decreasing = SongRecord::new("k", vec![2, 1], words(&["a", "b"]), words(&["X", "Y"]));
        assert!(decreasing.is_err());

        let short = SongRecord::new("k", vec![1], words(&["a", "b"]), words(&["X", "Y"]));
        assert!(short.is_err());

        let empty = SongRecord::new("k", vec![], vec![], vec![]);
        assert!(empty.is_ok());
    }

    #[test]
    fn test_corpus_rejects_duplicate_key() {
        let mut corpus = Corpus::new();
        let record = SongRecord::new("k", vec![], vec![], vec![]).unwrap();
        corpus.insert("red--22".into(), record.clone(), Path::new("01_red/01_22.txt")).unwrap();

        let err = corpus
            .insert("red--22".into(), record, Path::new("02_red/01_22.txt"))
            .unwrap_err();
        match err {
            CorpusError::KeyCollision { key, first, second } => {
                assert_eq!(key, "red--22");
                assert_eq!(first, Path::new("01_red/01_22.txt"));
                assert_eq!(second, Path::new("02_red/01_22.txt"));
            }
            other => panic!("expected collision, got {other:?}"),
        }
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_assemble_abort_on_alignment_error() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![
            write_song(temp_dir.path(), "01_a", "01_good.txt", "fine words"),
            write_song(temp_dir.path(), "01_a", "02_bad.txt", "drop me"),
        ];

        let result = assemble(&files, &DroppingTagger { marker: "drop" }, ErrorPolicy::Abort);
        assert!(matches!(result, Err(CorpusError::TagAlignment { .. })));
    }

    #[test]
    fn test_assemble_skip_on_alignment_error() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![
            write_song(temp_dir.path(), "01_a", "01_good.txt", "fine words"),
            write_song(temp_dir.path(), "01_a", "02_bad.txt", "drop me"),
            write_song(temp_dir.path(), "01_a", "03_label.txt", "[Verse\nwords"),
        ];

        let tagger = DroppingTagger { marker: "drop" };
        let assembly = assemble(&files, &tagger, ErrorPolicy::Skip).unwrap();
        assert_eq!(assembly.corpus.len(), 1);
        assert!(assembly.corpus.contains_key("a--good"));
        assert!(!assembly.corpus.contains_key("a--bad"));
        assert!(!assembly.corpus.contains_key("a--label"));

        assert_eq!(assembly.skipped.len(), 2);
        assert!(matches!(assembly.skipped[0].error, CorpusError::TagAlignment { .. }));
        assert!(matches!(assembly.skipped[1].error, CorpusError::Format { line: 1, .. }));

        let statuses: Vec<FileStatus> = assembly.file_stats.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![FileStatus::Success, FileStatus::Skipped, FileStatus::Skipped]
        );
    }

    #[test]
    fn test_assemble_collision_is_fatal_under_skip() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![
            write_song(temp_dir.path(), "01_red", "01_22.txt", "one"),
            write_song(temp_dir.path(), "02_red", "01_22.txt", "two"),
        ];

        let result = assemble(&files, &LexiconTagger::new(), ErrorPolicy::Skip);
        assert!(matches!(result, Err(CorpusError::KeyCollision { .. })));
    }

    #[tokio::test]
    async fn test_skipped_file_still_owns_its_key() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![
            write_song(temp_dir.path(), "04_red", "02_22.txt", "[Verse\nbroken"),
            write_song(temp_dir.path(), "04a_red", "02_22.txt", "fine words"),
        ];

        let result = assemble(&files, &LexiconTagger::new(), ErrorPolicy::Skip);
        match result {
            Err(CorpusError::KeyCollision { key, first, second }) => {
                assert_eq!(key, "red--22");
                assert_eq!(first, files[0].path);
                assert_eq!(second, files[1].path);
            }
            other => panic!("expected collision, got {other:?}"),
        }

        let config = AssemblerConfig {
            policy: ErrorPolicy::Skip,
            concurrency: 2,
            ..AssemblerConfig::default()
        };
        let tagger = Arc::new(LexiconTagger::new());
        let result = assemble_concurrent(files, tagger, AsyncFileReader::default(), &config).await;
        assert!(matches!(result, Err(CorpusError::KeyCollision { .. })));
    }

    #[test]
    fn test_file_stats_carry_bytes_read() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![write_song(temp_dir.path(), "01_a", "01_b.txt", "two words\n")];

        let assembly = assemble(&files, &LexiconTagger::new(), ErrorPolicy::Abort).unwrap();
        let stats = &assembly.file_stats[0];
        assert_eq!(stats.bytes, 10);
        assert_eq!(stats.words, 2);
        assert_eq!(stats.status, FileStatus::Success);
    }

    #[test]
    fn test_record_rejects_unstorable_entries() {
        let spaced_tag = SongRecord::new("k", vec![1], words(&["a"]), words(&["NN VB"]));
        assert!(matches!(spaced_tag, Err(CorpusError::InvalidRecord { .. })));

        let empty_word = SongRecord::new("k", vec![1], words(&[""]), words(&["NN"]));
        assert!(matches!(empty_word, Err(CorpusError::InvalidRecord { .. })));
    }

    #[test]
    fn test_error_policy_from_str() {
        assert_eq!("skip".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Skip);
        assert_eq!("Abort".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Abort);
        assert!("retry".parse::<ErrorPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_assemble_concurrent_matches_sequential() {
        let temp_dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for i in 0..12 {
            files.push(write_song(
                temp_dir.path(),
                &format!("{:02}_album", i % 3),
                &format!("{i:02}_song-{i}.txt"),
                &format!("[Verse]\nline number {i}\nand another, {i}!\n"),
            ));
        }

        let tagger = LexiconTagger::new();
        let sequential = assemble(&files, &tagger, ErrorPolicy::Abort).unwrap();

        let config = AssemblerConfig {
            concurrency: 4,
            ..AssemblerConfig::default()
        };
        let concurrent =
            assemble_concurrent(files, Arc::new(tagger), AsyncFileReader::default(), &config)
                .await
                .unwrap();

        assert_eq!(concurrent.corpus, sequential.corpus);
        assert_eq!(concurrent.corpus.len(), 12);
    }

    #[tokio::test]
    async fn test_assemble_concurrent_timeout_is_per_file() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![write_song(temp_dir.path(), "01_a", "01_slow.txt", "slow song")];

        let skip = AssemblerConfig {
            policy: ErrorPolicy::Skip,
            concurrency: 1,
            tag_timeout: Some(Duration::from_millis(20)),
        };
        let reader = AsyncFileReader::default();
        let assembly = assemble_concurrent(files.clone(), Arc::new(SlowTagger), reader, &skip)
            .await
            .unwrap();
        assert!(assembly.corpus.is_empty());
        assert!(matches!(assembly.skipped[0].error, CorpusError::Timeout { .. }));

        let abort = AssemblerConfig {
            policy: ErrorPolicy::Abort,
            ..skip
        };
        let reader = AsyncFileReader::default();
        let result = assemble_concurrent(files, Arc::new(SlowTagger), reader, &abort).await;
        assert!(matches!(result, Err(CorpusError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_assemble_concurrent_missing_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![RawLyricFile::new(temp_dir.path(), "01_a", "01_missing.txt")];
        let config = AssemblerConfig {
            policy: ErrorPolicy::Skip,
            ..AssemblerConfig::default()
        };

        let tagger = Arc::new(LexiconTagger::new());
        let result =
            assemble_concurrent(files, tagger, AsyncFileReader::default(), &config).await;
        assert!(matches!(result, Err(CorpusError::Io { .. })));
    }
}
