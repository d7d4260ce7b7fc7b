// Run statistics written next to the compiled corpus.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of one raw file in a completed run
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Skipped,
}

/// Per-file processing statistics
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileStats {
    /// File path relative to the corpus root
    pub path: String,
    /// Song key derived from the path
    pub key: String,
    /// Raw bytes read from the file
    pub bytes: u64,
    pub words: u64,
    /// Number of content lines
    pub lines: u64,
    pub processing_time_ms: u64,
    pub status: FileStatus,
    pub error: Option<String>,
}

/// Whole-run statistics
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RunStats {
    /// Unix timestamp (seconds) the run started
    pub run_start: u64,
    pub total_processing_time_ms: u64,
    pub files_processed: u64,
    pub files_skipped: u64,
    pub total_bytes: u64,
    pub total_words: u64,
    pub distinct_words: u64,
    pub file_stats: Vec<FileStats>,
}

impl RunStats {
    pub fn new(run_start: u64) -> Self {
        Self {
            run_start,
            ..Self::default()
        }
    }

    pub fn record(&mut self, stats: FileStats) {
        match stats.status {
            FileStatus::Success => {
                self.files_processed += 1;
                self.total_words += stats.words;
            }
            FileStatus::Skipped => self.files_skipped += 1,
        }
        self.total_bytes += stats.bytes;
        self.file_stats.push(stats);
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Seconds since the unix epoch, 0 if the clock is before it
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stats(status: FileStatus, words: u64) -> FileStats {
        FileStats {
            path: "01_a/01_b.txt".into(),
            key: "a--b".into(),
            bytes: words * 6,
            words,
            lines: 1,
            processing_time_ms: 0,
            status,
            error: None,
        }
    }

    #[test]
    fn test_record_counts_by_status() {
        let mut run = RunStats::new(1);
        run.record(stats(FileStatus::Success, 10));
        run.record(stats(FileStatus::Success, 5));
        run.record(stats(FileStatus::Skipped, 2));

        assert_eq!(run.files_processed, 2);
        assert_eq!(run.files_skipped, 1);
        assert_eq!(run.total_words, 15);
        assert_eq!(run.total_bytes, 102);
        assert_eq!(run.file_stats.len(), 3);
    }

    #[tokio::test]
    async fn test_write_json_structure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/run_stats.json");
        let mut run = RunStats::new(42);
        run.record(stats(FileStatus::Success, 3));
        run.write(&path).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["run_start"], 42);
        assert_eq!(value["files_processed"], 1);
        assert_eq!(value["file_stats"][0]["key"], "a--b");
        assert_eq!(value["file_stats"][0]["status"], "success");
        assert_eq!(value["file_stats"][0]["bytes"], 18);
    }
}
