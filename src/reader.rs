use crate::error::{CorpusError, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::debug;

/// Configuration for raw file reading
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { buffer_size: 8192 }
    }
}

/// Statistics for one read
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub lines_read: u64,
    pub bytes_read: u64,
    pub duration_ms: u64,
}

/// Async reader for raw lyric files. Sources are opened read-only; the
/// compiler never writes back to them.
#[derive(Debug, Clone, Default)]
pub struct AsyncFileReader {
    config: ReaderConfig,
}

impl AsyncFileReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a whole file as UTF-8. Open, read and decoding failures are
    /// reported as IO errors carrying the path.
    pub async fn read_file<P: AsRef<Path>>(&self, file_path: P) -> Result<(String, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();

        debug!("Starting async read of file: {}", path.display());

        let file = File::open(path).await.map_err(|e| CorpusError::io(path, e))?;
        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut content = String::new();
        let bytes_read = reader
            .read_to_string(&mut content)
            .await
            .map_err(|e| CorpusError::io(path, e))?;

        let stats = ReadStats {
            file_path: path.display().to_string(),
            lines_read: content.lines().count() as u64,
            bytes_read: bytes_read as u64,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        debug!(
            "Read {}: {} lines, {} bytes in {}ms",
            path.display(),
            stats.lines_read,
            stats.bytes_read,
            stats.duration_ms
        );
        Ok((content, stats))
    }
}

/// Read a single file with the default configuration
pub async fn read_file_async<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let reader = AsyncFileReader::default();
    let (content, _stats) = reader.read_file(file_path).await?;
    Ok(content)
}
