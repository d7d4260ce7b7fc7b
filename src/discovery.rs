use crate::error::{CorpusError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Separator between album and song display names in a song key
pub const KEY_SEPARATOR: &str = "--";

/// Configuration for album/song discovery
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Raw album directory names to leave out of the corpus
    pub excluded_albums: Vec<String>,
}

/// One raw song file, identified by its album directory and file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLyricFile {
    pub album_dir: String,
    pub file_name: String,
    pub path: PathBuf,
}

impl RawLyricFile {
    pub fn new(root: &Path, album_dir: impl Into<String>, file_name: impl Into<String>) -> Self {
        let album_dir = album_dir.into();
        let file_name = file_name.into();
        let path = root.join(&album_dir).join(&file_name);
        Self {
            album_dir,
            file_name,
            path,
        }
    }

    /// Album name with its ordering prefix removed
    pub fn album_display(&self) -> &str {
        strip_ordering_prefix(&self.album_dir)
    }

    /// Song name with its ordering prefix and file extension removed
    pub fn song_display(&self) -> &str {
        let name = strip_ordering_prefix(&self.file_name);
        match name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// `<album>--<song>`, unique across a well-formed corpus
    pub fn song_key(&self) -> String {
        format!("{}{}{}", self.album_display(), KEY_SEPARATOR, self.song_display())
    }

    /// Path relative to the corpus root, used in diagnostics
    pub fn source_id(&self) -> String {
        format!("{}/{}", self.album_dir, self.file_name)
    }
}

/// Drop everything up to and including the first underscore. Names without
/// an underscore are returned unchanged.
pub fn strip_ordering_prefix(name: &str) -> &str {
    match name.split_once('_') {
        Some((_prefix, rest)) => rest,
        None => name,
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Find every song file under `root`: one subdirectory per album, one text
/// file per song. Results are sorted by album then file name.
pub fn discover_songs(
    root: impl AsRef<Path>,
    config: &DiscoveryConfig,
) -> Result<Vec<RawLyricFile>> {
    let root = root.as_ref();
    debug!("Starting song discovery under {}", root.display());

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if entry.depth() > 0 && is_hidden(&name) {
                return false;
            }
            if entry.depth() == 1 && entry.file_type().is_dir() {
                let excluded = config.excluded_albums.iter().any(|album| album == name.as_ref());
                if excluded {
                    info!("Skipping excluded album: {}", name);
                }
                return !excluded;
            }
            true
        });

    let mut songs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            let source = e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
            });
            CorpusError::io(path, source)
        })?;

        if entry.depth() != 2 || !entry.file_type().is_file() {
            continue;
        }

        let album_dir = match entry.path().parent().and_then(Path::file_name) {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        let file_name = match entry.file_name().to_str() {
            Some(name) => name.to_string(),
            None => {
                warn!("Skipping file with non UTF-8 name: {}", entry.path().display());
                continue;
            }
        };

        debug!("Found song file: {}", entry.path().display());
        songs.push(RawLyricFile {
            album_dir,
            file_name,
            path: entry.path().to_path_buf(),
        });
    }

    info!("Discovered {} song files under {}", songs.len(), root.display());
    Ok(songs)
}
