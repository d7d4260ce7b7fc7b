// Integration test utilities and common code

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture holding a temporary lyrics root with album/song files
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().join("lyrics");
        fs::create_dir_all(&root_path).expect("Failed to create lyrics root");

        Self {
            temp_dir,
            root_path,
        }
    }

    /// Create `<root>/<album>/<song>` with the given content
    pub fn create_song(&self, album: &str, song: &str, content: &str) -> PathBuf {
        let file_path = self.root_path.join(album).join(song);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create album directory");
        }
        fs::write(&file_path, content).expect("Failed to write song file");
        file_path
    }

    /// Path outside the lyrics root for output documents
    pub fn output_path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.temp_dir.path().join("out").join(relative)
    }
}
