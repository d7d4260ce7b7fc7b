// Character normalization shared by the compiler and the fix-chars utility.
// Maps confusable and typographic characters to plain ASCII.

use crate::error::{CorpusError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Replacement table applied by [`normalize`]. No replacement introduces a
/// character that appears on the left-hand side, so one pass is a fixpoint.
pub const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{0435}', "e"),   // Cyrillic small letter ie
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2019}', "'"),
    ('\u{2005}', " "),   // four-per-em space
    ('\u{205F}', " "),   // medium mathematical space
    ('\u{200B}', " "),   // zero width space
    ('\u{2014}', "-"),   // em dash
    ('\u{2013}', "-"),   // en dash
    ('\u{2026}', "..."),
];

fn replacement_for(ch: char) -> Option<&'static str> {
    REPLACEMENTS
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
}

/// Normalize text. Pure and idempotent; unmapped characters pass through.
pub fn normalize(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    normalize_into(text, &mut result);
    result
}

/// Normalize into a supplied buffer, clearing it first
pub fn normalize_into(text: &str, buffer: &mut String) {
    buffer.clear();
    buffer.reserve(text.len());

    for ch in text.chars() {
        match replacement_for(ch) {
            Some(replacement) => buffer.push_str(replacement),
            None => buffer.push(ch),
        }
    }
}

/// Write a normalized copy of each input file into `out_dir`, keeping the
/// album directory and file name (`05_1989/17_slut.txt` lands at
/// `<out_dir>/05_1989/17_slut.txt`). Inputs are never modified. All targets
/// are checked before anything is written: two inputs mapping to one target,
/// or a target that resolves to its own input, are rejected.
pub async fn fix_files<P: AsRef<Path>>(files: &[P], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut targets = Vec::with_capacity(files.len());
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        let source = file.as_ref();
        let target = fixed_target(source, out_dir)?;

        if !seen.insert(target.clone()) {
            return Err(CorpusError::io(
                &target,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "two inputs map to the same output file",
                ),
            ));
        }
        if same_file(source, &target).await {
            return Err(CorpusError::io(
                &target,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "output would overwrite its source",
                ),
            ));
        }
        targets.push((source, target));
    }

    let mut written = Vec::with_capacity(targets.len());
    for (source, target) in targets {
        let raw = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| CorpusError::io(source, e))?;
        let fixed = normalize(&raw);
        debug!(
            "Normalized {} -> {} (changed: {})",
            source.display(),
            target.display(),
            fixed != raw
        );
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CorpusError::io(parent, e))?;
        }
        tokio::fs::write(&target, fixed)
            .await
            .map_err(|e| CorpusError::io(&target, e))?;
        written.push(target);
    }

    info!("Wrote {} normalized files to {}", written.len(), out_dir.display());
    Ok(written)
}

fn fixed_target(source: &Path, out_dir: &Path) -> Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        CorpusError::io(
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    Ok(match source.parent().and_then(Path::file_name) {
        Some(album) => out_dir.join(album).join(file_name),
        None => out_dir.join(file_name),
    })
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
