// Line/word segmentation of normalized lyric text.

use crate::error::{CorpusError, Result};

/// Characters removed from content lines before splitting into words
pub const FILLER_PUNCTUATION: [char; 8] = ['"', '\'', '(', ')', ',', '.', '?', '!'];

/// Flat word stream of one song plus the cumulative word count after each
/// content line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmented {
    pub words: Vec<String>,
    pub end_positions: Vec<usize>,
}

/// Split normalized text into words and line boundaries.
///
/// Blank lines are skipped. Lines starting with `[` are section labels and
/// must end with `]`; they contribute nothing. Every other line is a content
/// line: filler punctuation is stripped, the remainder is split on
/// whitespace, and the running word count is pushed onto `end_positions`.
///
/// A content line consisting only of filler punctuation contributes zero
/// words, so its end position repeats the previous one. `end_positions` is
/// therefore non-decreasing, and strictly increasing only when every content
/// line yields at least one word.
pub fn segment(text: &str, source_id: &str) -> Result<Segmented> {
    let mut segmented = Segmented::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(CorpusError::Format {
                    source_id: source_id.to_string(),
                    line: index + 1,
                });
            }
            continue;
        }

        let filtered: String = line
            .chars()
            .filter(|ch| !FILLER_PUNCTUATION.contains(ch))
            .collect();
        segmented
            .words
            .extend(filtered.split_whitespace().map(str::to_string));
        segmented.end_positions.push(segmented.words.len());
    }

    Ok(segmented)
}
