// Cross-song word frequency: for each lowercase word, how many songs contain it.

use crate::assembler::Corpus;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

/// Lowercase word -> number of distinct songs containing it
pub type FrequencyIndex = BTreeMap<String, usize>;

/// Build the frequency index in one pass over all words.
///
/// Each song contributes at most once per word, however often the word
/// repeats inside it.
pub fn index(corpus: &Corpus) -> FrequencyIndex {
    let mut songs_by_word: HashMap<String, HashSet<&str>> = HashMap::new();

    for (key, record) in corpus.iter() {
        for word in record.words() {
            songs_by_word
                .entry(word.to_lowercase())
                .or_default()
                .insert(key.as_str());
        }
    }

    let index: FrequencyIndex = songs_by_word
        .into_iter()
        .map(|(word, songs)| (word, songs.len()))
        .collect();

    info!("Frequency index built: {} distinct words over {} songs", index.len(), corpus.len());
    index
}
