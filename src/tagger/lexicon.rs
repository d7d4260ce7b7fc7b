//! Built-in Penn Treebank style tagger.
//!
//! Closed-class words (pronouns, determiners, prepositions, auxiliaries,
//! interjections) come from a fixed lexicon; open-class words fall back to
//! suffix rules and finally `NN`. A TSV override lexicon (`word<TAB>TAG` per
//! line, `#` comments allowed) can be layered on top with [`LexiconTagger::load`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use super::{is_valid_tag, Tagger, Token};

const CLOSED_CLASS: &[(&str, &[&str])] = &[
    ("PRP", &[
        "i", "me", "you", "he", "him", "she", "we", "us", "they", "them", "it",
        "myself", "yourself", "himself", "herself", "itself", "ourselves", "themselves",
        "im", "ive", "ill", "id", "youre", "youve", "youll", "youd", "hes", "shes",
        "theyre", "theyve", "its",
    ]),
    ("PRP$", &["my", "your", "his", "her", "our", "their", "mine", "yours", "ours", "theirs"]),
    ("DT", &[
        "the", "a", "an", "this", "that", "these", "those", "every", "each", "some",
        "any", "no", "all", "another", "both", "either", "neither",
    ]),
    ("IN", &[
        "in", "on", "at", "of", "for", "with", "from", "by", "about", "into", "like",
        "through", "over", "under", "after", "before", "between", "without", "till",
        "until", "since", "if", "because", "while", "though", "although", "than",
        "around", "across", "against", "behind", "beneath", "beside", "near", "upon",
        "cause", "cuz", "til", "whether",
    ]),
    ("CC", &["and", "but", "or", "nor", "so", "yet", "n"]),
    ("TO", &["to"]),
    ("MD", &[
        "can", "could", "will", "would", "shall", "should", "may", "might", "must",
        "cant", "couldnt", "wont", "wouldnt", "shouldnt", "gonna", "wanna", "gotta",
    ]),
    ("VBP", &["am", "are", "have", "do", "dont", "aint", "arent", "havent"]),
    ("VBZ", &["is", "has", "does", "doesnt", "isnt", "hasnt", "thats", "theres", "whats"]),
    ("VBD", &[
        "was", "had", "did", "didnt", "wasnt", "were", "werent", "hadnt", "said", "knew",
        "thought", "felt", "left", "told",
    ]),
    ("VB", &["be", "go", "get", "make", "take", "know", "let", "say", "see", "come"]),
    ("VBN", &["been", "gone", "done", "known", "seen", "taken"]),
    ("VBG", &["being", "going", "nothing", "something", "everything", "anything"]),
    ("WRB", &["when", "where", "why", "how", "whenever", "wherever"]),
    ("WP", &["who", "whom", "what", "whoever", "whatever"]),
    ("WDT", &["which"]),
    ("EX", &["there"]),
    ("RB", &[
        "not", "never", "ever", "always", "now", "then", "here", "just", "still",
        "again", "too", "very", "really", "back", "away", "down", "up", "out", "off",
        "only", "even", "forever", "tonight", "anymore", "once", "soon", "maybe",
    ]),
    ("UH", &[
        "oh", "ohh", "ooh", "ah", "ahh", "uh", "huh", "yeah", "whoa", "hey", "la",
        "na", "mm", "mmm", "mmmm", "ha", "ayy", "eh", "ra", "di", "da", "yes", "ok", "okay",
    ]),
];

const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ing", "VBG"),
    ("ed", "VBD"),
    ("ly", "RB"),
    ("est", "JJS"),
    ("ous", "JJ"),
    ("ful", "JJ"),
    ("less", "JJ"),
    ("ive", "JJ"),
    ("able", "JJ"),
    ("ible", "JJ"),
    ("ness", "NN"),
    ("ment", "NN"),
    ("tion", "NN"),
    ("s", "NNS"),
];

/// Lexicon + suffix-rule tagger
#[derive(Debug, Clone)]
pub struct LexiconTagger {
    lexicon: HashMap<String, String>,
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconTagger {
    pub fn new() -> Self {
        let mut lexicon = HashMap::new();
        for (tag, words) in CLOSED_CLASS {
            for word in *words {
                lexicon.insert((*word).to_string(), (*tag).to_string());
            }
        }
        Self { lexicon }
    }

    /// Built-in lexicon extended with (and overridden by) a TSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("open lexicon {}", path.display()))?;
        let mut tagger = Self::new();

        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let lineno = lineno + 1;
            let line =
                line.with_context(|| format!("read line {lineno} in {}", path.display()))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (word, tag) = line.split_once('\t').with_context(|| {
                format!("line {lineno} in {} is not word<TAB>TAG", path.display())
            })?;
            let (word, tag) = (word.trim(), tag.trim());
            if word.is_empty() || !is_valid_tag(tag) {
                anyhow::bail!(
                    "line {lineno} in {}: {tag:?} is not a single tag for {word:?}",
                    path.display()
                );
            }
            tagger.insert(word, tag);
        }
        Ok(tagger)
    }

    pub fn insert(&mut self, word: &str, tag: &str) {
        self.lexicon.insert(word.to_lowercase(), tag.to_string());
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    /// Tag a single word without context
    pub fn tag_word(&self, word: &str) -> &str {
        let lower = word.to_lowercase();
        if let Some(tag) = self.lexicon.get(&lower) {
            return tag;
        }
        if !lower.is_empty() && lower.chars().all(|c| c.is_ascii_digit() || c == ',' || c == ':') {
            return "CD";
        }
        if !lower.chars().any(char::is_alphanumeric) {
            return "SYM";
        }
        for (suffix, tag) in SUFFIX_RULES {
            // Require a stem so short words like "is" or "red" don't match.
            if lower.len() > suffix.len() + 2 && lower.ends_with(suffix) {
                return tag;
            }
        }
        "NN"
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, words: &[String]) -> anyhow::Result<Vec<Token>> {
        Ok(words
            .iter()
            .map(|word| Token::new(word.as_str(), self.tag_word(word)))
            .collect())
    }
}
