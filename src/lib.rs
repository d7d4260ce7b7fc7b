pub mod assembler;
pub mod discovery;
pub mod error;
pub mod frequency;
pub mod normalizer;
pub mod reader;
pub mod run_stats;
pub mod segmenter;
pub mod serializer;
pub mod tagger;

// Re-export main types for convenient access
pub use assembler::{
    assemble, assemble_concurrent, build_record, Assembly, AssemblerConfig, Corpus, ErrorPolicy,
    SongRecord,
};
pub use discovery::{discover_songs, DiscoveryConfig, RawLyricFile};
pub use error::{CorpusError, Result};
pub use frequency::FrequencyIndex;
pub use normalizer::normalize;
pub use segmenter::{segment, Segmented};
pub use tagger::{LexiconTagger, Tagger, Token};
