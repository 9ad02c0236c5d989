pub mod error;
pub mod splitter;

pub use error::ChunkingError;
pub use splitter::{chunk_metadata, split_text_into_chunks, validate_chunks, ChunkMetadata};

/// Default soft cap for a single speakable chunk
pub const DEFAULT_MAX_CHARS_PER_CHUNK: usize = 300;
