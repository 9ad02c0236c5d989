#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkingError {
    #[error("Text cannot be empty")]
    EmptyInput,
    #[error("Chunk {index} is empty")]
    InvalidChunk { index: usize },
}
