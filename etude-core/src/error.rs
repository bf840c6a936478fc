use thiserror::Error;

/// Reasons a single pattern candidate could not be built.
///
/// These never escape the generator: callers of `generate` receive the
/// canonical fallback pattern instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("note pool is empty")]
    EmptyPool,

    #[error("weight table has no positive weights")]
    EmptyWeights,

    #[error("derived note {0} falls outside the MIDI range")]
    NoteOutOfRange(i16),

    #[error("pattern repeats MIDI note {0}")]
    DuplicateNotes(u8),

    #[error("invalid pattern note: {0}")]
    InvalidNote(String),

    #[error("expected {expected} notes, got {actual}")]
    WrongNoteCount { expected: usize, actual: usize },
}

/// Errors surfaced at the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("analytics snapshot rejected: {0}")]
    Snapshot(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
