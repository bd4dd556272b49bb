//! # Streaming Error Types
//!
//! Configuration mistakes caught when a streamer is built, plus worker
//! spawn failures. Stale completions are not errors: they are a normal race
//! and only show up in [`crate::StreamerStats`].

use tessera_procedural::TerrainError;
use thiserror::Error;

/// Errors that can occur while setting up or driving tile streaming.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The LOD table has no levels, so nothing could ever be visible.
    #[error("lod table is empty")]
    EmptyLodTable,

    /// A level's distance threshold is below the previous level's.
    #[error("lod table thresholds must ascend: level {index} is closer than the level before it")]
    LodTableNotAscending {
        /// Index of the offending level.
        index: usize,
    },

    /// A level has a decimation step of zero.
    #[error("lod level {index} has step 0")]
    InvalidLodStep {
        /// Index of the offending level.
        index: usize,
    },

    /// Terrain configuration or generation error.
    #[error(transparent)]
    Terrain(#[from] TerrainError),

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
