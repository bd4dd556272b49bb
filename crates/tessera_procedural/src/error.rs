//! # Terrain Error Types
//!
//! All errors that can occur while generating terrain data.
//!
//! Out-of-range tuning values (non-positive scale, lacunarity below one,
//! negative octave counts) are not errors: they are clamped where the
//! configuration is validated. Only values that cannot be corrected end up here.

use thiserror::Error;

/// Errors that can occur in terrain generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerrainError {
    /// A parameter holds a value that cannot be clamped into range (NaN, infinity).
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A decimation stride does not evenly divide the tile interior size minus one.
    #[error("lod step {step} does not divide interior size {interior_size} minus one")]
    LodStepMismatch {
        /// The requested stride.
        step: usize,
        /// The tile interior size (vertices per side at full detail).
        interior_size: usize,
    },

    /// Tile interior size is too small to form a single quad.
    #[error("invalid tile size: {0} (need at least 2 vertices per side)")]
    InvalidTileSize(usize),

    /// Two grids that must line up have different dimensions.
    #[error("field size mismatch: expected {expected}, got {actual}")]
    FieldSizeMismatch {
        /// Expected side length.
        expected: usize,
        /// Actual side length.
        actual: usize,
    },

    /// Configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;
