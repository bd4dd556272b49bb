//! # Level of Detail
//!
//! Distance bands, nearest first. A tile picks the first band its bounds
//! are inside; past the last band it is not shown at all.

use serde::{Deserialize, Serialize};
use tessera_procedural::{MeshBuilder, TerrainError};

use crate::error::{StreamError, StreamResult};

/// One distance band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Mesh decimation stride (1 = full detail).
    pub step: usize,
    /// Tiles whose bounds are at most this far from the viewer use this level.
    pub visible_distance: f32,
}

impl LodLevel {
    /// Creates a level.
    #[must_use]
    pub const fn new(step: usize, visible_distance: f32) -> Self {
        Self {
            step,
            visible_distance,
        }
    }
}

/// Validated, ascending list of LOD levels.
#[derive(Clone, Debug, PartialEq)]
pub struct LodTable {
    levels: Vec<LodLevel>,
}

impl LodTable {
    /// Validates and wraps `levels`.
    ///
    /// # Errors
    ///
    /// - [`StreamError::EmptyLodTable`] with no levels
    /// - [`StreamError::InvalidLodStep`] for a zero step
    /// - [`StreamError::LodTableNotAscending`] if a threshold drops
    /// - [`StreamError::Terrain`] for a NaN, infinite or negative threshold
    pub fn new(levels: Vec<LodLevel>) -> StreamResult<Self> {
        if levels.is_empty() {
            return Err(StreamError::EmptyLodTable);
        }
        for (index, level) in levels.iter().enumerate() {
            if level.step == 0 {
                return Err(StreamError::InvalidLodStep { index });
            }
            if !level.visible_distance.is_finite() || level.visible_distance < 0.0 {
                return Err(TerrainError::InvalidParameter {
                    name: "lod_levels.visible_distance",
                    reason: format!("level {index} has threshold {}", level.visible_distance),
                }
                .into());
            }
            if index > 0 && level.visible_distance < levels[index - 1].visible_distance {
                return Err(StreamError::LodTableNotAscending { index });
            }
        }
        Ok(Self { levels })
    }

    /// Checks every step against a tile interior size.
    ///
    /// # Errors
    ///
    /// [`StreamError::Terrain`] wrapping the first
    /// [`TerrainError::LodStepMismatch`].
    pub fn check_against(&self, interior_size: usize) -> StreamResult<()> {
        for level in &self.levels {
            MeshBuilder::check_lod_step(interior_size, level.step)?;
        }
        Ok(())
    }

    /// The levels, nearest first.
    #[must_use]
    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    /// Number of levels (never zero).
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always `false`; a table can't be built empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LodLevel> {
        self.levels.get(index)
    }

    /// Threshold of the last level: nothing farther is visible.
    #[must_use]
    pub fn max_view_distance(&self) -> f32 {
        self.levels.last().map_or(0.0, |l| l.visible_distance)
    }

    /// Largest decimation step in the table.
    ///
    /// Tile borders narrower than this give seams whose normals differ at
    /// the coarser levels.
    #[must_use]
    pub fn coarsest_step(&self) -> usize {
        self.levels.iter().map(|l| l.step).max().unwrap_or(1)
    }

    /// Index of the level for a tile `distance` away, or `None` if invisible.
    #[must_use]
    pub fn select(&self, distance: f32) -> Option<usize> {
        self.levels
            .iter()
            .position(|level| distance <= level.visible_distance)
    }
}
