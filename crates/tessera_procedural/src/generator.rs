//! # Tile Generator
//!
//! The facade workers call. Holds validated settings plus everything that
//! can be precomputed once per configuration (the falloff mask), and is
//! shared read-only between threads.

use crate::classify::HeightClassifier;
use crate::error::TerrainResult;
use crate::falloff::FalloffField;
use crate::field::{ColorField, HeightField};
use crate::math::Vec2;
use crate::mesh::{MeshBuilder, MeshGeometry};
use crate::noise::NoiseField;
use crate::settings::TerrainSettings;

/// Base data of one tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileData {
    /// Bordered heights, falloff already applied.
    pub heights: HeightField,
    /// Classified interior colors.
    pub colors: ColorField,
}

/// Produces tile data and meshes from a fixed configuration.
#[derive(Debug)]
pub struct TileGenerator {
    settings: TerrainSettings,
    /// Covers the full bordered field; `None` when falloff is off.
    falloff: Option<FalloffField>,
}

impl TileGenerator {
    /// Validates `settings` and precomputes the falloff mask.
    ///
    /// # Errors
    ///
    /// Whatever [`TerrainSettings::validated`] rejects.
    pub fn new(settings: TerrainSettings) -> TerrainResult<Self> {
        let settings = settings.validated()?;
        let falloff = settings
            .use_falloff
            .then(|| FalloffField::generate(settings.bordered_size()));

        tracing::debug!(
            interior_size = settings.interior_size,
            border_width = settings.border_width,
            falloff = settings.use_falloff,
            "tile generator ready"
        );

        Ok(Self { settings, falloff })
    }

    /// The validated settings.
    #[must_use]
    pub const fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Vertices per tile side at full detail.
    #[must_use]
    pub const fn interior_size(&self) -> usize {
        self.settings.interior_size
    }

    /// World units covered by one tile (adjacent tiles share an edge row).
    #[must_use]
    pub fn tile_world_size(&self) -> f32 {
        (self.settings.interior_size - 1) as f32
    }

    /// Generates heights and colors for the tile centred at `center` (world x, z).
    ///
    /// # Errors
    ///
    /// [`crate::TerrainError::FieldSizeMismatch`] if the cached falloff does
    /// not cover the bordered field.
    pub fn generate_tile_data(&self, center: Vec2) -> TerrainResult<TileData> {
        let noise = &self.settings.noise;
        let params = noise.with_offset(noise.offset + center);

        let mut heights =
            NoiseField::generate(self.settings.interior_size, self.settings.border_width, &params);
        if let Some(falloff) = &self.falloff {
            heights = heights.subtract_clamped(falloff)?;
        }

        // Falloff is already in the heights, so the classifier must not apply it again.
        let colors = HeightClassifier::classify(&heights, &self.settings.regions, None)?;

        Ok(TileData { heights, colors })
    }

    /// Builds the mesh of a tile at one LOD step.
    ///
    /// # Errors
    ///
    /// [`crate::TerrainError::LodStepMismatch`] if `lod_step` doesn't divide
    /// the interior size minus one.
    pub fn build_mesh(
        &self,
        heights: &HeightField,
        lod_step: usize,
    ) -> TerrainResult<MeshGeometry> {
        MeshBuilder::build(
            heights,
            self.settings.height_multiplier,
            &self.settings.height_curve,
            lod_step,
        )
    }
}
