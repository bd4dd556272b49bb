//! # Terrain Settings
//!
//! Everything needed to turn a tile coordinate into height, color and mesh
//! data. Loaded once at startup, validated, then shared read-only by every
//! worker.
//!
//! ```toml
//! height_multiplier = 40.0
//! use_falloff = false
//! interior_size = 241
//! border_width = 1
//!
//! [noise]
//! seed = 42
//! scale = 80.0
//! octaves = 5
//! normalize_mode = "Global"
//!
//! [[regions.rules]]
//! name = "water"
//! height = 0.0
//! color = { r = 0.2, g = 0.4, b = 0.8 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::ClassificationTable;
use crate::curve::HeightCurve;
use crate::error::{TerrainError, TerrainResult};
use crate::noise::{NoiseParameters, NormalizeMode};

/// Terrain generation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Noise field parameters. The offset is the world origin; tiles add their centre.
    pub noise: NoiseParameters,
    /// Height to color regions.
    pub regions: ClassificationTable,
    /// World-space height of a normalized height of 1 (after the curve).
    pub height_multiplier: f32,
    /// Response curve applied before the multiplier.
    pub height_curve: HeightCurve,
    /// Bake an island falloff into every tile.
    pub use_falloff: bool,
    /// Vertices per tile side at full detail.
    pub interior_size: usize,
    /// Extra height samples around the interior, used for edge normals.
    pub border_width: usize,
}

impl Default for TerrainSettings {
    /// Streaming preset: 241-vertex tiles (240 is divisible by 1, 2, 4, 6, 8, 10 and 12).
    fn default() -> Self {
        Self {
            noise: NoiseParameters {
                normalize_mode: NormalizeMode::Global,
                ..NoiseParameters::default()
            },
            regions: ClassificationTable::landscape(),
            height_multiplier: 40.0,
            height_curve: HeightCurve::flat_below(0.3),
            use_falloff: false,
            interior_size: 241,
            border_width: 1,
        }
    }
}

impl TerrainSettings {
    /// Small tiles for tests: 33 vertices per side with a border covering LOD steps up to 4.
    #[must_use]
    pub fn test() -> Self {
        Self {
            noise: NoiseParameters {
                scale: 20.0,
                octaves: 3,
                normalize_mode: NormalizeMode::Global,
                ..NoiseParameters::default()
            },
            height_multiplier: 10.0,
            height_curve: HeightCurve::linear(),
            interior_size: 33,
            border_width: 4,
            ..Self::default()
        }
    }

    /// Full side length of a generated height field.
    #[must_use]
    pub const fn bordered_size(&self) -> usize {
        self.interior_size + 2 * self.border_width
    }

    /// Clamps correctable values and rejects the rest.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::InvalidParameter`] for non-finite numbers
    /// - [`TerrainError::InvalidTileSize`] for tiles under 2 vertices per side
    pub fn validated(mut self) -> TerrainResult<Self> {
        self.noise = self.noise.validated()?;

        if !self.height_multiplier.is_finite() {
            return Err(TerrainError::InvalidParameter {
                name: "height_multiplier",
                reason: format!("{} is not finite", self.height_multiplier),
            });
        }
        if self.interior_size < 2 {
            return Err(TerrainError::InvalidTileSize(self.interior_size));
        }
        if let Some(rule) = self.regions.rules.iter().find(|r| !r.height.is_finite()) {
            return Err(TerrainError::InvalidParameter {
                name: "regions.rules.height",
                reason: format!("rule `{}` has threshold {}", rule.name, rule.height),
            });
        }
        if !self.regions.is_ascending() {
            tracing::warn!(
                rules = self.regions.rules.len(),
                "classification thresholds are not ascending, colors may skip regions"
            );
        }
        if self.border_width == 0 {
            tracing::warn!("border_width is 0, tile edge normals will not match their neighbours");
        }

        Ok(self)
    }

    /// Parses and validates settings from TOML text.
    ///
    /// # Errors
    ///
    /// [`TerrainError::InvalidConfig`] on malformed TOML, otherwise see
    /// [`TerrainSettings::validated`].
    pub fn from_toml_str(text: &str) -> TerrainResult<Self> {
        let settings: Self =
            toml::from_str(text).map_err(|e| TerrainError::InvalidConfig(e.to_string()))?;
        settings.validated()
    }

    /// Reads, parses and validates a TOML settings file.
    ///
    /// # Errors
    ///
    /// [`TerrainError::InvalidConfig`] if the file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> TerrainResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TerrainError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let settings = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            interior_size = settings.interior_size,
            seed = settings.noise.seed.value(),
            "terrain settings loaded"
        );
        Ok(settings)
    }
}
