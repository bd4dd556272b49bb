//! # Height and Color Grids
//!
//! Square grids produced once per generation request and never mutated after
//! they leave the generator.
//!
//! ## Layout
//!
//! ```text
//!  border
//!  ┌───────────────────┐
//!  │ ┌───────────────┐ │   width = interior + 2 * border
//!  │ │   interior    │ │   cell (x, y) stored at y * width + x
//!  │ └───────────────┘ │
//!  └───────────────────┘
//! ```
//!
//! The border only exists so that edge vertices can see their real
//! neighbours when normals are baked.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::falloff::FalloffField;

/// Linear RGBA color, one texel of a [`ColorField`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    /// Red channel [0, 1]
    pub r: f32,
    /// Green channel [0, 1]
    pub g: f32,
    /// Blue channel [0, 1]
    pub b: f32,
    /// Alpha channel [0, 1]
    #[serde(default = "opaque")]
    pub a: f32,
}

const fn opaque() -> f32 {
    1.0
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Sentinel for cells no classification rule matched (magenta).
    pub const UNCLASSIFIED: Self = Self::rgb(1.0, 0.0, 1.0);

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Linear interpolation between two colors, `t` clamped to [0, 1].
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::UNCLASSIFIED
    }
}

/// Square grid of heights with an optional border ring.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    /// Full side length including the border on both sides.
    width: usize,
    /// Border cells on each side.
    border: usize,
    /// Row-major heights.
    values: Vec<f32>,
}

impl HeightField {
    /// Wraps row-major values of a `width` x `width` grid.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != width * width` or the border leaves no interior.
    #[must_use]
    pub fn from_values(width: usize, border: usize, values: Vec<f32>) -> Self {
        assert_eq!(values.len(), width * width, "height field must be square");
        assert!(width > 2 * border, "border leaves no interior");
        Self { width, border, values }
    }

    /// Creates a field where every cell has the same height.
    #[must_use]
    pub fn filled(width: usize, border: usize, height: f32) -> Self {
        Self::from_values(width, border, vec![height; width * width])
    }

    /// Full side length, border included.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Border cells on each side.
    #[inline]
    #[must_use]
    pub const fn border(&self) -> usize {
        self.border
    }

    /// Side length of the interior region.
    #[inline]
    #[must_use]
    pub const fn interior_size(&self) -> usize {
        self.width - 2 * self.border
    }

    /// Height at full-grid coordinates (border included).
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Height at interior coordinates (border excluded).
    #[inline]
    #[must_use]
    pub fn interior(&self, x: usize, y: usize) -> f32 {
        self.get(x + self.border, y + self.border)
    }

    /// Raw row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Smallest and largest value in the field.
    #[must_use]
    pub fn min_max(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Subtracts a same-sized mask from every cell, clamping into [0, 1].
    ///
    /// Used to bake an island falloff into the heights.
    ///
    /// # Errors
    ///
    /// [`TerrainError::FieldSizeMismatch`] if `mask` is not `width` x `width`.
    pub fn subtract_clamped(mut self, mask: &FalloffField) -> TerrainResult<Self> {
        if mask.size() != self.width {
            return Err(TerrainError::FieldSizeMismatch {
                expected: self.width,
                actual: mask.size(),
            });
        }
        for (value, m) in self.values.iter_mut().zip(mask.values()) {
            *value = (*value - m).clamp(0.0, 1.0);
        }
        Ok(self)
    }
}

/// Square grid of colors, one per interior cell of a [`HeightField`].
#[derive(Clone, Debug, PartialEq)]
pub struct ColorField {
    /// Side length.
    size: usize,
    /// Row-major texels.
    texels: Vec<Color>,
}

impl ColorField {
    /// Wraps row-major texels.
    ///
    /// # Panics
    ///
    /// Panics if `texels.len() != size * size`.
    #[must_use]
    pub fn from_texels(size: usize, texels: Vec<Color>) -> Self {
        assert_eq!(texels.len(), size * size, "color field must be square");
        Self { size, texels }
    }

    /// Grayscale texture of a height field's interior: black at 0, white at 1.
    #[must_use]
    pub fn from_height_field(heights: &HeightField) -> Self {
        let size = heights.interior_size();
        let mut texels = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                texels.push(Color::BLACK.lerp(Color::WHITE, heights.interior(x, y)));
            }
        }
        Self { size, texels }
    }

    /// Side length.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Texel at (x, y).
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Color {
        self.texels[y * self.size + x]
    }

    /// Row-major texels.
    #[must_use]
    pub fn texels(&self) -> &[Color] {
        &self.texels
    }

    /// Texels as raw bytes (RGBA32F) for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}
