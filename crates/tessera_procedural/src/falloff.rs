//! # Island Falloff
//!
//! A square mask that is ~0 in the middle and rises to 1 at the edges.
//! Subtracting it from a height field sinks the borders below sea level.

/// Precomputed falloff mask.
#[derive(Clone, Debug, PartialEq)]
pub struct FalloffField {
    size: usize,
    values: Vec<f32>,
}

impl FalloffField {
    /// Curve steepness.
    const A: f32 = 3.0;
    /// Curve midpoint shift; larger values keep more land.
    const B: f32 = 2.2;

    /// Builds a `size` x `size` mask.
    #[must_use]
    pub fn generate(size: usize) -> Self {
        let mut values = Vec::with_capacity(size * size);
        let denom = size.saturating_sub(1).max(1) as f32;

        for y in 0..size {
            for x in 0..size {
                let nx = x as f32 / denom * 2.0 - 1.0;
                let ny = y as f32 / denom * 2.0 - 1.0;
                values.push(Self::evaluate(nx.abs().max(ny.abs())));
            }
        }

        Self { size, values }
    }

    /// `v^a / (v^a + (b - b*v)^a)`
    #[inline]
    fn evaluate(value: f32) -> f32 {
        let rise = value.powf(Self::A);
        let fall = (Self::B - Self::B * value).powf(Self::A);
        let total = rise + fall;
        if total > 0.0 { rise / total } else { 0.0 }
    }

    /// Side length.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Mask value at (x, y).
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.size + x]
    }

    /// Row-major mask values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
