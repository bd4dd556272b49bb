//! # Coherent Noise and Height Fields
//!
//! High-performance, deterministic noise generation.
//!
//! ## Layers
//!
//! - `SimplexNoise`: a single coherent 2D noise layer
//! - `NoiseField`: sums `octaves` layers into a normalized height grid
//!
//! ## Determinism Guarantee
//!
//! Given the same `NoiseParameters`, `NoiseField` will produce
//! **exactly** the same values on any platform, any time. Nothing but
//! `NoiseParameters::seed` feeds the random streams.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::field::HeightField;
use crate::math::Vec2;

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., the permutation table).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        // FNV-1a hash mixing
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

/// Pre-computed permutation table for noise.
///
/// This is computed once from the seed and reused.
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl PermutationTable {
    /// 12 gradient vectors for 2D simplex.
    const GRADIENTS: [[i8; 2]; 12] = [
        [1, 0], [1, 1], [0, 1], [-1, 1],
        [-1, 0], [-1, -1], [0, -1], [1, -1],
        [1, 0], [0, 1], [-1, 0], [0, -1],
    ];

    /// Creates a new permutation table from a seed.
    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];

        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates shuffle with deterministic xorshift64.
        // xorshift never leaves zero, so a zero seed gets nudged.
        let mut rng_state = seed.value() | 1;
        for i in (1..256).rev() {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 7;
            rng_state ^= rng_state << 17;

            let j = (rng_state as usize) % (i + 1);
            perm.swap(i, j);
        }

        // Double the table to avoid index wrapping
        for i in 0..256 {
            perm[256 + i] = perm[i];
        }

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }

    #[inline]
    fn gradient(hash: u8) -> [i8; 2] {
        Self::GRADIENTS[(hash % 12) as usize]
    }
}

/// 2D Simplex noise generator.
///
/// Smooth and continuous: nearby inputs give nearby outputs, which is what
/// lets independently generated tiles meet without seams.
pub struct SimplexNoise {
    /// The permutation table.
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid.
    const F2: f64 = 0.366_025_403_784_439; // (sqrt(3) - 1) / 2
    /// Unskewing factor for 2D simplex grid.
    const G2: f64 = 0.211_324_865_405_187; // (3 - sqrt(3)) / 6

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D simplex noise at the given coordinates.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        // Skew input coordinates to simplex grid
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        // Unskew to get first corner in simplex
        let unskew = i.wrapping_add(j) as f64 * Self::G2;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let y1 = y0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;

        let gi0 = self.perm_table.get(ii + self.perm_table.get(jj) as usize);
        let gi1 = self.perm_table.get(ii + i1 + self.perm_table.get(jj + j1) as usize);
        let gi2 = self.perm_table.get(ii + 1 + self.perm_table.get(jj + 1) as usize);

        let n0 = Self::contribution(x0, y0, gi0);
        let n1 = Self::contribution(x1, y1, gi1);
        let n2 = Self::contribution(x2, y2, gi2);

        // 70.0 normalizes the output to [-1, 1]
        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }

    /// Samples noise remapped to [0, 1].
    #[inline]
    #[must_use]
    pub fn sample_unit(&self, x: f64, y: f64) -> f64 {
        (self.sample(x, y) + 1.0) * 0.5
    }

    /// Calculates the contribution from one corner of the simplex.
    #[inline]
    fn contribution(x: f64, y: f64, gradient_index: u8) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            0.0
        } else {
            let grad = PermutationTable::gradient(gradient_index);
            let t2 = t * t;
            t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]))
        }
    }
}

/// Fast floor function.
///
/// i64 so far-out sample coordinates (tiny scales, large offsets) cannot overflow.
#[inline]
fn fast_floor(x: f64) -> i64 {
    let xi = x as i64;
    if x < xi as f64 { xi - 1 } else { xi }
}

/// How raw accumulated heights are mapped into the output range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Inverse-lerp from this field's observed min/max to [0, 1].
    ///
    /// Best contrast for a single map, but neighbouring tiles disagree.
    #[default]
    Local,
    /// Divide by the theoretical maximum amplitude.
    ///
    /// Independent of the tile, so streamed tiles line up.
    Global,
}

/// Parameters for a multi-octave noise field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    /// Seed for octave offsets and the permutation table.
    pub seed: WorldSeed,
    /// Zoom: larger values stretch features out.
    pub scale: f32,
    /// Number of layers summed.
    pub octaves: i32,
    /// Amplitude multiplier per octave, [0, 1].
    pub persistence: f32,
    /// Frequency multiplier per octave, >= 1.
    pub lacunarity: f32,
    /// Global offset added to every octave's sampling origin.
    pub offset: Vec2,
    /// Normalization policy.
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            seed: WorldSeed::default(),
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Local,
        }
    }
}

impl NoiseParameters {
    /// Smallest scale allowed; anything at or below zero is bumped to this.
    pub const MIN_SCALE: f32 = 0.0001;

    /// Clamps out-of-range values in place and rejects non-finite ones.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidParameter`] if a value is NaN or infinite.
    pub fn validated(mut self) -> TerrainResult<Self> {
        for (name, value) in [
            ("noise.scale", self.scale),
            ("noise.persistence", self.persistence),
            ("noise.lacunarity", self.lacunarity),
            ("noise.offset.x", self.offset.x),
            ("noise.offset.y", self.offset.y),
        ] {
            if !value.is_finite() {
                return Err(TerrainError::InvalidParameter {
                    name,
                    reason: format!("{value} is not finite"),
                });
            }
        }

        if self.scale <= 0.0 {
            tracing::warn!(scale = self.scale, "noise scale must be positive, clamping");
            self.scale = Self::MIN_SCALE;
        }
        if self.lacunarity < 1.0 {
            tracing::warn!(lacunarity = self.lacunarity, "lacunarity below 1, clamping");
            self.lacunarity = 1.0;
        }
        if self.octaves < 0 {
            tracing::warn!(octaves = self.octaves, "negative octave count, clamping");
            self.octaves = 0;
        }
        if !(0.0..=1.0).contains(&self.persistence) {
            tracing::warn!(persistence = self.persistence, "persistence outside [0, 1], clamping");
            self.persistence = self.persistence.clamp(0.0, 1.0);
        }
        Ok(self)
    }

    /// Same parameters with a different global offset.
    #[must_use]
    pub fn with_offset(&self, offset: Vec2) -> Self {
        Self { offset, ..self.clone() }
    }

    /// Sum of all octave amplitudes: the largest height the layers can add.
    #[must_use]
    pub fn max_possible_height(&self) -> f32 {
        let mut amplitude = 1.0f32;
        let mut total = 0.0f32;
        for _ in 0..self.octaves.max(0) {
            total += amplitude;
            amplitude *= self.persistence;
        }
        total
    }
}

/// Multi-octave noise grid generator.
pub struct NoiseField;

impl NoiseField {
    /// Brightening applied in `Global` mode so typical terrain reaches the top regions.
    pub const GLOBAL_BOOST: f32 = 1.07;

    /// Half-width of the range octave offsets are drawn from.
    const OFFSET_RANGE: i32 = 100_000;

    /// Per-octave sampling origins.
    ///
    /// Y is inverted relative to X so that rows grow "south" in world space.
    fn octave_offsets(params: &NoiseParameters) -> Vec<(f64, f64)> {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed.value());
        (0..params.octaves.max(0))
            .map(|_| {
                let ox = rng.gen_range(-Self::OFFSET_RANGE..Self::OFFSET_RANGE);
                let oy = rng.gen_range(-Self::OFFSET_RANGE..Self::OFFSET_RANGE);
                (
                    f64::from(ox) + f64::from(params.offset.x),
                    f64::from(oy) - f64::from(params.offset.y),
                )
            })
            .collect()
    }

    /// Generates a `width` x `height` row-major grid of normalized heights.
    ///
    /// `params` is used as given; run it through
    /// [`NoiseParameters::validated`] first. The scale is still guarded here so
    /// a zero scale can never divide.
    #[must_use]
    pub fn generate_map(width: usize, height: usize, params: &NoiseParameters) -> Vec<f32> {
        let noise = SimplexNoise::new(params.seed.derive(0x7065_726d)); // "perm"
        let offsets = Self::octave_offsets(params);
        let scale = f64::from(if params.scale <= 0.0 {
            NoiseParameters::MIN_SCALE
        } else {
            params.scale
        });
        let persistence = f64::from(params.persistence);
        let lacunarity = f64::from(params.lacunarity);

        let half_width = width as f64 / 2.0;
        let half_height = height as f64 / 2.0;

        let mut values = Vec::with_capacity(width * height);
        let mut min_height = f32::MAX;
        let mut max_height = f32::MIN;

        for y in 0..height {
            for x in 0..width {
                let mut amplitude = 1.0f64;
                let mut frequency = 1.0f64;
                let mut noise_height = 1.0f64;

                for &(ox, oy) in &offsets {
                    let sample_x = (x as f64 - half_width + ox) / scale * frequency;
                    let sample_y = (y as f64 - half_height + oy) / scale * frequency;

                    let value = noise.sample_unit(sample_x, sample_y) * 2.0 - 1.0;
                    noise_height += value * amplitude;

                    amplitude *= persistence;
                    frequency *= lacunarity;
                }

                let noise_height = noise_height as f32;
                min_height = min_height.min(noise_height);
                max_height = max_height.max(noise_height);
                values.push(noise_height);
            }
        }

        match params.normalize_mode {
            NormalizeMode::Local => {
                let range = max_height - min_height;
                for value in &mut values {
                    *value = if range > 0.0 {
                        ((*value - min_height) / range).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                }
            }
            NormalizeMode::Global => {
                let max_possible = params.max_possible_height();
                // Zero octaves: nothing was added, keep the base height unscaled.
                let max_possible = if max_possible > 0.0 { max_possible } else { 1.0 };
                for value in &mut values {
                    let normalized = ((*value + 1.0) / 2.0) / max_possible * Self::GLOBAL_BOOST;
                    *value = normalized.max(0.0);
                }
            }
        }

        values
    }

    /// Generates a square height field of `interior + 2 * border` cells per side.
    #[must_use]
    pub fn generate(interior: usize, border: usize, params: &NoiseParameters) -> HeightField {
        let width = interior + 2 * border;
        HeightField::from_values(width, border, Self::generate_map(width, width, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: NormalizeMode) -> NoiseParameters {
        NoiseParameters {
            seed: WorldSeed::new(12345),
            scale: 25.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::new(13.0, -7.0),
            normalize_mode: mode,
        }
    }

    #[test]
    fn test_determinism() {
        let seed = WorldSeed::new(12345);
        let noise1 = SimplexNoise::new(seed);
        let noise2 = SimplexNoise::new(seed);

        for i in 0..100 {
            let x = f64::from(i) * 0.1;
            let y = f64::from(i) * 0.17;
            assert_eq!(
                noise1.sample(x, y),
                noise2.sample(x, y),
                "Noise should be deterministic"
            );
        }
    }

    #[test]
    fn test_range() {
        let noise = SimplexNoise::new(WorldSeed::new(42));

        for i in 0..10000 {
            let x = (f64::from(i) * 0.1) - 500.0;
            let y = (f64::from(i) * 0.13) - 650.0;
            let value = noise.sample_unit(x, y);

            assert!(
                (0.0..=1.0).contains(&value),
                "Value {value} out of range at ({x}, {y})"
            );
        }
    }

    #[test]
    fn test_continuity() {
        let noise = SimplexNoise::new(WorldSeed::new(42));

        let v1 = noise.sample(100.0, 100.0);
        let v2 = noise.sample(100.001, 100.0);
        let v3 = noise.sample(100.0, 100.001);

        assert!((v1 - v2).abs() < 0.01, "Noise should be continuous");
        assert!((v1 - v3).abs() < 0.01, "Noise should be continuous");
    }

    #[test]
    fn test_far_coordinates_do_not_overflow() {
        let noise = SimplexNoise::new(WorldSeed::new(7));
        let value = noise.sample(1.0e12, -1.0e12);
        assert!(value.is_finite());
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        assert_ne!(base.derive(1), base.derive(2));
        assert_eq!(base.derive(1), base.derive(1));
        assert_ne!(base.derive(1), base);
    }

    #[test]
    fn test_field_is_bit_identical() {
        let p = params(NormalizeMode::Local);
        let a = NoiseField::generate_map(40, 30, &p);
        let b = NoiseField::generate_map(40, 30, &p);
        assert_eq!(a.len(), 1200);
        assert!(a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn test_local_mode_hits_both_bounds() {
        let map = NoiseField::generate_map(48, 48, &params(NormalizeMode::Local));

        assert!(map.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(map.iter().any(|&v| v == 0.0), "observed min must map to 0");
        assert!(map.iter().any(|&v| v == 1.0), "observed max must map to 1");
    }

    #[test]
    fn test_global_mode_is_monotonic_in_raw_height() {
        let local = NoiseField::generate_map(32, 32, &params(NormalizeMode::Local));
        let global = NoiseField::generate_map(32, 32, &params(NormalizeMode::Global));

        assert!(global.iter().all(|&v| v >= 0.0));

        // Local is an increasing affine map of the raw height, Global is too,
        // so both must order cells identically.
        let mut pairs: Vec<(f32, f32)> = local.into_iter().zip(global).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            assert!(w[0].1 <= w[1].1 + 1e-6, "global order differs from raw order");
        }
    }

    #[test]
    fn test_global_mode_matches_across_tiles() {
        // Two overlapping windows of the same world must agree on shared cells.
        let base = params(NormalizeMode::Global);
        let left = NoiseField::generate_map(20, 20, &base.with_offset(Vec2::new(0.0, 0.0)));
        let right = NoiseField::generate_map(20, 20, &base.with_offset(Vec2::new(10.0, 0.0)));

        // right column x samples the same world point as left column x + 10
        for y in 0..20 {
            for x in 0..10 {
                let a = left[y * 20 + x + 10];
                let b = right[y * 20 + x];
                assert!((a - b).abs() < 1e-5, "mismatch at ({x}, {y}): {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_zero_octaves_is_flat() {
        let mut p = params(NormalizeMode::Local);
        p.octaves = 0;
        let map = NoiseField::generate_map(8, 8, &p);
        assert!(map.iter().all(|&v| v == 0.0));

        p.normalize_mode = NormalizeMode::Global;
        let map = NoiseField::generate_map(8, 8, &p);
        assert!(map.iter().all(|&v| (v - NoiseField::GLOBAL_BOOST).abs() < 1e-6));
    }

    #[test]
    fn test_validation_clamps() {
        let p = NoiseParameters {
            scale: -3.0,
            octaves: -2,
            lacunarity: 0.5,
            persistence: 1.5,
            ..NoiseParameters::default()
        }
        .validated()
        .unwrap();

        assert_eq!(p.scale, NoiseParameters::MIN_SCALE);
        assert_eq!(p.octaves, 0);
        assert_eq!(p.lacunarity, 1.0);
        assert_eq!(p.persistence, 1.0);
    }

    #[test]
    fn test_validation_rejects_nan() {
        let p = NoiseParameters {
            scale: f32::NAN,
            ..NoiseParameters::default()
        };
        assert!(matches!(
            p.validated(),
            Err(TerrainError::InvalidParameter { name: "noise.scale", .. })
        ));
    }

    #[test]
    fn test_max_possible_height() {
        let p = params(NormalizeMode::Global);
        // 1 + 0.5 + 0.25 + 0.125
        assert!((p.max_possible_height() - 1.875).abs() < 1e-6);
    }
}
