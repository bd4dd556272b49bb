//! Height response curve.
//!
//! Immutable piecewise-linear mapping applied to every sampled height before
//! it is scaled into world units. Holds no evaluation cache, so one instance
//! can be shared by every mesh worker at once.

use serde::{Deserialize, Serialize};

/// A `(time, value)` control point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Input position.
    pub time: f32,
    /// Output at that position.
    pub value: f32,
}

impl CurveKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Piecewise-linear curve, clamped outside its key range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CurveKey>", into = "Vec<CurveKey>")]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl HeightCurve {
    /// Builds a curve; keys are sorted by time, non-finite keys are dropped.
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = CurveKey>) -> Self {
        let mut keys: Vec<CurveKey> = keys
            .into_iter()
            .filter(|k| k.time.is_finite() && k.value.is_finite())
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Identity on [0, 1].
    #[must_use]
    pub fn linear() -> Self {
        Self::new([CurveKey::new(0.0, 0.0), CurveKey::new(1.0, 1.0)])
    }

    /// Flat up to `water_level`, then rising linearly to 1.
    ///
    /// Keeps lakes and seas from rippling with the noise.
    #[must_use]
    pub fn flat_below(water_level: f32) -> Self {
        Self::new([
            CurveKey::new(0.0, 0.0),
            CurveKey::new(water_level, 0.0),
            CurveKey::new(1.0, 1.0),
        ])
    }

    /// Control points, ascending by time.
    #[must_use]
    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Evaluates the curve at `t`. An empty curve is the identity.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return t;
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t; t > first.time guarantees idx >= 1.
        let idx = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[idx - 1];
        let b = self.keys[idx];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        a.value + (b.value - a.value) * ((t - a.time) / span)
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl From<Vec<CurveKey>> for HeightCurve {
    fn from(keys: Vec<CurveKey>) -> Self {
        Self::new(keys)
    }
}

impl From<HeightCurve> for Vec<CurveKey> {
    fn from(curve: HeightCurve) -> Self {
        curve.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_is_identity() {
        let curve = HeightCurve::linear();
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((curve.evaluate(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clamps_outside_range() {
        let curve = HeightCurve::linear();
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(2.5), 1.0);
    }

    #[test]
    fn test_flat_below_water() {
        let curve = HeightCurve::flat_below(0.4);
        assert_eq!(curve.evaluate(0.1), 0.0);
        assert_eq!(curve.evaluate(0.4), 0.0);
        assert!((curve.evaluate(0.7) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unsorted_keys_are_sorted() {
        let curve = HeightCurve::new([CurveKey::new(1.0, 2.0), CurveKey::new(0.0, 0.0)]);
        assert!((curve.evaluate(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_curve_passes_through() {
        let curve = HeightCurve::new([]);
        assert_eq!(curve.evaluate(0.42), 0.42);
    }

    #[test]
    fn test_shared_across_threads() {
        let curve = std::sync::Arc::new(HeightCurve::flat_below(0.3));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let curve = std::sync::Arc::clone(&curve);
                std::thread::spawn(move || curve.evaluate(0.65))
            })
            .collect();
        for h in handles {
            assert!((h.join().unwrap() - 0.5).abs() < 1e-6);
        }
    }
}
