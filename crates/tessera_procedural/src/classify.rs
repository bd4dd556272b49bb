//! # Height Classification
//!
//! Maps heights to colors through an ordered table of regions
//! (water, sand, grass, rock, snow...).
//!
//! Ordering matters: rules are scanned in table order, never re-sorted.

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::falloff::FalloffField;
use crate::field::{Color, ColorField, HeightField};

/// One row of a classification table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Display name (for tooling and logs).
    #[serde(default)]
    pub name: String,
    /// Threshold height in [0, 1].
    pub height: f32,
    /// Color assigned when this rule wins.
    pub color: Color,
}

impl ClassificationRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(name: impl Into<String>, height: f32, color: Color) -> Self {
        Self {
            name: name.into(),
            height,
            color,
        }
    }
}

/// Tie-break policy for picking a rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationPolicy {
    /// Highest-indexed rule whose threshold is `<=` the height.
    ///
    /// Thresholds are lower bounds: "from 0.3 up, it's sand".
    #[default]
    FloorThreshold,
    /// First rule whose threshold is `>=` the height.
    ///
    /// Thresholds are upper bounds: "up to 0.3, it's water".
    CeilingThreshold,
}

/// Ordered classification rules plus the policy that reads them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTable {
    /// Rules, expected ascending by threshold.
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
    /// How a height picks its rule.
    #[serde(default)]
    pub policy: ClassificationPolicy,
}

impl ClassificationTable {
    /// Creates a table with the default (floor) policy.
    #[must_use]
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self {
            rules,
            policy: ClassificationPolicy::default(),
        }
    }

    /// Same rules, different policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ClassificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// A water-to-snow palette.
    #[must_use]
    pub fn landscape() -> Self {
        Self::new(vec![
            ClassificationRule::new("deep water", 0.0, Color::rgb(0.13, 0.25, 0.55)),
            ClassificationRule::new("shallow water", 0.3, Color::rgb(0.21, 0.40, 0.75)),
            ClassificationRule::new("sand", 0.4, Color::rgb(0.82, 0.80, 0.50)),
            ClassificationRule::new("grass", 0.45, Color::rgb(0.34, 0.60, 0.12)),
            ClassificationRule::new("grass 2", 0.55, Color::rgb(0.24, 0.42, 0.10)),
            ClassificationRule::new("rock", 0.6, Color::rgb(0.36, 0.27, 0.22)),
            ClassificationRule::new("rock 2", 0.7, Color::rgb(0.29, 0.23, 0.21)),
            ClassificationRule::new("snow", 0.9, Color::WHITE),
        ])
    }

    /// Whether thresholds never decrease from one rule to the next.
    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.rules.windows(2).all(|w| w[0].height <= w[1].height)
    }

    /// Color for a single height, or [`Color::UNCLASSIFIED`] if nothing matches.
    #[must_use]
    pub fn color_for(&self, height: f32) -> Color {
        let rule = match self.policy {
            ClassificationPolicy::FloorThreshold => {
                self.rules.iter().rev().find(|rule| rule.height <= height)
            }
            ClassificationPolicy::CeilingThreshold => {
                self.rules.iter().find(|rule| height <= rule.height)
            }
        };
        rule.map_or(Color::UNCLASSIFIED, |rule| rule.color)
    }
}

/// Turns height fields into color fields.
pub struct HeightClassifier;

impl HeightClassifier {
    /// Classifies every interior cell of `heights`.
    ///
    /// With a falloff mask (same full width as `heights`), each height is
    /// replaced by `clamp(height - falloff, 0, 1)` before lookup.
    ///
    /// # Errors
    ///
    /// [`TerrainError::FieldSizeMismatch`] if `falloff` is given with a size
    /// other than `heights.width()`.
    pub fn classify(
        heights: &HeightField,
        table: &ClassificationTable,
        falloff: Option<&FalloffField>,
    ) -> TerrainResult<ColorField> {
        if let Some(mask) = falloff {
            if mask.size() != heights.width() {
                return Err(TerrainError::FieldSizeMismatch {
                    expected: heights.width(),
                    actual: mask.size(),
                });
            }
        }

        let size = heights.interior_size();
        let border = heights.border();
        let mut texels = Vec::with_capacity(size * size);

        for y in 0..size {
            for x in 0..size {
                let (fx, fy) = (x + border, y + border);
                let mut height = heights.get(fx, fy);
                if let Some(mask) = falloff {
                    height = (height - mask.get(fx, fy)).clamp(0.0, 1.0);
                }
                texels.push(table.color_for(height));
            }
        }

        Ok(ColorField::from_texels(size, texels))
    }
}
