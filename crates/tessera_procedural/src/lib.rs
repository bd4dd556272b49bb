//! # Tessera Procedural
//!
//! Deterministic terrain synthesis for streamed, tiled worlds.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same terrain
//! 2. **Tiled**: The world is generated in fixed-size square tiles
//! 3. **Seamless**: Neighbouring tiles agree on heights and edge normals
//! 4. **Thread-safe**: Everything here is immutable once built and can be
//!    called from any worker
//!
//! ## Core Components
//!
//! - `NoiseField`: multi-octave coherent noise, Local or Global normalization
//! - `FalloffField`: island mask
//! - `HeightClassifier`: heights to region colors
//! - `MeshBuilder`: LOD-decimated meshes with border-stitched normals
//! - `TileGenerator`: the facade streaming workers call
//!
//! ## Example
//!
//! ```rust
//! use tessera_procedural::{TerrainSettings, TileGenerator, Vec2};
//!
//! let generator = TileGenerator::new(TerrainSettings::test())?;
//! let data = generator.generate_tile_data(Vec2::ZERO)?;
//! let mesh = generator.build_mesh(&data.heights, 2)?;
//!
//! assert_eq!(mesh.vertex_count(), 17 * 17);
//! # Ok::<(), tessera_procedural::TerrainError>(())
//! ```

#![warn(missing_docs)]

pub mod classify;
pub mod curve;
pub mod error;
pub mod falloff;
pub mod field;
pub mod generator;
pub mod math;
pub mod mesh;
pub mod noise;
pub mod settings;

pub use classify::{ClassificationPolicy, ClassificationRule, ClassificationTable, HeightClassifier};
pub use curve::{CurveKey, HeightCurve};
pub use error::{TerrainError, TerrainResult};
pub use falloff::FalloffField;
pub use field::{Color, ColorField, HeightField};
pub use generator::{TileData, TileGenerator};
pub use math::{Vec2, Vec3};
pub use mesh::{MeshBuilder, MeshGeometry, TerrainVertex, VertexIndex};
pub use noise::{NoiseField, NoiseParameters, NormalizeMode, SimplexNoise, WorldSeed};
pub use settings::TerrainSettings;
