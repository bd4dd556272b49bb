//! # Tessera Streaming
//!
//! Streams procedurally generated terrain tiles around a moving viewer.
//!
//! ## Architecture
//!
//! ```text
//! viewer ──► ChunkStreamer ──► JobRunner ──► worker threads
//!                 ▲                              │
//!                 └──── completion queue ◄───────┘
//!                 │
//!                 └──► TerrainRenderer (textures, meshes, visibility)
//! ```
//!
//! - Workers only run [`tessera_procedural::TileGenerator`] on immutable inputs
//! - Tiles, LOD caches and the visible set belong to the streamer's thread
//! - A mesh that arrives for an LOD the tile no longer wants is cached, not shown
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tessera_procedural::{TerrainSettings, TileGenerator, Vec2};
//! use tessera_streaming::{ChunkStreamer, NullRenderer, StreamerConfig};
//!
//! let generator = Arc::new(TileGenerator::new(TerrainSettings::test())?);
//! let mut streamer = ChunkStreamer::new(generator, StreamerConfig::test(), NullRenderer)?;
//!
//! streamer.update(Vec2::ZERO)?;
//! streamer.flush(Duration::from_secs(30))?;
//! assert!(!streamer.visible_tiles().is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod jobs;
pub mod lod;
pub mod preview;
pub mod render;
pub mod streamer;
pub mod tile;

pub use error::{StreamError, StreamResult};
pub use jobs::{Deferred, JobRunner};
pub use lod::{LodLevel, LodTable};
pub use preview::{draw_preview, DrawMode};
pub use render::{NullRenderer, TerrainRenderer, TextureSource};
pub use streamer::{ChunkStreamer, StreamerConfig, StreamerStats};
pub use tile::{Tile, TileCoord, TileState};
