//! Renderer seam.
//!
//! Display code implements [`TerrainRenderer`]; the streamer only ever calls
//! it from the consumer thread and never looks inside a texture handle.

use tessera_procedural::{ColorField, HeightField, MeshGeometry};

use crate::tile::TileCoord;

/// What a texture should be built from.
#[derive(Clone, Copy, Debug)]
pub enum TextureSource<'a> {
    /// Classified region colors.
    Colors(&'a ColorField),
    /// Raw heights, shown as grayscale.
    Heights(&'a HeightField),
}

/// Receives generated terrain for display.
pub trait TerrainRenderer {
    /// Opaque handle to an uploaded texture.
    type Texture;

    /// Uploads a texture.
    fn display_texture(&mut self, source: TextureSource<'_>) -> Self::Texture;

    /// Shows `mesh` for the tile at `coord`, replacing whatever it showed before.
    fn display_mesh(&mut self, coord: TileCoord, mesh: &MeshGeometry, texture: &Self::Texture);

    /// Shows or hides a tile.
    fn set_visible(&mut self, coord: TileCoord, visible: bool);

    /// The tile was evicted; free anything held for it.
    fn release_tile(&mut self, _coord: TileCoord) {}
}

/// Discards everything. For headless runs and benchmarks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl TerrainRenderer for NullRenderer {
    type Texture = ();

    fn display_texture(&mut self, _source: TextureSource<'_>) {}

    fn display_mesh(&mut self, _coord: TileCoord, _mesh: &MeshGeometry, _texture: &()) {}

    fn set_visible(&mut self, _coord: TileCoord, _visible: bool) {}
}
