//! # Tiles
//!
//! A tile owns its base data (heights + colors, set once) and a cache of
//! meshes, one slot per LOD level. Only the consumer thread touches tiles;
//! workers get an `Arc` of the heights and nothing else.
//!
//! ## Lifecycle
//!
//! ```text
//! Absent ──► DataPending ──► DataReady ──► MeshPending(lod) ──► MeshReady(lod)
//!                                 ▲                                   │
//!                                 └────────── LOD changes ────────────┘
//! ```

use std::sync::Arc;

use tessera_procedural::{ColorField, HeightField, MeshGeometry, Vec2};

/// Tile coordinate (identifies a tile in the tile grid, not world units).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// X coordinate (in tiles).
    pub x: i32,
    /// Y coordinate (in tiles, world +z).
    pub y: i32,
}

impl TileCoord {
    /// The tile centred on the world origin.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a new tile coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile whose centre is nearest to a world position.
    #[inline]
    #[must_use]
    pub fn from_world(position: Vec2, tile_size: f32) -> Self {
        Self {
            x: (position.x / tile_size).round() as i32,
            y: (position.y / tile_size).round() as i32,
        }
    }

    /// World position of the tile centre.
    #[inline]
    #[must_use]
    pub fn center(self, tile_size: f32) -> Vec2 {
        Vec2::new(self.x as f32 * tile_size, self.y as f32 * tile_size)
    }

    /// Distance from `viewer` to the nearest point of this tile's square bounds.
    ///
    /// Zero when the viewer stands on the tile.
    #[must_use]
    pub fn distance_to_bounds(self, viewer: Vec2, tile_size: f32) -> f32 {
        let center = self.center(tile_size);
        let half = tile_size / 2.0;
        let dx = ((viewer.x - center.x).abs() - half).max(0.0);
        let dy = ((viewer.y - center.y).abs() - half).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Where a tile is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileState {
    /// Base data requested, not arrived yet (or failed, see [`Tile::data_failed`]).
    DataPending,
    /// Base data present; no mesh wanted, or the wanted one failed.
    DataReady,
    /// Waiting for the mesh of this LOD index.
    MeshPending(usize),
    /// Showing the mesh of this LOD index.
    MeshReady(usize),
}

/// Cache slot for one LOD.
#[derive(Debug, Default)]
pub(crate) enum LodSlot {
    #[default]
    Empty,
    Pending,
    Ready(MeshGeometry),
    /// Build failed; never retried.
    Failed,
}

/// One tracked tile.
#[derive(Debug)]
pub struct Tile<T> {
    coord: TileCoord,
    pub(crate) heights: Option<Arc<HeightField>>,
    /// Base data generation failed; never retried.
    pub(crate) data_failed: bool,
    pub(crate) colors: Option<ColorField>,
    pub(crate) texture: Option<T>,
    pub(crate) lods: Vec<LodSlot>,
    /// LOD the viewer distance asks for; `None` when out of range.
    pub(crate) desired_lod: Option<usize>,
    /// LOD whose mesh the renderer currently shows.
    pub(crate) active_lod: Option<usize>,
    pub(crate) visible: bool,
}

impl<T> Tile<T> {
    pub(crate) fn new(coord: TileCoord, lod_count: usize) -> Self {
        Self {
            coord,
            heights: None,
            data_failed: false,
            colors: None,
            texture: None,
            lods: (0..lod_count).map(|_| LodSlot::Empty).collect(),
            desired_lod: None,
            active_lod: None,
            visible: false,
        }
    }

    /// Grid coordinate.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TileState {
        if self.heights.is_none() {
            return TileState::DataPending;
        }
        match self.desired_lod {
            Some(lod) if self.active_lod == Some(lod) => TileState::MeshReady(lod),
            Some(lod) if matches!(self.lods[lod], LodSlot::Pending) => TileState::MeshPending(lod),
            _ => TileState::DataReady,
        }
    }

    /// Whether base data has arrived.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.heights.is_some()
    }

    /// Bordered heights, once arrived.
    #[must_use]
    pub fn heights(&self) -> Option<&HeightField> {
        self.heights.as_deref()
    }

    /// Classified colors, once arrived.
    #[must_use]
    pub fn colors(&self) -> Option<&ColorField> {
        self.colors.as_ref()
    }

    /// Renderer texture handle, once arrived.
    #[must_use]
    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }

    /// Whether the tile is within view distance.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// LOD index wanted at the last evaluation.
    #[must_use]
    pub const fn desired_lod(&self) -> Option<usize> {
        self.desired_lod
    }

    /// LOD index of the mesh on screen.
    #[must_use]
    pub const fn active_lod(&self) -> Option<usize> {
        self.active_lod
    }

    /// Cached mesh for a LOD index.
    #[must_use]
    pub fn mesh(&self, lod: usize) -> Option<&MeshGeometry> {
        match self.lods.get(lod) {
            Some(LodSlot::Ready(mesh)) => Some(mesh),
            _ => None,
        }
    }

    /// Mesh currently on screen.
    #[must_use]
    pub fn active_mesh(&self) -> Option<&MeshGeometry> {
        self.active_lod.and_then(|lod| self.mesh(lod))
    }

    /// Number of LODs with a cached mesh.
    #[must_use]
    pub fn cached_mesh_count(&self) -> usize {
        self.lods.iter().filter(|s| matches!(s, LodSlot::Ready(_))).count()
    }

    /// Whether base data generation failed.
    #[must_use]
    pub const fn data_failed(&self) -> bool {
        self.data_failed
    }

    /// Whether a worker is still computing something for this tile.
    #[must_use]
    pub fn awaiting_job(&self) -> bool {
        (self.heights.is_none() && !self.data_failed)
            || self.lods.iter().any(|s| matches!(s, LodSlot::Pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world_rounds_to_nearest_centre() {
        assert_eq!(TileCoord::from_world(Vec2::new(0.0, 0.0), 32.0), TileCoord::ORIGIN);
        assert_eq!(TileCoord::from_world(Vec2::new(15.9, -15.9), 32.0), TileCoord::ORIGIN);
        assert_eq!(TileCoord::from_world(Vec2::new(16.1, 0.0), 32.0), TileCoord::new(1, 0));
        assert_eq!(TileCoord::from_world(Vec2::new(-100.0, 70.0), 32.0), TileCoord::new(-3, 2));
    }

    #[test]
    fn test_distance_to_bounds() {
        let coord = TileCoord::new(1, 0); // bounds x in [16, 48], y in [-16, 16]
        assert_eq!(coord.distance_to_bounds(Vec2::new(30.0, 5.0), 32.0), 0.0);
        assert_eq!(coord.distance_to_bounds(Vec2::new(0.0, 0.0), 32.0), 16.0);
        assert_eq!(coord.distance_to_bounds(Vec2::new(51.0, 20.0), 32.0), 5.0);
    }

    #[test]
    fn test_state_transitions() {
        let mut tile: Tile<()> = Tile::new(TileCoord::ORIGIN, 3);
        assert_eq!(tile.state(), TileState::DataPending);
        assert!(tile.awaiting_job());

        tile.heights = Some(Arc::new(HeightField::filled(5, 1, 0.0)));
        assert_eq!(tile.state(), TileState::DataReady);
        assert!(!tile.awaiting_job());

        tile.desired_lod = Some(1);
        tile.lods[1] = LodSlot::Pending;
        assert_eq!(tile.state(), TileState::MeshPending(1));

        tile.lods[1] = LodSlot::Ready(MeshGeometry::default());
        tile.active_lod = Some(1);
        assert_eq!(tile.state(), TileState::MeshReady(1));
        assert_eq!(tile.cached_mesh_count(), 1);
    }

    #[test]
    fn test_failed_data_is_not_awaited() {
        let mut tile: Tile<()> = Tile::new(TileCoord::ORIGIN, 2);
        tile.data_failed = true;
        assert!(!tile.awaiting_job());
        assert_eq!(tile.state(), TileState::DataPending);
    }
}
