//! # Chunk Streamer
//!
//! Keeps the tiles around a moving viewer generated, picks each tile's LOD
//! from its distance, and hands finished data to the renderer.
//!
//! ## Threading
//!
//! The streamer lives on one thread. Workers compute tile data and meshes
//! from immutable inputs and post a completion message; the streamer applies
//! completions when it drains the queue in [`ChunkStreamer::update`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut streamer = ChunkStreamer::new(generator, StreamerConfig::default(), renderer)?;
//!
//! // Every frame
//! streamer.update(viewer_xz)?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tessera_procedural::{MeshGeometry, TerrainResult, TileData, TileGenerator, Vec2};

use crate::error::StreamResult;
use crate::jobs::JobRunner;
use crate::lod::{LodLevel, LodTable};
use crate::render::{TerrainRenderer, TextureSource};
use crate::tile::{LodSlot, Tile, TileCoord};

/// Streamer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Distance bands, nearest first. The last threshold is the view distance.
    pub lod_levels: Vec<LodLevel>,
    /// Viewer movement that triggers a visibility pass.
    pub viewer_move_threshold: f32,
    /// Maximum tracked tiles; `None` never evicts.
    pub retain_limit: Option<usize>,
    /// Worker thread name prefix.
    pub worker_name: String,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            lod_levels: vec![
                LodLevel::new(1, 100.0),
                LodLevel::new(2, 200.0),
                LodLevel::new(4, 300.0),
                LodLevel::new(8, 450.0),
            ],
            viewer_move_threshold: 25.0,
            retain_limit: None,
            worker_name: "tessera-tile".to_owned(),
        }
    }
}

impl StreamerConfig {
    /// Short view distance for 33-vertex test tiles.
    #[must_use]
    pub fn test() -> Self {
        Self {
            lod_levels: vec![
                LodLevel::new(1, 20.0),
                LodLevel::new(2, 40.0),
                LodLevel::new(4, 64.0),
            ],
            viewer_move_threshold: 4.0,
            retain_limit: None,
            worker_name: "tessera-test".to_owned(),
        }
    }
}

/// Counters for the lifetime of a streamer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamerStats {
    /// Tiles created (a re-created evicted tile counts again).
    pub tiles_created: u64,
    /// Base data jobs submitted.
    pub data_jobs: u64,
    /// Mesh jobs submitted.
    pub mesh_jobs: u64,
    /// Completions that changed what is shown.
    pub completions_applied: u64,
    /// Meshes that arrived after their tile wanted another LOD.
    pub stale_mesh_completions: u64,
    /// Visibility passes run.
    pub recomputations: u64,
    /// Tiles dropped by the retain limit.
    pub tiles_evicted: u64,
}

/// Message a worker posts back.
pub(crate) enum Completion {
    TileData {
        coord: TileCoord,
        result: TerrainResult<TileData>,
    },
    Mesh {
        coord: TileCoord,
        lod: usize,
        result: TerrainResult<MeshGeometry>,
    },
}

/// Streams tiles around a viewer.
pub struct ChunkStreamer<R: TerrainRenderer> {
    generator: Arc<TileGenerator>,
    config: StreamerConfig,
    lod_table: LodTable,
    renderer: R,
    jobs: JobRunner<Completion>,
    tiles: HashMap<TileCoord, Tile<R::Texture>>,
    /// Exactly the tiles whose `visible` flag is set.
    visible: Vec<TileCoord>,
    viewer: Vec2,
    /// Viewer position at the last visibility pass.
    last_pass_viewer: Option<Vec2>,
    stats: StreamerStats,
}

impl<R: TerrainRenderer> ChunkStreamer<R> {
    /// Creates a streamer.
    ///
    /// # Errors
    ///
    /// An invalid LOD table, or a step that doesn't divide the generator's
    /// interior size minus one.
    pub fn new(
        generator: Arc<TileGenerator>,
        mut config: StreamerConfig,
        renderer: R,
    ) -> StreamResult<Self> {
        let lod_table = LodTable::new(config.lod_levels.clone())?;
        lod_table.check_against(generator.interior_size())?;

        if !config.viewer_move_threshold.is_finite() || config.viewer_move_threshold < 0.0 {
            tracing::warn!(
                threshold = config.viewer_move_threshold,
                "viewer move threshold must be a non-negative number, using 0"
            );
            config.viewer_move_threshold = 0.0;
        }

        let coarsest_step = lod_table.coarsest_step();
        let border = generator.settings().border_width;
        if border < coarsest_step {
            tracing::warn!(
                border,
                coarsest_step,
                "border width below the coarsest LOD step, coarse tile seams will shade unevenly"
            );
        }

        tracing::info!(
            levels = lod_table.len(),
            view_distance = lod_table.max_view_distance(),
            tile_size = generator.tile_world_size(),
            "chunk streamer created"
        );

        Ok(Self {
            generator,
            jobs: JobRunner::new(config.worker_name.clone()),
            config,
            lod_table,
            renderer,
            tiles: HashMap::new(),
            visible: Vec::new(),
            viewer: Vec2::ZERO,
            last_pass_viewer: None,
            stats: StreamerStats::default(),
        })
    }

    /// Per-frame driver: applies finished jobs, then re-evaluates visibility
    /// if the viewer moved far enough (always on the first call).
    ///
    /// # Errors
    ///
    /// [`crate::StreamError::WorkerSpawn`] if a job couldn't be started.
    pub fn update(&mut self, viewer: Vec2) -> StreamResult<()> {
        self.set_viewer(viewer);
        self.process_completions()?;

        let threshold = self.config.viewer_move_threshold;
        let moved = self
            .last_pass_viewer
            .map_or(true, |last| last.distance_squared(viewer) > threshold * threshold);
        if moved {
            self.recompute_visible()?;
        }
        Ok(())
    }

    /// Moves the viewer without running a visibility pass.
    pub fn set_viewer(&mut self, viewer: Vec2) {
        self.viewer = viewer;
    }

    /// Current viewer position.
    #[must_use]
    pub const fn viewer(&self) -> Vec2 {
        self.viewer
    }

    /// Applies every queued completion in arrival order.
    ///
    /// Returns the number of completions drained.
    ///
    /// # Errors
    ///
    /// [`crate::StreamError::WorkerSpawn`] if a follow-up mesh job couldn't be started.
    pub fn process_completions(&mut self) -> StreamResult<usize> {
        let batch = self.jobs.drain();
        let count = batch.len();
        for completion in batch {
            match completion {
                Completion::TileData { coord, result } => self.apply_tile_data(coord, result)?,
                Completion::Mesh { coord, lod, result } => self.apply_mesh(coord, lod, result),
            }
        }
        Ok(count)
    }

    /// Visibility pass: creates missing tiles in range, re-picks every
    /// candidate's LOD and hides tiles that fell out of range.
    ///
    /// # Errors
    ///
    /// [`crate::StreamError::WorkerSpawn`] if a job couldn't be started.
    pub fn recompute_visible(&mut self) -> StreamResult<()> {
        self.last_pass_viewer = Some(self.viewer);
        self.stats.recomputations += 1;

        let tile_size = self.generator.tile_world_size();
        let center = TileCoord::from_world(self.viewer, tile_size);
        let radius = (self.lod_table.max_view_distance() / tile_size).ceil() as i32;

        let mut candidates = HashSet::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let coord = TileCoord::new(center.x + dx, center.y + dy);
                candidates.insert(coord);

                if self.tiles.contains_key(&coord) {
                    self.evaluate_tile(coord)?;
                } else {
                    self.create_tile(coord)?;
                }
            }
        }

        let dropped: Vec<TileCoord> = self
            .visible
            .iter()
            .filter(|coord| !candidates.contains(*coord))
            .copied()
            .collect();
        for coord in dropped {
            if let Some(tile) = self.tiles.get_mut(&coord) {
                tile.desired_lod = None;
            }
            self.set_tile_visible(coord, false);
        }

        self.evict_excess(&candidates);

        tracing::debug!(
            viewer_x = self.viewer.x,
            viewer_y = self.viewer.y,
            tiles = self.tiles.len(),
            visible = self.visible.len(),
            "visibility pass"
        );
        Ok(())
    }

    /// Blocks until every job (including follow-ups) is applied, or `timeout`.
    ///
    /// Returns `true` if nothing is left in flight.
    ///
    /// # Errors
    ///
    /// [`crate::StreamError::WorkerSpawn`] if a follow-up job couldn't be started.
    pub fn flush(&mut self, timeout: Duration) -> StreamResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.jobs.wait_idle(remaining);
            self.process_completions()?;

            if self.jobs.is_idle() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }

    /// Tile at `coord`, if tracked.
    #[must_use]
    pub fn tile(&self, coord: TileCoord) -> Option<&Tile<R::Texture>> {
        self.tiles.get(&coord)
    }

    /// All tracked tiles.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile<R::Texture>> {
        self.tiles.values()
    }

    /// Number of tracked tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Tiles currently within view distance.
    #[must_use]
    pub fn visible_tiles(&self) -> &[TileCoord] {
        &self.visible
    }

    /// Lifetime counters.
    #[must_use]
    pub const fn stats(&self) -> &StreamerStats {
        &self.stats
    }

    /// The LOD table in use.
    #[must_use]
    pub const fn lod_table(&self) -> &LodTable {
        &self.lod_table
    }

    /// The shared generator.
    #[must_use]
    pub const fn generator(&self) -> &Arc<TileGenerator> {
        &self.generator
    }

    /// The renderer.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Jobs still running.
    #[must_use]
    pub fn in_flight_jobs(&self) -> usize {
        self.jobs.in_flight()
    }

    fn create_tile(&mut self, coord: TileCoord) -> StreamResult<()> {
        self.tiles.insert(coord, Tile::new(coord, self.lod_table.len()));
        self.stats.tiles_created += 1;

        let generator = Arc::clone(&self.generator);
        let center = coord.center(generator.tile_world_size());
        let submitted = self.jobs.submit(move || Completion::TileData {
            coord,
            result: generator.generate_tile_data(center),
        });
        if let Err(e) = submitted {
            // Forget the tile so the next pass asks again.
            self.tiles.remove(&coord);
            return Err(e);
        }

        self.stats.data_jobs += 1;
        tracing::trace!(x = coord.x, y = coord.y, "tile data requested");
        Ok(())
    }

    /// Picks the tile's LOD, swaps or requests its mesh, updates visibility.
    fn evaluate_tile(&mut self, coord: TileCoord) -> StreamResult<()> {
        let tile_size = self.generator.tile_world_size();
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return Ok(());
        };
        let Some(heights) = tile.heights.clone() else {
            return Ok(());
        };

        let distance = coord.distance_to_bounds(self.viewer, tile_size);
        let lod = self.lod_table.select(distance);
        tile.desired_lod = lod;

        if let Some(lod) = lod {
            match &tile.lods[lod] {
                LodSlot::Ready(mesh) => {
                    if tile.active_lod != Some(lod) {
                        if let Some(texture) = &tile.texture {
                            self.renderer.display_mesh(coord, mesh, texture);
                        }
                        tile.active_lod = Some(lod);
                    }
                }
                LodSlot::Empty => {
                    tile.lods[lod] = LodSlot::Pending;
                    let generator = Arc::clone(&self.generator);
                    let step = self.lod_table.levels()[lod].step;
                    let submitted = self.jobs.submit(move || Completion::Mesh {
                        coord,
                        lod,
                        result: generator.build_mesh(&heights, step),
                    });
                    if let Err(e) = submitted {
                        tile.lods[lod] = LodSlot::Empty;
                        return Err(e);
                    }
                    self.stats.mesh_jobs += 1;
                    tracing::trace!(x = coord.x, y = coord.y, lod, step, "mesh requested");
                }
                LodSlot::Pending | LodSlot::Failed => {}
            }
        }

        self.set_tile_visible(coord, lod.is_some());
        Ok(())
    }

    fn apply_tile_data(
        &mut self,
        coord: TileCoord,
        result: TerrainResult<TileData>,
    ) -> StreamResult<()> {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            tracing::debug!(x = coord.x, y = coord.y, "tile data for untracked tile dropped");
            return Ok(());
        };
        if tile.has_data() {
            tracing::warn!(x = coord.x, y = coord.y, "duplicate tile data ignored");
            return Ok(());
        }

        let data = match result {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(x = coord.x, y = coord.y, error = %e, "tile data failed");
                tile.data_failed = true;
                return Ok(());
            }
        };

        tile.texture = Some(self.renderer.display_texture(TextureSource::Colors(&data.colors)));
        tile.heights = Some(Arc::new(data.heights));
        tile.colors = Some(data.colors);
        self.stats.completions_applied += 1;

        self.evaluate_tile(coord)
    }

    fn apply_mesh(&mut self, coord: TileCoord, lod: usize, result: TerrainResult<MeshGeometry>) {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            tracing::debug!(x = coord.x, y = coord.y, lod, "mesh for untracked tile dropped");
            return;
        };

        let mesh = match result {
            Ok(mesh) => mesh,
            Err(e) => {
                tracing::error!(x = coord.x, y = coord.y, lod, error = %e, "mesh build failed");
                tile.lods[lod] = LodSlot::Failed;
                return;
            }
        };
        tile.lods[lod] = LodSlot::Ready(mesh);

        if tile.desired_lod != Some(lod) {
            self.stats.stale_mesh_completions += 1;
            tracing::debug!(
                x = coord.x,
                y = coord.y,
                lod,
                desired = ?tile.desired_lod,
                "stale mesh cached, not shown"
            );
            return;
        }

        if let (LodSlot::Ready(mesh), Some(texture)) = (&tile.lods[lod], &tile.texture) {
            self.renderer.display_mesh(coord, mesh, texture);
            tile.active_lod = Some(lod);
            self.stats.completions_applied += 1;
        }
    }

    /// Flags a tile and mirrors the change to the renderer and the visible list.
    fn set_tile_visible(&mut self, coord: TileCoord, visible: bool) {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return;
        };
        if tile.visible == visible {
            return;
        }
        tile.visible = visible;
        self.renderer.set_visible(coord, visible);

        if visible {
            self.visible.push(coord);
        } else {
            self.visible.retain(|&c| c != coord);
        }
    }

    /// Drops hidden, idle tiles outside the candidate square, farthest first,
    /// down to the retain limit.
    ///
    /// Candidates are never evicted: the next pass would only create them again.
    fn evict_excess(&mut self, candidates: &HashSet<TileCoord>) {
        let Some(limit) = self.config.retain_limit else {
            return;
        };
        if self.tiles.len() <= limit {
            return;
        }

        let tile_size = self.generator.tile_world_size();
        let viewer = self.viewer;
        let mut evictable: Vec<(f32, TileCoord)> = self
            .tiles
            .values()
            .filter(|tile| !tile.visible && !tile.awaiting_job())
            .filter(|tile| !candidates.contains(&tile.coord()))
            .map(|tile| (tile.coord().distance_to_bounds(viewer, tile_size), tile.coord()))
            .collect();
        evictable.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let excess = self.tiles.len() - limit;
        for (_, coord) in evictable.into_iter().take(excess) {
            self.tiles.remove(&coord);
            self.renderer.release_tile(coord);
            self.stats.tiles_evicted += 1;
            tracing::trace!(x = coord.x, y = coord.y, "tile evicted");
        }
    }
}

impl<R: TerrainRenderer> std::fmt::Debug for ChunkStreamer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStreamer")
            .field("viewer", &self.viewer)
            .field("tiles", &self.tiles.len())
            .field("visible", &self.visible.len())
            .field("jobs", &self.jobs)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
