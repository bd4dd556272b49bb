//! # Streaming Walk Integration Test
//!
//! Walks a viewer across the world and checks the streamer's bookkeeping
//! against what the renderer was told.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tessera_procedural::{MeshGeometry, TerrainSettings, TileGenerator, Vec2};
use tessera_streaming::{
    ChunkStreamer, StreamerConfig, TerrainRenderer, TextureSource, TileCoord, TileState,
};

const WAIT: Duration = Duration::from_secs(60);

/// Remembers what the streamer asked for.
#[derive(Default)]
struct RecordingRenderer {
    textures: usize,
    /// Last mesh shown per tile: (lod step, vertex count, texture id).
    meshes: HashMap<TileCoord, (usize, usize, usize)>,
    mesh_calls: usize,
    shown: HashSet<TileCoord>,
    released: Vec<TileCoord>,
}

impl TerrainRenderer for RecordingRenderer {
    type Texture = usize;

    fn display_texture(&mut self, source: TextureSource<'_>) -> usize {
        assert!(matches!(source, TextureSource::Colors(_)));
        self.textures += 1;
        self.textures
    }

    fn display_mesh(&mut self, coord: TileCoord, mesh: &MeshGeometry, texture: &usize) {
        self.mesh_calls += 1;
        self.meshes.insert(coord, (mesh.lod_step(), mesh.vertex_count(), *texture));
    }

    fn set_visible(&mut self, coord: TileCoord, visible: bool) {
        if visible {
            assert!(self.shown.insert(coord), "{coord:?} shown twice");
        } else {
            assert!(self.shown.remove(&coord), "{coord:?} hidden while not shown");
        }
    }

    fn release_tile(&mut self, coord: TileCoord) {
        assert!(!self.shown.contains(&coord), "{coord:?} released while shown");
        self.meshes.remove(&coord);
        self.released.push(coord);
    }
}

fn streamer(config: StreamerConfig) -> ChunkStreamer<RecordingRenderer> {
    let generator = Arc::new(TileGenerator::new(TerrainSettings::test()).unwrap());
    ChunkStreamer::new(generator, config, RecordingRenderer::default()).unwrap()
}

/// Everything the streamer believes must match the renderer.
fn assert_consistent(s: &ChunkStreamer<RecordingRenderer>) {
    let visible: HashSet<TileCoord> = s.visible_tiles().iter().copied().collect();
    assert_eq!(visible.len(), s.visible_tiles().len(), "duplicate in visible list");
    assert_eq!(visible, s.renderer().shown);

    let max = s.lod_table().max_view_distance();
    let size = s.generator().tile_world_size();
    for tile in s.tiles() {
        assert_eq!(tile.is_visible(), visible.contains(&tile.coord()));
        if tile.is_visible() {
            assert!(tile.coord().distance_to_bounds(s.viewer(), size) <= max);
        }
    }
}

/// Test: Settled state after the first update.
#[test]
fn test_initial_fill() {
    let mut s = streamer(StreamerConfig::test());
    s.update(Vec2::ZERO).unwrap();

    // radius ceil(64 / 32) = 2
    assert_eq!(s.tile_count(), 25);
    assert_eq!(s.stats().data_jobs, 25);
    assert!(s.flush(WAIT).unwrap());
    assert_consistent(&s);

    for coord in s.visible_tiles() {
        let tile = s.tile(*coord).unwrap();
        let lod = tile.desired_lod().unwrap();
        assert_eq!(tile.state(), TileState::MeshReady(lod));

        let step = s.lod_table().get(lod).unwrap().step;
        let (shown_step, vertices, texture) = s.renderer().meshes[coord];
        assert_eq!(shown_step, step);
        assert_eq!(vertices, (32 / step + 1) * (32 / step + 1));
        assert_eq!(Some(&texture), tile.texture());
    }

    // The tile under the viewer gets full detail.
    assert_eq!(s.tile(TileCoord::ORIGIN).unwrap().active_lod(), Some(0));
    // Corner tiles at distance sqrt(2) * 48 are out of range.
    assert!(!s.tile(TileCoord::new(2, 2)).unwrap().is_visible());
}

/// Test: Standing still never duplicates tiles or jobs.
#[test]
fn test_no_duplicate_tiles() {
    let mut s = streamer(StreamerConfig::test());
    s.update(Vec2::ZERO).unwrap();
    for _ in 0..20 {
        s.recompute_visible().unwrap();
        s.update(Vec2::new(0.5, -0.5)).unwrap();
    }
    assert!(s.flush(WAIT).unwrap());

    assert_eq!(s.tile_count(), 25);
    assert_eq!(s.stats().tiles_created, 25);
    assert_eq!(s.stats().data_jobs, 25);
    assert_eq!(s.renderer().textures, 25);
    // One mesh per visible tile; nothing was swapped.
    assert_eq!(s.renderer().mesh_calls, 21);
    assert_consistent(&s);
}

/// Test: Walk east, then come back.
#[test]
fn test_walk_keeps_visibility_consistent() {
    let mut s = streamer(StreamerConfig::test());

    let mut x = 0.0f32;
    for step in 0..200 {
        x += 2.0;
        s.update(Vec2::new(x, x * 0.25)).unwrap();
        if step % 10 == 0 {
            assert!(s.flush(WAIT).unwrap());
            assert_consistent(&s);
        }
    }
    for _ in 0..200 {
        x -= 2.0;
        s.update(Vec2::new(x, x * 0.25)).unwrap();
    }
    assert!(s.flush(WAIT).unwrap());
    assert_consistent(&s);

    // Back home: same tiles as the initial fill are shown, all meshes cached.
    let origin = s.tile(TileCoord::ORIGIN).unwrap();
    assert_eq!(origin.state(), TileState::MeshReady(0));
    assert_eq!(s.stats().tiles_evicted, 0);
    assert!(s.tile_count() > 25, "tiles are hidden, never freed, without a retain limit");

    // Every shown tile displays the LOD it wants.
    for coord in s.visible_tiles() {
        let tile = s.tile(*coord).unwrap();
        assert_eq!(tile.active_lod(), tile.desired_lod());
    }
}

/// Test: Teleport far away and back.
#[test]
fn test_teleport() {
    let mut s = streamer(StreamerConfig::test());
    for point in [
        Vec2::ZERO,
        Vec2::new(5_000.0, 0.0),
        Vec2::new(-3_200.0, 960.0),
        Vec2::ZERO,
    ] {
        s.update(point).unwrap();
        assert!(s.flush(WAIT).unwrap());
        assert_consistent(&s);

        let here = TileCoord::from_world(point, s.generator().tile_world_size());
        assert_eq!(s.tile(here).unwrap().state(), TileState::MeshReady(0));
    }
    assert_eq!(s.visible_tiles().len(), 21);
}

/// Test: A retain limit frees hidden tiles, farthest first.
#[test]
fn test_retain_limit_evicts_hidden_tiles() {
    let config = StreamerConfig {
        retain_limit: Some(40),
        ..StreamerConfig::test()
    };
    let mut s = streamer(config);

    let mut x = 0.0f32;
    for _ in 0..100 {
        x += 8.0;
        s.update(Vec2::new(x, 0.0)).unwrap();
        assert!(s.flush(WAIT).unwrap());
        assert_consistent(&s);
        assert!(s.tile_count() <= 40, "{} tiles tracked", s.tile_count());
    }

    assert!(s.stats().tiles_evicted > 0);
    assert_eq!(s.renderer().released.len() as u64, s.stats().tiles_evicted);

    // Walking back re-creates what was freed.
    let created = s.stats().tiles_created;
    s.update(Vec2::ZERO).unwrap();
    assert!(s.flush(WAIT).unwrap());
    assert!(s.stats().tiles_created > created);
    assert_eq!(s.tile(TileCoord::ORIGIN).unwrap().state(), TileState::MeshReady(0));
}

/// Test: A retain limit below the candidate square never churns a still viewer.
#[test]
fn test_retain_limit_spares_candidate_tiles() {
    let config = StreamerConfig {
        retain_limit: Some(22),
        ..StreamerConfig::test()
    };
    let mut s = streamer(config);
    s.update(Vec2::ZERO).unwrap();
    assert!(s.flush(WAIT).unwrap());

    // The 5x5 square holds 4 hidden corners, but all of it stays tracked.
    for _ in 0..10 {
        s.recompute_visible().unwrap();
        assert!(s.flush(WAIT).unwrap());
    }
    assert_eq!(s.stats().data_jobs, 25);
    assert_eq!(s.stats().tiles_evicted, 0);
    assert_eq!(s.tile_count(), 25);
    assert!(s.renderer().released.is_empty());
    assert_consistent(&s);

    // Five tiles east the old square shares nothing with the new one.
    let east = 5.0 * s.generator().tile_world_size();
    s.update(Vec2::new(east, 0.0)).unwrap();
    assert!(s.flush(WAIT).unwrap());
    assert_eq!(s.stats().tiles_evicted, 25);
    assert_eq!(s.tile_count(), 25);
    assert!(s.tile(TileCoord::ORIGIN).is_none());
    assert_consistent(&s);
}
