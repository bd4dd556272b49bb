//! Single-tile preview.
//!
//! Generates the origin tile synchronously and shows one representation of
//! it. Used by tools that tweak settings and want to see the result
//! immediately, without a streamer.

use serde::{Deserialize, Serialize};
use tessera_procedural::{TileGenerator, Vec2};

use crate::error::StreamResult;
use crate::render::{TerrainRenderer, TextureSource};
use crate::tile::TileCoord;

/// What a preview shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawMode {
    /// Grayscale heights.
    NoiseMap,
    /// Classified region colors.
    #[default]
    ColorMap,
    /// Mesh textured with region colors.
    Mesh,
}

/// Draws the origin tile in `mode`. `lod_step` is only used by [`DrawMode::Mesh`].
///
/// # Errors
///
/// [`crate::StreamError::Terrain`] if generation fails or `lod_step` doesn't
/// fit the tile size.
pub fn draw_preview<R: TerrainRenderer>(
    generator: &TileGenerator,
    mode: DrawMode,
    lod_step: usize,
    renderer: &mut R,
) -> StreamResult<()> {
    let data = generator.generate_tile_data(Vec2::ZERO)?;

    match mode {
        DrawMode::NoiseMap => {
            renderer.display_texture(TextureSource::Heights(&data.heights));
        }
        DrawMode::ColorMap => {
            renderer.display_texture(TextureSource::Colors(&data.colors));
        }
        DrawMode::Mesh => {
            let mesh = generator.build_mesh(&data.heights, lod_step)?;
            let texture = renderer.display_texture(TextureSource::Colors(&data.colors));
            renderer.display_mesh(TileCoord::ORIGIN, &mesh, &texture);
        }
    }

    tracing::debug!(?mode, lod_step, "preview drawn");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_procedural::{ColorField, MeshGeometry, TerrainSettings};

    #[derive(Default)]
    struct Capture {
        textures: Vec<ColorField>,
        meshes: Vec<(TileCoord, usize, usize)>,
    }

    impl TerrainRenderer for Capture {
        type Texture = usize;

        fn display_texture(&mut self, source: TextureSource<'_>) -> usize {
            let field = match source {
                TextureSource::Colors(colors) => colors.clone(),
                TextureSource::Heights(heights) => ColorField::from_height_field(heights),
            };
            self.textures.push(field);
            self.textures.len() - 1
        }

        fn display_mesh(&mut self, coord: TileCoord, mesh: &MeshGeometry, texture: &usize) {
            self.meshes.push((coord, mesh.lod_step(), *texture));
        }

        fn set_visible(&mut self, _coord: TileCoord, _visible: bool) {}
    }

    fn generator() -> TileGenerator {
        TileGenerator::new(TerrainSettings::test()).unwrap()
    }

    #[test]
    fn test_noise_map_is_grayscale() {
        let mut capture = Capture::default();
        draw_preview(&generator(), DrawMode::NoiseMap, 1, &mut capture).unwrap();

        assert_eq!(capture.textures.len(), 1);
        assert!(capture.meshes.is_empty());
        assert!(capture.textures[0].texels().iter().all(|c| c.r == c.g && c.g == c.b));
    }

    #[test]
    fn test_color_map_matches_tile_colors() {
        let generator = generator();
        let mut capture = Capture::default();
        draw_preview(&generator, DrawMode::ColorMap, 1, &mut capture).unwrap();

        let data = generator.generate_tile_data(Vec2::ZERO).unwrap();
        assert_eq!(capture.textures, vec![data.colors]);
    }

    #[test]
    fn test_mesh_mode() {
        let mut capture = Capture::default();
        draw_preview(&generator(), DrawMode::Mesh, 4, &mut capture).unwrap();
        assert_eq!(capture.meshes, vec![(TileCoord::ORIGIN, 4, 0)]);

        assert!(draw_preview(&generator(), DrawMode::Mesh, 5, &mut capture).is_err());
    }
}
