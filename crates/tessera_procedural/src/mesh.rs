//! # Tile Meshing
//!
//! Converts a bordered height field into a decimated triangle mesh with
//! baked normals.
//!
//! ## Border Ring
//!
//! ```text
//!   b b b b b b      b = border vertex (normals only, never emitted)
//!   b i i i i b      i = interior vertex (emitted, UV in [0,1]^2)
//!   b i i i i b
//!   b i i i i b
//!   b b b b b b
//! ```
//!
//! Every triangle touching an interior vertex contributes to its normal,
//! including the ones reaching into the border ring. Two neighbouring tiles
//! therefore see the same triangles around their shared edge and shade it
//! identically, without talking to each other at build time.
//!
//! The ring sits `min(lod_step, border)` cells outside the interior. With a
//! border at least as wide as the coarsest LOD step the edge geometry is the
//! same on both sides at every LOD.

use bytemuck::{Pod, Zeroable};

use crate::curve::HeightCurve;
use crate::error::{TerrainError, TerrainResult};
use crate::field::HeightField;
use crate::math::{Vec2, Vec3};

/// Address of a vertex in one of the two pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexIndex {
    /// Emitted vertex.
    Interior(u32),
    /// Normal-only vertex outside the tile.
    Border(u32),
}

impl VertexIndex {
    /// The interior index, if this is an interior vertex.
    #[inline]
    #[must_use]
    pub const fn interior(self) -> Option<u32> {
        match self {
            Self::Interior(i) => Some(i),
            Self::Border(_) => None,
        }
    }
}

/// Interleaved vertex for upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    /// Position in tile space [x, y, z]
    pub position: [f32; 3],
    /// Normal direction [nx, ny, nz]
    pub normal: [f32; 3],
    /// UV coordinates [u, v]
    pub uv: [f32; 2],
}

/// A finished tile mesh: only interior vertices and triangles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGeometry {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    normals: Vec<Vec3>,
    /// Flat triangle list, three indices per triangle.
    indices: Vec<u32>,
    lod_step: usize,
}

impl MeshGeometry {
    /// Vertex positions.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Texture coordinates, parallel to `positions`.
    #[must_use]
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Baked unit normals, parallel to `positions`.
    #[must_use]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Flat index list (length is a multiple of 3).
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Decimation stride this mesh was built with.
    #[must_use]
    pub const fn lod_step(&self) -> usize {
        self.lod_step
    }

    /// Check if mesh is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleaved vertex buffer.
    #[must_use]
    pub fn interleaved(&self) -> Vec<TerrainVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((p, n), uv)| TerrainVertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }

    /// Index buffer as bytes (u32 little/native endian).
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Accumulates both vertex pools while the grid is walked.
struct MeshData {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    border_vertices: Vec<Vec3>,
    border_triangles: Vec<[VertexIndex; 3]>,
}

impl MeshData {
    fn new(vertices_per_line: usize) -> Self {
        let quads = (vertices_per_line - 1) * (vertices_per_line - 1);
        Self {
            vertices: vec![Vec3::ZERO; vertices_per_line * vertices_per_line],
            uvs: vec![Vec2::ZERO; vertices_per_line * vertices_per_line],
            triangles: Vec::with_capacity(quads * 6),
            border_vertices: vec![Vec3::ZERO; vertices_per_line * 4 + 4],
            border_triangles: Vec::with_capacity(vertices_per_line * 8 + 8),
        }
    }

    fn add_vertex(&mut self, position: Vec3, uv: Vec2, index: VertexIndex) {
        match index {
            VertexIndex::Interior(i) => {
                self.vertices[i as usize] = position;
                self.uvs[i as usize] = uv;
            }
            VertexIndex::Border(i) => self.border_vertices[i as usize] = position,
        }
    }

    fn add_triangle(&mut self, a: VertexIndex, b: VertexIndex, c: VertexIndex) {
        match (a, b, c) {
            (VertexIndex::Interior(a), VertexIndex::Interior(b), VertexIndex::Interior(c)) => {
                self.triangles.extend_from_slice(&[a, b, c]);
            }
            // A triangle made only of border vertices can't bias any emitted normal.
            (VertexIndex::Border(_), VertexIndex::Border(_), VertexIndex::Border(_)) => {}
            _ => self.border_triangles.push([a, b, c]),
        }
    }

    fn position(&self, index: VertexIndex) -> Vec3 {
        match index {
            VertexIndex::Interior(i) => self.vertices[i as usize],
            VertexIndex::Border(i) => self.border_vertices[i as usize],
        }
    }

    /// Area-weighted face normal (not normalized).
    fn surface_normal(&self, a: VertexIndex, b: VertexIndex, c: VertexIndex) -> Vec3 {
        let pa = self.position(a);
        let side_ab = self.position(b) - pa;
        let side_ac = self.position(c) - pa;
        side_ab.cross(side_ac)
    }

    fn calculate_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.triangles.chunks_exact(3) {
            let face = self.surface_normal(
                VertexIndex::Interior(tri[0]),
                VertexIndex::Interior(tri[1]),
                VertexIndex::Interior(tri[2]),
            );
            for &i in tri {
                normals[i as usize] += face;
            }
        }

        for &[a, b, c] in &self.border_triangles {
            let face = self.surface_normal(a, b, c);
            for vertex in [a, b, c] {
                if let Some(i) = vertex.interior() {
                    normals[i as usize] += face;
                }
            }
        }

        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }
        normals
    }

    fn into_geometry(self, lod_step: usize) -> MeshGeometry {
        let normals = self.calculate_normals();
        MeshGeometry {
            positions: self.vertices,
            uvs: self.uvs,
            normals,
            indices: self.triangles,
            lod_step,
        }
    }
}

/// Builds tile meshes from height fields.
pub struct MeshBuilder;

impl MeshBuilder {
    /// Checks that `lod_step` can decimate an interior of `interior_size` vertices.
    ///
    /// # Errors
    ///
    /// [`TerrainError::InvalidTileSize`] below two vertices per side,
    /// [`TerrainError::LodStepMismatch`] if the step is zero or does not
    /// divide `interior_size - 1`.
    pub fn check_lod_step(interior_size: usize, lod_step: usize) -> TerrainResult<()> {
        if interior_size < 2 {
            return Err(TerrainError::InvalidTileSize(interior_size));
        }
        if lod_step == 0 || (interior_size - 1) % lod_step != 0 {
            return Err(TerrainError::LodStepMismatch {
                step: lod_step,
                interior_size,
            });
        }
        Ok(())
    }

    /// Vertices per side of the emitted mesh.
    #[must_use]
    pub const fn vertices_per_line(interior_size: usize, lod_step: usize) -> usize {
        (interior_size - 1) / lod_step + 1
    }

    /// Builds the mesh for one LOD.
    ///
    /// Vertex height is `curve(h) * height_multiplier`. The tile is centred on
    /// the origin in x/z; row 0 of the field is the +z edge.
    ///
    /// # Errors
    ///
    /// See [`MeshBuilder::check_lod_step`].
    pub fn build(
        heights: &HeightField,
        height_multiplier: f32,
        curve: &HeightCurve,
        lod_step: usize,
    ) -> TerrainResult<MeshGeometry> {
        let interior = heights.interior_size();
        Self::check_lod_step(interior, lod_step)?;

        let border = heights.border();
        let ring = lod_step.min(border) as isize;
        let per_line = Self::vertices_per_line(interior, lod_step);
        let last = (interior - 1) as isize;

        // Interior-relative sample positions along one axis, ring included.
        let mut axis: Vec<isize> = Vec::with_capacity(per_line + 2);
        if ring > 0 {
            axis.push(-ring);
        }
        axis.extend((0..per_line).map(|k| (k * lod_step) as isize));
        if ring > 0 {
            axis.push(last + ring);
        }
        let line = axis.len();
        let is_ring = |i: usize| ring > 0 && (i == 0 || i == line - 1);

        let mut index_map = Vec::with_capacity(line * line);
        let mut next_interior = 0u32;
        let mut next_border = 0u32;
        for yi in 0..line {
            for xi in 0..line {
                if is_ring(xi) || is_ring(yi) {
                    index_map.push(VertexIndex::Border(next_border));
                    next_border += 1;
                } else {
                    index_map.push(VertexIndex::Interior(next_interior));
                    next_interior += 1;
                }
            }
        }

        let mut mesh = MeshData::new(per_line);
        let half = last as f32 / 2.0;
        let span = last as f32;

        for (yi, &ly) in axis.iter().enumerate() {
            for (xi, &lx) in axis.iter().enumerate() {
                let fx = (border as isize + lx) as usize;
                let fy = (border as isize + ly) as usize;
                let height = curve.evaluate(heights.get(fx, fy)) * height_multiplier;

                let position = Vec3::new(lx as f32 - half, height, half - ly as f32);
                let uv = Vec2::new(lx as f32 / span, ly as f32 / span);
                mesh.add_vertex(position, uv, index_map[yi * line + xi]);

                if xi + 1 < line && yi + 1 < line {
                    let a = index_map[yi * line + xi];
                    let b = index_map[yi * line + xi + 1];
                    let c = index_map[(yi + 1) * line + xi];
                    let d = index_map[(yi + 1) * line + xi + 1];
                    mesh.add_triangle(a, d, c);
                    mesh.add_triangle(d, a, b);
                }
            }
        }

        Ok(mesh.into_geometry(lod_step))
    }
}
