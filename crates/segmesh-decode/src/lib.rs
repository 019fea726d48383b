//! Decode precomputed segmentation meshes into renderable buffers.
//!
//! This crate provides pure synchronous decoding functions for the compact
//! binary mesh format used to stream segmented-brain surfaces. All functions
//! are designed to be called from any threading context - the library user
//! controls parallelism.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **User-controlled parallelism**: Client decides how to parallelize
//! - **Defensive**: Every read is bounds-checked against the buffer
//!
//! # Key functions
//!
//! - [`decode`]: Decode positions and indices, estimate normals, fill colors
//! - [`encode`]: Write positions and indices in the same wire format
//! - [`accumulate_normals`]: Sum unit face normals into per-vertex slots
//! - [`resolve_color`]: Map a mesh identifier to a region color

mod error;

pub mod color;
pub mod normals;
pub mod precomputed;

use serde::{Deserialize, Serialize};

pub use color::{FALLBACK_COLOR, Region, RegionRef, RegionTable, Rgb, region_id, resolve_color};
pub use error::{DecodeError, DecodeResult};
pub use normals::accumulate_normals;
pub use precomputed::{DEFAULT_VERTEX_OFFSET, decode, encode};

/// Decoded mesh buffers, ready to hand to a renderer.
///
/// All per-vertex arrays are flat `[x, y, z, x, y, z, ...]` layouts with
/// `3 * num_vertices` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedMesh {
    pub vertex_positions: Vec<f32>,
    pub indices: Vec<u32>,
    /// Accumulated unit face normals. Not renormalized.
    pub vertex_normals: Vec<f32>,
    /// Per-vertex RGB in `[0, 1]`.
    pub color: Vec<f32>,
    pub num_vertices: u32,
}

impl DecodedMesh {
    /// Number of triangles in the index buffer.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of the vertex positions, or `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<(glam::Vec3, glam::Vec3)> {
        let mut points = self
            .vertex_positions
            .chunks_exact(3)
            .map(glam::Vec3::from_slice);
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}
