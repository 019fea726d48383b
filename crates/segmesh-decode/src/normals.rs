//! Per-vertex normal estimation.

use glam::Vec3;

/// Accumulate unit face normals into per-vertex normals.
///
/// For each triangle `(i0, i1, i2)` the face normal is
/// `normalize((v1 - v0) × (v2 - v1))`, added to the slot of all three
/// vertices. The sums are left unnormalized; renormalizing is up to the
/// renderer. Degenerate triangles contribute a zero vector.
///
/// # Arguments
///
/// * `positions` - Flat `[x, y, z, ...]` vertex positions
/// * `indices` - Triangle list; every index must address a vertex in `positions`
///
/// # Returns
///
/// A flat normal array with the same length as `positions`.
#[must_use]
pub fn accumulate_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex = |i: u32| {
        let base = i as usize * 3;
        Vec3::from_slice(&positions[base..base + 3])
    };

    let mut normals = vec![0.0f32; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let (v0, v1, v2) = (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2]));
        let face = (v1 - v0).cross(v2 - v1).normalize_or_zero();

        for &index in triangle {
            let base = index as usize * 3;
            normals[base] += face.x;
            normals[base + 1] += face.y;
            normals[base + 2] += face.z;
        }
    }
    normals
}
