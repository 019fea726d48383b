//! Precomputed mesh decoding.
//!
//! # Format
//!
//! All values are little-endian:
//!
//! - Bytes 0-3: Vertex count `N` (u32)
//! - Next `12 * N` bytes: Vertex positions (3 × f32 each)
//! - Remaining bytes: Triangle indices (u32), three per triangle, read to end
//!   of buffer

use crate::DecodedMesh;
use crate::color::Rgb;
use crate::error::{DecodeError, DecodeResult};
use crate::normals::accumulate_normals;

/// Byte offset of the first vertex position in a standard buffer.
pub const DEFAULT_VERTEX_OFFSET: usize = 4;

const HEADER_LEN: usize = 4;
const VERTEX_STRIDE: usize = 12;
const INDEX_STRIDE: usize = 4;

/// Decode a precomputed mesh buffer.
///
/// The vertex count is always read from offset 0; positions start at
/// `vertex_offset` and indices follow immediately after them.
///
/// # Arguments
///
/// * `buffer` - Encoded mesh bytes
/// * `vertex_offset` - Byte offset of the first vertex position
/// * `color` - Region color repeated for every vertex
pub fn decode(buffer: &[u8], vertex_offset: usize, color: Rgb) -> DecodeResult<DecodedMesh> {
    let num_vertices = read_u32(buffer, 0)?;
    let vertex_bytes = usize::try_from(num_vertices)
        .ok()
        .and_then(|n| n.checked_mul(VERTEX_STRIDE))
        .ok_or(DecodeError::VertexCountOverflow {
            count: num_vertices,
        })?;
    let index_start = vertex_offset
        .checked_add(vertex_bytes)
        .ok_or(DecodeError::VertexCountOverflow {
            count: num_vertices,
        })?;

    let vertex_section = buffer
        .get(vertex_offset..index_start)
        .ok_or(DecodeError::OutOfRange {
            needed: index_start,
            available: buffer.len(),
        })?;
    let vertex_positions: Vec<f32> = vertex_section
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let index_section = &buffer[index_start..];
    if index_section.len() % INDEX_STRIDE != 0 {
        return Err(DecodeError::TrailingBytes {
            len: index_section.len(),
        });
    }
    let indices: Vec<u32> = index_section
        .chunks_exact(INDEX_STRIDE)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    if indices.len() % 3 != 0 {
        return Err(DecodeError::IndexCount {
            count: indices.len(),
        });
    }
    if let Some((position, &index)) = indices
        .iter()
        .enumerate()
        .find(|&(_, &index)| index >= num_vertices)
    {
        return Err(DecodeError::IndexOutOfBounds {
            position,
            index,
            vertex_count: num_vertices,
        });
    }

    let vertex_normals = accumulate_normals(&vertex_positions, &indices);
    let color = color.repeat_normalized(vertex_positions.len() / 3);

    Ok(DecodedMesh {
        vertex_positions,
        indices,
        vertex_normals,
        color,
        num_vertices,
    })
}

/// Encode positions and triangle indices into the precomputed wire format.
///
/// `positions` is a flat `[x, y, z, ...]` slice; any trailing partial vertex
/// is ignored.
#[must_use]
pub fn encode(positions: &[f32], indices: &[u32]) -> Vec<u8> {
    let num_vertices = positions.len() / 3;
    let mut out =
        Vec::with_capacity(HEADER_LEN + num_vertices * VERTEX_STRIDE + indices.len() * INDEX_STRIDE);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(num_vertices as u32).to_le_bytes());
    for value in &positions[..num_vertices * 3] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    for index in indices {
        out.extend_from_slice(&index.to_le_bytes());
    }
    out
}

fn read_u32(buffer: &[u8], offset: usize) -> DecodeResult<u32> {
    let end = offset + 4;
    let bytes = buffer.get(offset..end).ok_or(DecodeError::OutOfRange {
        needed: end,
        available: buffer.len(),
    })?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
