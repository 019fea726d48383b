use thiserror::Error;

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding a mesh buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: need {needed} bytes, have {available}")]
    OutOfRange { needed: usize, available: usize },

    #[error("vertex count {count} does not fit in addressable memory")]
    VertexCountOverflow { count: u32 },

    #[error("index section length {len} is not a multiple of 4 bytes")]
    TrailingBytes { len: usize },

    #[error("index count {count} is not a multiple of 3")]
    IndexCount { count: usize },

    #[error("index {index} at position {position} out of range for {vertex_count} vertices")]
    IndexOutOfBounds {
        position: usize,
        index: u32,
        vertex_count: u32,
    },
}
