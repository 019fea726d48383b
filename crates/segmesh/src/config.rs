//! Client and worker settings.

use std::time::Duration;

use segmesh_decode::{DEFAULT_VERTEX_OFFSET, RegionTable};

/// Settings for fetching and decoding meshes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `User-Agent` header sent with HTTP requests.
    pub user_agent: String,
    /// Per-request HTTP timeout. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    /// Byte offset of the first vertex position in mesh buffers.
    pub vertex_offset: usize,
    /// Region colors used for decoded meshes.
    pub regions: RegionTable,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("segmesh/", env!("CARGO_PKG_VERSION")).to_owned(),
            fetch_timeout: None,
            vertex_offset: DEFAULT_VERTEX_OFFSET,
            regions: RegionTable::builtin().clone(),
        }
    }
}

/// Settings for a pool of decode workers.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of worker threads. Values below 1 are treated as 1.
    pub workers: usize,
    /// How long `send` waits for a response. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Settings cloned into every worker.
    pub client: ClientConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            request_timeout: None,
            client: ClientConfig::default(),
        }
    }
}
