//! Fetch-and-decode pipeline.
//!
//! A [`Client`] retrieves raw mesh bytes from an HTTP(S) URL or a local path,
//! resolves the region color from the same identifier, and decodes the
//! buffer. Each call makes a single attempt; retries are up to the caller.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use segmesh_decode::{DecodedMesh, RegionTable};

use crate::cache::{Cache, NoCache};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Client for retrieving and decoding precomputed meshes.
pub struct Client<C = NoCache> {
    http: reqwest::Client,
    cache: C,
    regions: RegionTable,
    vertex_offset: usize,
}

impl Client<NoCache> {
    /// Create a client with default settings and no cache.
    pub fn new() -> Result<Self> {
        Self::with_cache(NoCache)
    }
}

impl<C: Cache> Client<C> {
    /// Create a client with default settings and the given cache.
    pub fn with_cache(cache: C) -> Result<Self> {
        Self::from_config(&ClientConfig::default(), cache)
    }

    /// Create a client from explicit settings.
    pub fn from_config(config: &ClientConfig, cache: C) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            cache,
            regions: config.regions.clone(),
            vertex_offset: config.vertex_offset,
        })
    }

    #[must_use]
    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Retrieve raw bytes from an HTTP(S) URL, a `file://` URL or a bare path.
    pub async fn fetch_bytes_from_url(&self, url: &str) -> Result<Bytes> {
        if let Some(bytes) = self.cache.get(url) {
            tracing::debug!("Cache hit for {url}");
            return Ok(bytes);
        }

        let bytes = match local_path(url) {
            Some(path) => tokio::fs::read(&path)
                .await
                .map(Bytes::from)
                .map_err(|e| Error::retrieval(url, e))?,
            None => self.fetch_remote(url).await?,
        };
        tracing::debug!("Retrieved {} bytes from {url}", bytes.len());

        self.cache.insert(url, bytes.clone());
        Ok(bytes)
    }

    async fn fetch_remote(&self, url: &str) -> Result<Bytes> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::retrieval(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::retrieval(url, format!("HTTP status {status}")));
        }

        response.bytes().await.map_err(|e| Error::retrieval(url, e))
    }

    /// Retrieve and decode the mesh at `url`, colored by the region its
    /// identifier names.
    pub async fn load_mesh_by_url(&self, url: &str) -> Result<DecodedMesh> {
        let bytes = self.fetch_bytes_from_url(url).await?;
        let color = self.regions.resolve(url);
        let mesh = segmesh_decode::decode(&bytes, self.vertex_offset, color)?;

        tracing::debug!(
            "Decoded {url}: {} vertices, {} triangles",
            mesh.num_vertices,
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Read and decode a mesh from the local filesystem.
    pub async fn load_mesh_by_path(&self, path: &Path) -> Result<DecodedMesh> {
        let identifier = path.to_string_lossy();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::retrieval(&identifier, e))?;
        let color = self.regions.resolve(&*identifier);
        Ok(segmesh_decode::decode(&bytes, self.vertex_offset, color)?)
    }
}

/// The filesystem path a URL refers to, if it is not a network URL.
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    (!url.contains("://")).then(|| PathBuf::from(url))
}
