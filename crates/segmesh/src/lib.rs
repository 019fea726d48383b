//! Async loading of segmentation meshes, on the calling task or on
//! background decode workers.
//!
//! # Key types
//!
//! - [`Client`]: Fetch mesh bytes by URL or path and decode them
//! - [`WorkerHandle`]: Pool of isolated decode workers behind an RPC channel
//! - [`RpcChannel`]: Correlates requests and responses by id
//! - [`LoadTracker`]: Load state with registration-ordered observers
//!
//! Decoding itself lives in [`segmesh_decode`], re-exported here.

mod error;

pub mod cache;
pub mod channel;
pub mod client;
pub mod config;
pub mod pool;
pub mod rpc;
pub mod state;
pub mod worker;

pub use cache::{Cache, MemoryCache, NoCache};
pub use channel::RpcChannel;
pub use client::Client;
pub use config::{ClientConfig, WorkerConfig};
pub use error::{Error, Result};
pub use pool::WorkerHandle;
pub use rpc::{Message, MeshType, Method, Request, Response, RpcError};
pub use segmesh_decode::{self as decode, DecodedMesh, RegionTable, Rgb};
pub use state::{LoadState, LoadTracker};
pub use worker::Worker;
