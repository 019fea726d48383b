//! Worker threads and the handle that talks to them.
//!
//! Each worker runs on its own OS thread with its own single-threaded tokio
//! runtime, client, region table and cache. Workers pull from one shared
//! request queue; a pump thread routes their responses back into the
//! [`RpcChannel`]'s pending table.

use std::path::Path;
use std::thread::{self, JoinHandle};

use segmesh_decode::DecodedMesh;
use serde_json::json;

use crate::cache::{Cache, NoCache};
use crate::channel::RpcChannel;
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::rpc::{MeshType, Method};
use crate::worker::Worker;

/// Handle to a running pool of decode workers.
pub struct WorkerHandle {
    channel: RpcChannel,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn `config.workers` workers without caches.
    pub fn spawn(config: &WorkerConfig) -> Result<Self> {
        Self::spawn_with_cache(config, || NoCache)
    }

    /// Spawn workers, giving each its own cache from `make_cache`.
    pub fn spawn_with_cache<C, F>(config: &WorkerConfig, make_cache: F) -> Result<Self>
    where
        C: Cache + 'static,
        F: Fn() -> C,
    {
        let (request_tx, request_rx) = async_channel::unbounded();
        let (response_tx, response_rx) = async_channel::unbounded();
        let channel = RpcChannel::new(request_tx).with_timeout(config.request_timeout);

        let mut threads = Vec::with_capacity(config.workers.max(1) + 1);
        for index in 0..config.workers.max(1) {
            let started = Worker::new(&config.client, make_cache()).and_then(|worker| {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                Ok((worker, runtime))
            });
            let (worker, runtime) = match started {
                Ok(started) => started,
                Err(e) => {
                    shutdown(&channel, threads);
                    return Err(e);
                }
            };
            let requests = request_rx.clone();
            let responses = response_tx.clone();

            let thread = thread::Builder::new()
                .name(format!("segmesh-worker-{index}"))
                .spawn(move || {
                    tracing::debug!("Worker {index} started");
                    runtime.block_on(worker.serve(requests, responses));
                    tracing::debug!("Worker {index} stopped");
                });
            match thread {
                Ok(thread) => threads.push(thread),
                Err(e) => {
                    shutdown(&channel, threads);
                    return Err(e.into());
                }
            }
        }
        drop(response_tx);

        let pump_channel = channel.clone();
        let pump = thread::Builder::new()
            .name("segmesh-rpc-pump".to_owned())
            .spawn(move || {
                while let Ok(message) = response_rx.recv_blocking() {
                    if let Err(e) = pump_channel.handle_message(message) {
                        tracing::warn!("Dropped worker message: {e}");
                    }
                }
                pump_channel.fail_pending();
            });
        match pump {
            Ok(pump) => threads.push(pump),
            Err(e) => {
                shutdown(&channel, threads);
                return Err(e.into());
            }
        }

        tracing::info!("Started {} decode worker(s)", config.workers.max(1));
        Ok(Self { channel, threads })
    }

    #[must_use]
    pub fn channel(&self) -> &RpcChannel {
        &self.channel
    }

    /// Load and decode a mesh by URL on a worker.
    pub async fn load_by_url(&self, url: &str, mesh_type: MeshType) -> Result<DecodedMesh> {
        self.channel
            .send(Method::LoadByUrl, json!({ "url": url, "meshType": mesh_type }))
            .await
    }

    /// Load and decode a mesh from a local file on a worker.
    pub async fn load_by_file(&self, path: &Path, mesh_type: MeshType) -> Result<DecodedMesh> {
        self.channel
            .send(Method::LoadByFile, json!({ "path": path, "meshType": mesh_type }))
            .await
    }

    /// Let workers finish queued requests, then stop all threads. Requests
    /// still pending afterwards fail with [`crate::Error::ChannelClosed`].
    pub fn shutdown(mut self) {
        shutdown(&self.channel, std::mem::take(&mut self.threads));
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        shutdown(&self.channel, std::mem::take(&mut self.threads));
    }
}

fn shutdown(channel: &RpcChannel, threads: Vec<JoinHandle<()>>) {
    channel.close_requests();
    for thread in threads {
        if thread.join().is_err() {
            tracing::error!("Worker thread panicked");
        }
    }
    channel.fail_pending();
}
