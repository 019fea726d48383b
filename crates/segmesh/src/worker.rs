//! The isolated side of the RPC channel.
//!
//! A [`Worker`] owns its own [`Client`] (and with it its own region table
//! and cache) and answers one request at a time. Every failure becomes an
//! error envelope, so a worker survives any number of bad requests.

use async_channel::{Receiver, Sender};
use segmesh_decode::DecodedMesh;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::Cache;
use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::rpc::{
    LoadByFileParams, LoadByUrlParams, Message, MeshType, Method, Request, Response, RpcError,
};

/// Decode worker serving [`Method`]s.
pub struct Worker<C> {
    client: Client<C>,
}

impl<C: Cache> Worker<C> {
    pub fn new(config: &ClientConfig, cache: C) -> Result<Self> {
        Ok(Self {
            client: Client::from_config(config, cache)?,
        })
    }

    #[must_use]
    pub fn client(&self) -> &Client<C> {
        &self.client
    }

    /// Answer a single request.
    pub async fn handle(&self, request: Request) -> Response {
        let Some(method) = request.known_method() else {
            let error = Error::UnsupportedMethod {
                method: request.method_label(),
            };
            tracing::warn!("Request {}: {error}", request.id);
            return Response::failure(request.id, RpcError::from(&error));
        };

        tracing::debug!("Request {}: {method}", request.id);
        match self.dispatch(method, request.params).await {
            Ok(mesh) => Response::success(request.id, mesh),
            Err(error) => {
                tracing::warn!("Request {} ({method}) failed: {error}", request.id);
                Response::failure(request.id, RpcError::from(&error))
            }
        }
    }

    async fn dispatch(&self, method: Method, params: Value) -> Result<DecodedMesh> {
        match method {
            Method::LoadByUrl => {
                let LoadByUrlParams { url, mesh_type } = parse_params(params)?;
                ensure_decodable(mesh_type)?;
                self.client.load_mesh_by_url(&url).await
            }
            Method::LoadByFile => {
                let LoadByFileParams { path, mesh_type } = parse_params(params)?;
                ensure_decodable(mesh_type)?;
                self.client.load_mesh_by_path(&path).await
            }
        }
    }

    /// Serve requests until the request queue closes or nobody listens for
    /// responses any more.
    pub async fn serve(&self, requests: Receiver<Message>, responses: Sender<Message>) {
        while let Ok(message) = requests.recv().await {
            let request = match message {
                Message::Request(request) => request,
                Message::Response(response) => {
                    tracing::debug!("Ignoring response {} sent to worker", response.id);
                    continue;
                }
                Message::Foreign(_) => continue,
            };

            let response = self.handle(request).await;
            if responses.send(Message::Response(response)).await.is_err() {
                tracing::debug!("Response channel closed, stopping worker");
                break;
            }
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| Error::InvalidParams(e.to_string()))
}

fn ensure_decodable(mesh_type: MeshType) -> Result<()> {
    match mesh_type {
        MeshType::NgPrecomp => Ok(()),
        MeshType::Draco => Err(Error::UnsupportedMeshType {
            mesh_type: mesh_type.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::NoCache;

    fn worker() -> Worker<NoCache> {
        Worker::new(&ClientConfig::default(), NoCache).unwrap()
    }

    #[tokio::test]
    async fn unknown_method_is_client_error() {
        let response = worker().handle(Request::new("r1", "FOO", json!({}))).await;

        assert_eq!(response.id, "r1");
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, 400);
        assert!(error.message.contains("FOO"), "{}", error.message);
    }

    #[tokio::test]
    async fn unknown_numeric_method_is_named() {
        let response = worker().handle(Request::new("r2", 9, json!({}))).await;
        assert_eq!(response.error.unwrap().message, "method: 9 not yet implemented");
    }

    #[tokio::test]
    async fn draco_is_rejected_before_fetching() {
        let request = Request::new(
            "r3",
            Method::LoadByUrl,
            json!({ "url": "https://unreachable.invalid/mesh/1", "meshType": "DRACO" }),
        );
        let error = worker().handle(request).await.error.unwrap();

        assert_eq!(error.code, 400);
        assert_eq!(error.message, "DRACO meshes must be decoded outside the worker");
    }

    #[tokio::test]
    async fn missing_params_are_invalid() {
        let request = Request::new("r4", Method::LoadByUrl, json!({ "meshType": "NG_PRECOMP" }));
        let error = worker().handle(request).await.error.unwrap();

        assert_eq!(error.code, 400);
        assert!(error.message.contains("url"), "{}", error.message);
    }

    #[tokio::test]
    async fn serves_until_queue_closes() {
        let (request_tx, request_rx) = async_channel::unbounded();
        let (response_tx, response_rx) = async_channel::unbounded();

        request_tx.send(Message::Foreign(json!("hello"))).await.unwrap();
        request_tx
            .send(Message::Request(Request::new("a", "FOO", json!({}))))
            .await
            .unwrap();
        request_tx
            .send(Message::Request(Request::new("b", "BAR", json!({}))))
            .await
            .unwrap();
        request_tx.close();

        worker().serve(request_rx, response_tx).await;

        let ids: Vec<String> = std::iter::from_fn(|| response_rx.try_recv().ok())
            .map(|message| match message {
                Message::Response(response) => response.id,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
