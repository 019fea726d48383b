//! The host side of the RPC channel.
//!
//! [`RpcChannel::send`] registers a pending operation under a fresh id and
//! queues a request; [`RpcChannel::handle_message`] completes the matching
//! operation when its response arrives. Completion depends only on the id,
//! never on arrival order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_channel::Sender;
use segmesh_decode::DecodedMesh;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::rpc::{Message, Request, Response};

type Completion = oneshot::Sender<Result<DecodedMesh>>;

/// Pending operations keyed by request id.
#[derive(Default)]
struct PendingTable {
    entries: Mutex<HashMap<String, Completion>>,
}

impl PendingTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Completion>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a completion under an id not currently in use.
    fn register(&self, completion: Completion) -> String {
        let mut entries = self.lock();
        loop {
            let id = Uuid::new_v4().simple().to_string();
            if let Entry::Vacant(slot) = entries.entry(id.clone()) {
                slot.insert(completion);
                return id;
            }
        }
    }

    fn take(&self, id: &str) -> Option<Completion> {
        self.lock().remove(id)
    }

    fn drain(&self) -> Vec<Completion> {
        self.lock().drain().map(|(_, completion)| completion).collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Requester end of a worker channel. Cheap to clone; clones share the
/// pending table.
#[derive(Clone)]
pub struct RpcChannel {
    requests: Sender<Message>,
    pending: Arc<PendingTable>,
    timeout: Option<Duration>,
}

impl RpcChannel {
    /// Create a channel that queues requests on `requests`. Responses must be
    /// fed back through [`RpcChannel::handle_message`].
    #[must_use]
    pub fn new(requests: Sender<Message>) -> Self {
        Self {
            requests,
            pending: Arc::default(),
            timeout: None,
        }
    }

    /// Fail requests that see no response within `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Send a request and wait for its response.
    ///
    /// `method` is usually a [`crate::rpc::Method`], but any JSON value is
    /// passed through so the worker can reject it.
    pub async fn send(&self, method: impl Into<Value>, params: Value) -> Result<DecodedMesh> {
        let (completion, outcome) = oneshot::channel();
        let id = self.pending.register(completion);
        let request = Request::new(id.clone(), method, params);
        tracing::debug!("Sending request {id}: {}", request.method_label());

        if self.requests.send(Message::Request(request)).await.is_err() {
            self.pending.take(&id);
            return Err(Error::ChannelClosed);
        }

        let outcome = match self.timeout {
            Some(timeout) => {
                if let Ok(outcome) = tokio::time::timeout(timeout, outcome).await {
                    outcome
                } else {
                    self.pending.take(&id);
                    tracing::warn!("Request {id} timed out after {timeout:?}");
                    return Err(Error::Timeout { id });
                }
            }
            None => outcome.await,
        };
        outcome.unwrap_or(Err(Error::ChannelClosed))
    }

    /// Route an incoming message. Only responses are acted upon; anything
    /// else is ignored.
    pub fn handle_message(&self, message: Message) -> Result<()> {
        match message {
            Message::Response(response) => self.handle_response(response),
            Message::Request(request) => {
                tracing::debug!("Ignoring request {} sent to host", request.id);
                Ok(())
            }
            Message::Foreign(_) => Ok(()),
        }
    }

    /// Complete the pending operation matching `response`.
    ///
    /// A response without a pending entry is a protocol violation. It is
    /// reported and dropped; other pending operations are unaffected.
    pub fn handle_response(&self, response: Response) -> Result<()> {
        let Some(completion) = self.pending.take(&response.id) else {
            tracing::warn!("Received response for unknown request {}", response.id);
            return Err(Error::ProtocolViolation { id: response.id });
        };
        if completion.send(response.into_result()).is_err() {
            tracing::debug!("Caller stopped waiting for a response");
        }
        Ok(())
    }

    /// Stop accepting requests and fail everything still pending with
    /// [`Error::ChannelClosed`].
    pub fn close(&self) {
        self.requests.close();
        self.fail_pending();
    }

    pub(crate) fn close_requests(&self) {
        self.requests.close();
    }

    pub(crate) fn fail_pending(&self) {
        for completion in self.pending.drain() {
            let _ = completion.send(Err(Error::ChannelClosed));
        }
    }
}

#[cfg(test)]
mod tests {
    use async_channel::Receiver;
    use serde_json::json;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::rpc::{Method, RpcError};

    fn mesh_with_vertices(num_vertices: u32) -> DecodedMesh {
        DecodedMesh {
            num_vertices,
            ..DecodedMesh::default()
        }
    }

    async fn next_request(rx: &Receiver<Message>) -> Request {
        match rx.recv().await.unwrap() {
            Message::Request(request) => request,
            other => panic!("expected request, got {other:?}"),
        }
    }

    fn spawn_load(channel: &RpcChannel, url: &str) -> JoinHandle<Result<DecodedMesh>> {
        let channel = channel.clone();
        let params = json!({ "url": url, "meshType": "NG_PRECOMP" });
        tokio::spawn(async move { channel.send(Method::LoadByUrl, params).await })
    }

    #[tokio::test]
    async fn reversed_responses_reach_their_callers() {
        let (tx, rx) = async_channel::unbounded();
        let channel = RpcChannel::new(tx);

        let first = spawn_load(&channel, "mesh/1");
        let first_request = next_request(&rx).await;
        let second = spawn_load(&channel, "mesh/2");
        let second_request = next_request(&rx).await;
        assert_ne!(first_request.id, second_request.id);
        assert_eq!(channel.pending_len(), 2);

        channel
            .handle_message(Message::Response(Response::success(
                second_request.id,
                mesh_with_vertices(2),
            )))
            .unwrap();
        channel
            .handle_message(Message::Response(Response::success(
                first_request.id,
                mesh_with_vertices(1),
            )))
            .unwrap();

        assert_eq!(first.await.unwrap().unwrap().num_vertices, 1);
        assert_eq!(second.await.unwrap().unwrap().num_vertices, 2);
        assert_eq!(channel.pending_len(), 0);
    }

    #[tokio::test]
    async fn unknown_response_leaves_pending_untouched() {
        let (tx, rx) = async_channel::unbounded();
        let channel = RpcChannel::new(tx);

        let load = spawn_load(&channel, "mesh/3");
        let request = next_request(&rx).await;

        let stray = Response::success("not-a-real-id", mesh_with_vertices(9));
        assert!(matches!(
            channel.handle_message(Message::Response(stray)),
            Err(Error::ProtocolViolation { ref id }) if id == "not-a-real-id"
        ));
        assert_eq!(channel.pending_len(), 1);

        channel
            .handle_message(Message::Response(Response::success(
                request.id,
                mesh_with_vertices(3),
            )))
            .unwrap();
        assert_eq!(load.await.unwrap().unwrap().num_vertices, 3);
    }

    #[tokio::test]
    async fn duplicate_response_is_a_violation() {
        let (tx, rx) = async_channel::unbounded();
        let channel = RpcChannel::new(tx);

        let load = spawn_load(&channel, "mesh/4");
        let request = next_request(&rx).await;
        let response = Response::success(request.id, mesh_with_vertices(4));

        channel.handle_response(response.clone()).unwrap();
        assert!(matches!(
            channel.handle_response(response),
            Err(Error::ProtocolViolation { .. })
        ));
        assert!(load.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn error_response_rejects_caller() {
        let (tx, rx) = async_channel::unbounded();
        let channel = RpcChannel::new(tx);

        let load = spawn_load(&channel, "mesh/5");
        let request = next_request(&rx).await;
        channel
            .handle_response(Response::failure(
                request.id,
                RpcError {
                    code: 502,
                    message: "failed to retrieve mesh/5".into(),
                },
            ))
            .unwrap();

        let err = load.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Remote { code: 502, .. }), "{err}");
    }

    #[tokio::test]
    async fn foreign_messages_are_ignored() {
        let (tx, _rx) = async_channel::unbounded();
        let channel = RpcChannel::new(tx);

        channel.handle_message(Message::Foreign(json!({ "progress": 0.5 }))).unwrap();
        channel
            .handle_message(Message::Request(Request::new("x", "FOO", json!({}))))
            .unwrap();
    }

    #[tokio::test]
    async fn close_fails_pending_operations() {
        let (tx, rx) = async_channel::unbounded();
        let channel = RpcChannel::new(tx);

        let load = spawn_load(&channel, "mesh/6");
        next_request(&rx).await;
        channel.close();

        assert!(matches!(load.await.unwrap(), Err(Error::ChannelClosed)));
        assert!(matches!(
            channel.send(Method::LoadByUrl, json!({})).await,
            Err(Error::ChannelClosed)
        ));
        assert_eq!(channel.pending_len(), 0);
    }

    #[tokio::test]
    async fn timeout_removes_pending_entry() {
        let (tx, rx) = async_channel::unbounded();
        let channel = RpcChannel::new(tx).with_timeout(Some(Duration::from_millis(20)));

        let err = channel
            .send(Method::LoadByUrl, json!({ "url": "mesh/7" }))
            .await
            .unwrap_err();
        let Error::Timeout { id } = err else {
            panic!("expected timeout, got {err}");
        };
        assert_eq!(channel.pending_len(), 0);

        // The late response no longer has anyone waiting for it.
        let request = next_request(&rx).await;
        assert_eq!(request.id, id);
        assert!(matches!(
            channel.handle_response(Response::success(id, mesh_with_vertices(7))),
            Err(Error::ProtocolViolation { .. })
        ));
    }
}
