//! RPC envelopes exchanged with decode workers.
//!
//! Requests and responses carry a `"json.rpc"` tag and are correlated by an
//! opaque string id. Within the process, envelopes travel by value, so a
//! decoded mesh moves from worker to caller without copying its buffers.
//! [`Message::to_json`] and [`Message::from_json`] handle the wire shape when
//! an envelope has to leave the process.

use std::fmt;
use std::path::PathBuf;

use segmesh_decode::DecodedMesh;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Field that marks a message as an RPC envelope.
pub const PROTOCOL_TAG: &str = "json.rpc";

/// Value of the protocol tag.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Methods served by a worker.
///
/// On the wire a method is either its name or its numeric discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    LoadByUrl = 0,
    LoadByFile = 1,
}

impl Method {
    pub const ALL: [Method; 2] = [Method::LoadByUrl, Method::LoadByFile];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LoadByUrl => "LOAD_BY_URL",
            Self::LoadByFile => "LOAD_BY_FILE",
        }
    }

    /// Parse a method from its name or discriminant.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::ALL.into_iter().find(|method| match value {
            Value::String(name) => name == method.name(),
            Value::Number(code) => code.as_u64() == Some(*method as u64),
            _ => false,
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Method> for Value {
    fn from(method: Method) -> Self {
        Value::String(method.name().to_owned())
    }
}

/// Encodings a load request can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeshType {
    /// Precomputed vertex/index buffers, decoded by the worker.
    NgPrecomp,
    /// Draco-compressed meshes, decoded by an external library.
    Draco,
}

impl fmt::Display for MeshType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NgPrecomp => "NG_PRECOMP",
            Self::Draco => "DRACO",
        })
    }
}

/// Parameters of [`Method::LoadByUrl`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadByUrlParams {
    pub url: String,
    pub mesh_type: MeshType,
}

/// Parameters of [`Method::LoadByFile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadByFileParams {
    pub path: PathBuf,
    pub mesh_type: MeshType,
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl From<&Error> for RpcError {
    fn from(error: &Error) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// A request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "json.rpc")]
    pub version: String,
    pub id: String,
    /// Method name or discriminant, kept raw so unknown methods can be
    /// reported back verbatim.
    pub method: Value,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<String>, method: impl Into<Value>, params: Value) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_owned(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// The method, if this worker knows it.
    #[must_use]
    pub fn known_method(&self) -> Option<Method> {
        Method::from_value(&self.method)
    }

    /// The method as it should appear in messages: bare strings, other
    /// values in JSON notation.
    #[must_use]
    pub fn method_label(&self) -> String {
        match &self.method {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

/// A response envelope. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "json.rpc")]
    pub version: String,
    pub id: String,
    pub result: Option<DecodedMesh>,
    pub error: Option<RpcError>,
}

impl Response {
    #[must_use]
    pub fn success(id: impl Into<String>, mesh: DecodedMesh) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_owned(),
            id: id.into(),
            result: Some(mesh),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(id: impl Into<String>, error: RpcError) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_owned(),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Convert into the caller-facing outcome. An error takes precedence
    /// over a result.
    pub fn into_result(self) -> crate::Result<DecodedMesh> {
        match (self.result, self.error) {
            (_, Some(RpcError { code, message })) => Err(Error::Remote { code, message }),
            (Some(mesh), None) => Ok(mesh),
            (None, None) => Err(Error::Remote {
                code: 500,
                message: format!("response {} carries neither result nor error", self.id),
            }),
        }
    }
}

/// Anything that travels over a worker channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
    /// A message without the protocol tag. Both sides ignore these.
    Foreign(Value),
}

impl Message {
    /// Classify a JSON value by its protocol tag.
    ///
    /// Tagged objects with a `method` field are requests, other tagged
    /// objects are responses. Untagged values, and tagged values that do not
    /// parse, are [`Message::Foreign`].
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Foreign(value);
        };
        if !object.contains_key(PROTOCOL_TAG) {
            return Self::Foreign(value);
        }

        let parsed = if object.contains_key("method") {
            serde_json::from_value(value.clone()).map(Self::Request)
        } else {
            serde_json::from_value(value.clone()).map(Self::Response)
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed RPC envelope: {e}");
            Self::Foreign(value)
        })
    }

    /// Serialize to the wire shape.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            Self::Request(request) => serde_json::to_value(request),
            Self::Response(response) => serde_json::to_value(response),
            Self::Foreign(value) => Ok(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_methods_by_name_and_number() {
        assert_eq!(Method::from_value(&json!("LOAD_BY_URL")), Some(Method::LoadByUrl));
        assert_eq!(Method::from_value(&json!(1)), Some(Method::LoadByFile));
        assert_eq!(Method::from_value(&json!("FOO")), None);
        assert_eq!(Method::from_value(&json!(7)), None);
        assert_eq!(Method::from_value(&json!(null)), None);
    }

    #[test]
    fn labels_unknown_methods_verbatim() {
        assert_eq!(Request::new("a", "FOO", json!({})).method_label(), "FOO");
        assert_eq!(Request::new("a", 7, json!({})).method_label(), "7");
    }

    #[test]
    fn untagged_messages_are_foreign() {
        let value = json!({ "id": "1", "method": "LOAD_BY_URL" });
        assert_eq!(Message::from_json(value.clone()), Message::Foreign(value));
        assert_eq!(Message::from_json(json!("ping")), Message::Foreign(json!("ping")));
    }

    #[test]
    fn tagged_messages_parse_by_shape() {
        let request = Message::from_json(json!({
            "json.rpc": "2.0",
            "id": "abc",
            "method": 0,
            "params": { "url": "https://example.org/1", "meshType": "NG_PRECOMP" }
        }));
        let Message::Request(request) = request else {
            panic!("expected request, got {request:?}");
        };
        assert_eq!(request.known_method(), Some(Method::LoadByUrl));
        let params: LoadByUrlParams = serde_json::from_value(request.params).unwrap();
        assert_eq!(params.mesh_type, MeshType::NgPrecomp);

        let response = Message::from_json(json!({
            "json.rpc": "2.0",
            "id": "abc",
            "result": null,
            "error": { "code": 400, "message": "nope" }
        }));
        assert!(matches!(response, Message::Response(ref r) if r.id == "abc"));
    }

    #[test]
    fn malformed_tagged_message_is_foreign() {
        let value = json!({ "json.rpc": "2.0", "method": "LOAD_BY_URL" });
        assert_eq!(Message::from_json(value.clone()), Message::Foreign(value));
    }

    #[test]
    fn response_wire_shape() {
        let response = Response::failure(
            "abc",
            RpcError {
                code: 400,
                message: "method: FOO not yet implemented".into(),
            },
        );
        let json = Message::Response(response).to_json().unwrap();

        assert_eq!(
            json,
            json!({
                "json.rpc": "2.0",
                "id": "abc",
                "result": null,
                "error": { "code": 400, "message": "method: FOO not yet implemented" }
            })
        );
    }

    #[test]
    fn success_carries_camel_case_buffers() {
        let mesh = DecodedMesh {
            num_vertices: 0,
            ..DecodedMesh::default()
        };
        let json = Message::Response(Response::success("x", mesh)).to_json().unwrap();

        assert_eq!(json["result"]["numVertices"], json!(0));
        assert_eq!(json["result"]["vertexPositions"], json!([]));
        assert_eq!(json["error"], json!(null));
    }

    #[test]
    fn error_takes_precedence_over_result() {
        let mut response = Response::success("x", DecodedMesh::default());
        response.error = Some(RpcError {
            code: 502,
            message: "gone".into(),
        });

        assert!(matches!(
            response.into_result(),
            Err(Error::Remote { code: 502, .. })
        ));
    }
}
