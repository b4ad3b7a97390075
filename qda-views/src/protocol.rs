//! Server protocol boundary.
//!
//! The external language server exposes six request methods, each
//! returning an envelope `{ success, error?, <payload-key>: [...] }`.
//! Every method has a legacy alias from older server builds; callers try
//! the primary name first and fall back to the alias only on a
//! method-not-found failure. Decoding is an explicit parse-and-validate
//! step: a payload that does not match the documented shape is a
//! `DecodeError`, never silently defaulted.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// A server request method with its legacy alias and the envelope key
/// its payload lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Method {
    pub name: &'static str,
    pub legacy: &'static str,
    pub payload_key: &'static str,
}

pub const REFERENCES: Method = Method {
    name: "qda/references",
    legacy: "qda/listReferences",
    payload_key: "references",
};

pub const CODES: Method = Method {
    name: "qda/codes",
    legacy: "qda/listCodes",
    payload_key: "codes",
};

pub const RELATIONS: Method = Method {
    name: "qda/relations",
    legacy: "qda/listRelations",
    payload_key: "relations",
};

/// The graph method returns relation triplets for one reference; the
/// diagram itself is rendered client-side.
pub const RELATION_GRAPH: Method = Method {
    name: "qda/relationGraph",
    legacy: "qda/getGraph",
    payload_key: "relations",
};

pub const ONTOLOGY_TOPICS: Method = Method {
    name: "qda/ontologyTopics",
    legacy: "qda/listTopics",
    payload_key: "topics",
};

pub const ONTOLOGY_ANNOTATIONS: Method = Method {
    name: "qda/ontologyAnnotations",
    legacy: "qda/listOntologyAnnotations",
    payload_key: "annotations",
};

/// Parameters common to every request. Optional fields are omitted from
/// the wire when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    pub workspace_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_file: Option<String>,
}

/// Transport-level failure modes, as seen by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server does not know the requested method name.
    MethodNotFound,
    /// The server is not running or not yet initialized.
    NotReady,
    /// Any other failure, with the server's reason text.
    Failed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::MethodNotFound => write!(f, "method not found"),
            TransportError::NotReady => write!(f, "server not ready"),
            TransportError::Failed(reason) => write!(f, "request failed: {}", reason),
        }
    }
}

impl std::error::Error for TransportError {}

/// One logical connection to the external server. Implementations own
/// retry/timeout policy; the provider above them does not retry beyond
/// the legacy-alias fallback.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    async fn request(&self, method: &str, params: &RequestParams) -> Result<Value, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The envelope itself was malformed or reported failure.
    Envelope(String),
    /// An individual payload entry did not match the expected shape.
    Entry(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Envelope(reason) => write!(f, "bad response envelope: {}", reason),
            DecodeError::Entry(reason) => write!(f, "bad payload entry: {}", reason),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Unwrap a response envelope down to its payload entries.
pub fn decode_envelope(response: &Value, payload_key: &str) -> Result<Vec<Value>, DecodeError> {
    let object = response
        .as_object()
        .ok_or_else(|| DecodeError::Envelope("response is not an object".to_string()))?;
    let success = object
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| DecodeError::Envelope("missing success flag".to_string()))?;
    if !success {
        let reason = object
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unspecified server error");
        return Err(DecodeError::Envelope(reason.to_string()));
    }
    let payload = object
        .get(payload_key)
        .ok_or_else(|| DecodeError::Envelope(format!("missing payload key '{}'", payload_key)))?;
    let entries = payload
        .as_array()
        .ok_or_else(|| DecodeError::Envelope(format!("payload '{}' is not an array", payload_key)))?;
    Ok(entries.to_vec())
}

/// Decode payload entries into their raw typed form. The first malformed
/// entry fails the whole payload.
pub fn decode_entries<R>(entries: Vec<Value>) -> Result<Vec<R>, DecodeError>
where
    R: for<'de> Deserialize<'de>,
{
    let mut decoded = Vec::with_capacity(entries.len());
    for entry in entries {
        decoded.push(serde_json::from_value(entry).map_err(|err| DecodeError::Entry(err.to_string()))?);
    }
    Ok(decoded)
}

// Raw payload entry shapes, exactly as the server sends them. Line and
// column values here are one-based.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReference {
    pub bibref: String,
    pub file: String,
    pub line: u32,
    pub item_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCode {
    pub code: String,
    pub ontology_defined: bool,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: String,
    pub field: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelation {
    pub relation: String,
    pub from: String,
    pub to: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTopic {
    pub name: String,
    pub level: u32,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnnotation {
    pub code: String,
    pub ontology_defined: bool,
    pub ontology_file: Option<String>,
    pub ontology_line: Option<u32>,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: String,
    pub field: String,
    pub item_name: String,
}
