//! Outbound request descriptions and transport outcomes.
//!
//! An [`OutboundRequest`] is everything a transport needs to perform one
//! backend call, plus the typed completion effects that must run once the
//! call has an outcome. Requests are immutable after construction; the
//! builder methods consume `self`.

use crate::client::ClientKeyState;
use crate::transport::CompletionEffect;
use log::{debug, info};
use serde::Serialize;
use std::fmt;

/// JSON content type
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Protocol buffer content type used for encrypted payloads
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Raw bytes content type used for asset data
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Accept header for image downloads
pub const IMAGE_ACCEPT_TYPE: &str = "image/*";

/// Boundary separating multipart parts
pub const MULTIPART_BOUNDARY: &str = "frontier";

// Request descriptions are printed and logged; payload bytes are not.
fn summarize_bytes<S: serde::Serializer>(
    data: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("<{} bytes>", data.len()))
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// One part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultipartPart {
    /// Part content type
    pub content_type: String,
    /// Part bytes
    #[serde(serialize_with = "summarize_bytes")]
    pub data: Vec<u8>,
}

/// A `multipart/mixed` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MultipartBody {
    parts: Vec<MultipartPart>,
}

impl MultipartBody {
    /// Empty body
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part
    pub fn with_part(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.parts.push(MultipartPart {
            content_type: content_type.into(),
            data,
        });
        self
    }

    /// Parts in transmission order
    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    /// Content type header value for this body
    pub fn content_type() -> String {
        format!("multipart/mixed; boundary={MULTIPART_BOUNDARY}")
    }

    /// Frame all parts into the wire representation.
    ///
    /// Each part is preceded by a `--frontier` delimiter line and its own
    /// `Content-Type` and `Content-Length` headers; the body ends with the
    /// closing `--frontier--` delimiter.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
                    part.content_type,
                    part.data.len()
                )
                .as_bytes(),
            );
            out.extend_from_slice(&part.data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
        out
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON object
    Json(serde_json::Value),
    /// Opaque bytes, typically an encrypted protobuf
    Binary(#[serde(serialize_with = "summarize_bytes")] Vec<u8>),
    /// Several typed parts
    Multipart(MultipartBody),
}

impl RequestBody {
    /// JSON payload, if this is a JSON body
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Raw bytes, if this is a binary body
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// Multipart body, if this is one
    pub fn as_multipart(&self) -> Option<&MultipartBody> {
        match self {
            Self::Multipart(body) => Some(body),
            _ => None,
        }
    }

    /// Bytes as they go on the wire
    pub fn to_bytes(&self) -> crate::utils::Result<Vec<u8>> {
        Ok(match self {
            Self::Empty => Vec::new(),
            Self::Json(value) => serde_json::to_vec(value)?,
            Self::Binary(data) => data.clone(),
            Self::Multipart(body) => body.encode(),
        })
    }
}

/// Device-record fields an upstream request synchronises with the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientField {
    /// Remaining prekey count on the backend
    NumberOfKeysRemaining,
    /// Pending signaling key upload
    NeedsToUpdateSignalingKeys,
    /// Pending client deletion
    MarkedToDelete,
}

/// A fully described backend call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundRequest {
    path: String,
    method: Method,
    body: RequestBody,
    content_type: Option<String>,
    accept: String,
    background: bool,
    updated_fields: Vec<ClientField>,
    debug_info: Vec<String>,
    #[serde(skip)]
    completion_effects: Vec<CompletionEffect>,
}

impl OutboundRequest {
    fn new(
        path: impl Into<String>,
        method: Method,
        body: RequestBody,
        content_type: Option<String>,
    ) -> Self {
        let request = Self {
            path: path.into(),
            method,
            body,
            content_type,
            accept: JSON_CONTENT_TYPE.to_string(),
            background: false,
            updated_fields: Vec::new(),
            debug_info: Vec::new(),
            completion_effects: Vec::new(),
        };
        debug!("built {} {}", request.method, request.path);
        request
    }

    /// Bodyless GET
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path, Method::Get, RequestBody::Empty, None)
    }

    /// JSON request
    pub fn json(path: impl Into<String>, method: Method, payload: serde_json::Value) -> Self {
        Self::new(
            path,
            method,
            RequestBody::Json(payload),
            Some(JSON_CONTENT_TYPE.to_string()),
        )
    }

    /// Single-part binary request
    pub fn binary(
        path: impl Into<String>,
        method: Method,
        data: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::new(path, method, RequestBody::Binary(data), Some(content_type.into()))
    }

    /// Multipart POST
    pub fn multipart(path: impl Into<String>, body: MultipartBody) -> Self {
        Self::new(
            path,
            Method::Post,
            RequestBody::Multipart(body),
            Some(MultipartBody::content_type()),
        )
    }

    /// Attach a completion effect; effects run in attachment order
    pub fn with_effect(mut self, effect: CompletionEffect) -> Self {
        self.completion_effects.push(effect);
        self
    }

    /// Tag a device-record field this request synchronises
    pub fn with_updated_field(mut self, field: ClientField) -> Self {
        self.updated_fields.push(field);
        self
    }

    /// Route through a background-capable session
    pub fn force_background(mut self) -> Self {
        self.background = true;
        self
    }

    /// Expect a different response content type
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Append a diagnostic line
    pub fn append_debug_info(mut self, info: impl Into<String>) -> Self {
        self.debug_info.push(info.into());
        self
    }

    /// Path relative to the backend root, including any query
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Body
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Content type of the body, `None` for bodyless requests
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Expected response content type
    pub fn accept(&self) -> &str {
        &self.accept
    }

    /// Whether the request must use a background-capable session
    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Device-record fields this request synchronises
    pub fn updated_fields(&self) -> &[ClientField] {
        &self.updated_fields
    }

    /// Diagnostic lines
    pub fn debug_info(&self) -> &[String] {
        &self.debug_info
    }

    /// Attached completion effects
    pub fn completion_effects(&self) -> &[CompletionEffect] {
        &self.completion_effects
    }

    /// Apply every completion effect to `state` for the given outcome.
    ///
    /// Must be called by whoever owns `state`. Returns how many effects
    /// changed it; always zero unless the outcome is a success.
    pub fn complete(&self, outcome: &Outcome, state: &mut ClientKeyState) -> usize {
        let applied = self
            .completion_effects
            .iter()
            .filter(|effect| effect.apply(outcome, state))
            .count();
        if applied > 0 {
            info!("{} {}: applied {} completion effects", self.method, self.path, applied);
        }
        applied
    }
}

/// Result classification reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseStatus {
    /// The backend accepted the request
    Success,
    /// Failed, may succeed later
    TemporaryError,
    /// Failed for good
    PermanentError,
}

/// What the transport reports back after executing a request
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Classified result
    pub status: ResponseStatus,
    /// HTTP status code, 0 when no response arrived
    pub http_status: u16,
    /// Decoded response payload
    pub payload: Option<serde_json::Value>,
}

impl Outcome {
    /// Successful outcome with an optional payload
    pub fn success(http_status: u16, payload: Option<serde_json::Value>) -> Self {
        Self {
            status: ResponseStatus::Success,
            http_status,
            payload,
        }
    }

    /// Temporary failure
    pub fn temporary_error(http_status: u16) -> Self {
        Self {
            status: ResponseStatus::TemporaryError,
            http_status,
            payload: None,
        }
    }

    /// Permanent failure
    pub fn permanent_error(http_status: u16, payload: Option<serde_json::Value>) -> Self {
        Self {
            status: ResponseStatus::PermanentError,
            http_status,
            payload,
        }
    }

    /// Whether the backend accepted the request
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
