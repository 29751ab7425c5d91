//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. Every text
//! frame is one JSON request; the server answers each with exactly one
//! JSON response frame.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PbxError;
use crate::request::{Outcome, Params};

/// Code of every successful response.
pub const SUCCESS_CODE: &str = "PBX200";

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// One request from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    /// Handler id, e.g. `authScore`.
    pub request_type: String,
    /// Flat parameter map.
    #[serde(default)]
    pub params: Params,
    /// Correlation id echoed in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ClientRequest {
    /// Parse from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The client's correlation id, or a fresh one.
    pub fn correlation_id(&self) -> String {
        self.request_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// One response to a client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResponse {
    /// `PBX###` code.
    pub response_code: String,
    /// Fixed description of the code.
    pub response_desc: String,
    /// Handler payload or error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_msg: Option<String>,
    /// Correlation id of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ServerResponse {
    /// Response for a successful handler outcome.
    pub fn success(outcome: &Outcome, request_id: Option<String>) -> Self {
        Self {
            response_code: SUCCESS_CODE.to_string(),
            response_desc: describe(SUCCESS_CODE).to_string(),
            response_msg: outcome.message().map(str::to_string),
            request_id,
        }
    }

    /// Response for a failed request.
    pub fn failure(err: &PbxError, request_id: Option<String>) -> Self {
        let code = err.code();
        Self {
            response_code: code.to_string(),
            response_desc: describe(code).to_string(),
            response_msg: Some(err.to_string()),
            request_id,
        }
    }

    /// Response for a handler result.
    pub fn from_result(result: &crate::error::Result<Outcome>, request_id: Option<String>) -> Self {
        match result {
            Ok(outcome) => Self::success(outcome, request_id),
            Err(err) => Self::failure(err, request_id),
        }
    }

    /// Whether this is a success response.
    pub fn is_success(&self) -> bool {
        self.response_code == SUCCESS_CODE
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Fixed description of a response code.
pub fn describe(code: &str) -> &'static str {
    match code {
        "PBX200" => "Request Successful",
        "PBX401" => "Inappropriate Data Supplied",
        "PBX500" => "Internal Error",
        "PBX502" => "Upstream Failure",
        "PBX601" => "Invalid Timestamp",
        "PBX602" => "Unauthorised Submission",
        "PBX603" => "Malformed Authorisation Key",
        "PBX701" => "Already Exists",
        "PBX702" => "Does Not Exist",
        "PBX703" => "Unacceptable Name",
        "PBX801" => "Unknown Game",
        _ => "Unknown Response",
    }
}
