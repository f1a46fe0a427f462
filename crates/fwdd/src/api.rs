//! JSON action protocol for fwdd
//!
//! Every request is a JSON object posted to `/` naming an `action` and a
//! caller `traceId`. Every reply is HTTP 200; success or failure is carried
//! in the body:
//!
//! ```json
//! {"traceId": "abc", "code": 500, "errors": [{"code": 1200, "msg": "update forward error"}]}
//! ```

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::forwarder::Forwarder;
use crate::record::ForwardEntry;

/// Request body could not be read
pub const HTTP_REQUEST_BODY_CODE: u32 = 1000;
/// Request body is not valid JSON for the action
pub const JSON_FORMAT_CODE: u32 = 1100;
/// Unknown action
pub const NOT_SUPPORT_CODE: u32 = 1101;
/// UpdateForward failed
pub const UPDATE_CODE: u32 = 1200;
/// QueryForward failed
pub const QUERY_CODE: u32 = 1201;
/// DeleteForward failed
pub const DELETE_CODE: u32 = 1202;

pub const HTTP_REQUEST_BODY_MSG: &str = "read request body error";
pub const JSON_FORMAT_MSG: &str = "json format error";
pub const NOT_SUPPORT_MSG: &str = "not support action error";
pub const UPDATE_MSG: &str = "update forward error";
pub const QUERY_MSG: &str = "query forward error";
pub const DELETE_MSG: &str = "delete forward error";

/// Overall status: success
pub const SRV_OK: u32 = 200;
/// Overall status: failure
pub const SRV_ERR: u32 = 500;

/// Supported actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdateForward,
    QueryForward,
    DeleteForward,
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UpdateForward" => Ok(Action::UpdateForward),
            "QueryForward" => Ok(Action::QueryForward),
            "DeleteForward" => Ok(Action::DeleteForward),
            _ => Err(()),
        }
    }
}

/// Fields shared by every request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub trace_id: String,
}

/// UpdateForward parameters. Missing fields take their zero value and are
/// rejected by validation, not by the decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateForwardRequest {
    pub src_mac: String,
    pub dst_mac: String,
    pub iface: u32,
    pub ip: String,
}

/// DeleteForward parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteForwardRequest {
    pub ip: String,
}

/// One error in a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u32,
    pub msg: String,
}

impl ApiError {
    pub fn new(code: u32, msg: &str) -> Self {
        Self {
            code,
            msg: msg.to_string(),
        }
    }
}

/// Reply body for every action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub trace_id: String,
    pub code: u32,
    #[serde(default)]
    pub errors: Vec<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<ForwardEntry>>,
}

impl ActionResponse {
    pub fn ok(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            code: SRV_OK,
            errors: Vec::new(),
            tables: None,
        }
    }

    pub fn error(trace_id: impl Into<String>, code: u32, msg: &str) -> Self {
        let mut response = Self::ok(trace_id);
        response.fail(code, msg);
        response
    }

    fn fail(&mut self, code: u32, msg: &str) {
        self.code = SRV_ERR;
        self.errors.push(ApiError::new(code, msg));
    }

    pub fn is_ok(&self) -> bool {
        self.code == SRV_OK
    }
}

/// Action dispatcher over a [`Forwarder`]
#[derive(Clone)]
pub struct ApiService {
    forwarder: Arc<Forwarder>,
}

impl ApiService {
    pub fn new(forwarder: Arc<Forwarder>) -> Self {
        Self { forwarder }
    }

    /// Reply for a body that could not be read.
    pub fn read_failure() -> ActionResponse {
        ActionResponse::error("", HTTP_REQUEST_BODY_CODE, HTTP_REQUEST_BODY_MSG)
    }

    /// Decodes and runs one action.
    pub async fn handle(&self, body: &[u8]) -> ActionResponse {
        let request: ActionRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed action request");
                return ActionResponse::error("", JSON_FORMAT_CODE, JSON_FORMAT_MSG);
            }
        };
        let trace_id = request.trace_id;

        let action = match request.action.parse::<Action>() {
            Ok(action) => action,
            Err(()) => {
                warn!(trace_id = %trace_id, action = %request.action, "Unsupported action");
                return ActionResponse::error(trace_id, NOT_SUPPORT_CODE, NOT_SUPPORT_MSG);
            }
        };

        info!(trace_id = %trace_id, action = ?action, "Handling action");
        match action {
            Action::UpdateForward => self.update_forward(trace_id, body).await,
            Action::QueryForward => self.query_forward(trace_id).await,
            Action::DeleteForward => self.delete_forward(trace_id, body).await,
        }
    }

    async fn update_forward(&self, trace_id: String, body: &[u8]) -> ActionResponse {
        let request: UpdateForwardRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => return ActionResponse::error(trace_id, JSON_FORMAT_CODE, JSON_FORMAT_MSG),
        };

        let ctx = self.forwarder.context(trace_id.clone());
        let mut response = ActionResponse::ok(trace_id);
        if let Err(e) = self
            .forwarder
            .update(
                &ctx,
                &request.ip,
                request.iface,
                &request.src_mac,
                &request.dst_mac,
            )
            .await
        {
            error!(trace_id = %ctx.trace_id(), error = %e, "update forward fail");
            response.fail(UPDATE_CODE, UPDATE_MSG);
        }
        response
    }

    async fn query_forward(&self, trace_id: String) -> ActionResponse {
        let ctx = self.forwarder.context(trace_id.clone());
        let mut response = ActionResponse::ok(trace_id);
        match self.forwarder.query(&ctx).await {
            Ok(entries) => response.tables = Some(entries),
            Err(e) => {
                error!(trace_id = %ctx.trace_id(), error = %e, "query forward fail");
                response.fail(QUERY_CODE, QUERY_MSG);
                response.tables = Some(Vec::new());
            }
        }
        response
    }

    async fn delete_forward(&self, trace_id: String, body: &[u8]) -> ActionResponse {
        let request: DeleteForwardRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => return ActionResponse::error(trace_id, JSON_FORMAT_CODE, JSON_FORMAT_MSG),
        };

        let ctx = self.forwarder.context(trace_id.clone());
        let mut response = ActionResponse::ok(trace_id);
        if let Err(e) = self.forwarder.delete(&ctx, &request.ip).await {
            error!(trace_id = %ctx.trace_id(), error = %e, "delete forward fail");
            response.fail(DELETE_CODE, DELETE_MSG);
        }
        response
    }
}
