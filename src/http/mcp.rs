//! MCP JSON-RPC surface
//!
//! The assistant-facing method dispatch: `initialize`, `tools/list`,
//! `tools/call`, plus acceptance of client notifications. Every call is
//! authenticated with a bridge api key in the `Authorization` header; the
//! wrapped Slack token never crosses this boundary.

use super::{AppError, AppState};
use crate::constants::{MCP_PROTOCOL_VERSION, MCP_SERVER_NAME};
use crate::registry::UserRecord;
use crate::BridgeError;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Inbound JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// POST / and POST /message
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<McpRequest>,
) -> Response {
    // Bearer auth on every method, including initialize
    let user = match authenticate(&state, &headers).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    // Notifications carry no id and expect no result
    if req.method.starts_with("notifications/") {
        return StatusCode::ACCEPTED.into_response();
    }

    let id = req.id.clone().unwrap_or(Value::Null);
    match req.method.as_str() {
        "initialize" => rpc_result(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": MCP_SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "tools/list" => {
            let tools = crate::tools::catalog();
            rpc_result(id, json!({ "tools": tools }))
        }
        "tools/call" => {
            let params: ToolCallParams = match req
                .params
                .map(serde_json::from_value)
                .transpose()
                .ok()
                .flatten()
            {
                Some(params) => params,
                None => {
                    return rpc_error(id, -32602, "Invalid params: expected {name, arguments}")
                }
            };

            let args = params.arguments.unwrap_or_else(|| json!({}));
            tracing::debug!(tool = %params.name, user_id = %user.id, "Tool call");
            let result = state
                .dispatcher
                .dispatch(&params.name, &args, &user.platform_token)
                .await;
            match serde_json::to_value(&result) {
                Ok(value) => rpc_result(id, value),
                Err(e) => {
                    tracing::error!(error = %e, "Tool result serialization failed");
                    rpc_error(id, -32603, "Internal error")
                }
            }
        }
        other => {
            tracing::debug!(method = other, "Unknown MCP method");
            rpc_error(id, -32601, &format!("Method not found: {other}"))
        }
    }
}

/// Resolve the bearer api key to an active user, failing with the structured
/// 401 body (including a hint on how to obtain a key)
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserRecord, AppError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::from(BridgeError::unauthenticated(
                "missing Authorization: Bearer header",
            ))
        })?;

    state
        .registry
        .get_user_by_api_key(bearer)
        .await?
        .ok_or_else(|| AppError::from(BridgeError::unauthenticated("invalid or revoked api key")))
}

fn rpc_result(id: Value, result: Value) -> Response {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
}

fn rpc_error(id: Value, code: i64, message: &str) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    }))
    .into_response()
}
