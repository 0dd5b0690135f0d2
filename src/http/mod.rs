//! HTTP surface
//!
//! All inbound routes live here:
//! - `/register` — direct token-for-key registration
//! - `/oauth/*` — the authorization-code handoff (authorize, store-token,
//!   token, discovery)
//! - `/connect` — the human-facing connect page
//! - `/` and `/message` — the MCP JSON-RPC tool surface (bearer-key auth)

pub mod mcp;
pub mod template;

use crate::config::Config;
use crate::oauth::OauthExchange;
use crate::registry::{credential_preview, is_valid_platform_token, UserInfo, UserRegistry};
use crate::slack::PlatformValidator;
use crate::tools::ToolDispatcher;
use crate::BridgeError;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use template::TemplateRenderer;

// ============================================================================
// State and error adapter
// ============================================================================

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: UserRegistry,
    pub exchange: OauthExchange,
    pub dispatcher: ToolDispatcher,
    pub validator: Arc<dyn PlatformValidator>,
    pub config: Arc<Config>,
    pub templates: Arc<TemplateRenderer>,
}

/// HTTP-facing error: status, stable error code, human message
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint: None,
        }
    }

    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }
}

impl From<BridgeError> for AppError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::InvalidRequest(msg) => Self::bad_request("invalid_request", msg),
            BridgeError::InvalidCredentialFormat(msg) => {
                Self::bad_request("invalid_credential_format", msg)
            }
            BridgeError::Unauthenticated(msg) => Self {
                status: StatusCode::UNAUTHORIZED,
                code: "unauthenticated",
                message: msg,
                hint: Some(
                    "Obtain an api key by registering a Slack token at POST /register \
                     or through the OAuth connect flow, then send it as \
                     `Authorization: Bearer <key>`."
                        .to_string(),
                ),
            },
            BridgeError::InvalidGrant => Self::bad_request(
                "invalid_grant",
                "authorization code is invalid, expired, or already used",
            ),
            BridgeError::UnsupportedGrantType(g) => {
                Self::bad_request("unsupported_grant_type", format!("unsupported grant type: {g}"))
            }
            BridgeError::Upstream(msg) => Self::new(StatusCode::BAD_GATEWAY, "upstream_error", msg),
            // Store/internal details stay in the logs, not the response
            BridgeError::Store(msg) | BridgeError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error",
                )
            }
            BridgeError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error",
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.code, "message": self.message });
        if let Some(hint) = self.hint {
            body["hint"] = json!(hint);
        }
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(mcp::handle))
        .route("/message", post(mcp::handle))
        .route("/register", post(register))
        .route("/connect", get(connect_page))
        .route("/oauth/authorize", get(authorize))
        .route("/oauth/store-token", post(store_token))
        .route("/oauth/token", post(token))
        .route("/oauth/config", get(oauth_config))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

// ============================================================================
// Registration
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[serde(default)]
    platform_token: Option<String>,
    #[serde(default)]
    user_info: Option<UserInfo>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    success: bool,
    api_key: String,
    user_id: String,
}

/// POST /register — validate a Slack token and mint an api key for it
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> std::result::Result<impl IntoResponse, AppError> {
    // 1. Reject shape problems before touching the store or the network
    let token = req.platform_token.as_deref().unwrap_or("");
    if token.is_empty() {
        return Err(AppError::bad_request(
            "invalid_request",
            "platformToken is required",
        ));
    }
    if !is_valid_platform_token(token) {
        return Err(AppError::bad_request(
            "invalid_credential_format",
            "platformToken must be a Slack user token (xoxp-…)",
        ));
    }

    // 2. Live validation against Slack
    let identity = match state.validator.validate(token).await {
        Ok(identity) => identity,
        Err(BridgeError::Upstream(msg)) => {
            tracing::warn!(token = %credential_preview(token), error = %msg, "Registration token rejected by Slack");
            return Err(AppError::bad_request(
                "invalid_token",
                "Slack rejected the supplied token",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    // 3. Mint the record and key
    let mut user_info = req.user_info.unwrap_or_default();
    if user_info.source.is_none() {
        user_info.source = Some("register".to_string());
    }
    if user_info.name.is_none() {
        user_info.name = identity.user;
    }
    if user_info.team_id.is_none() {
        user_info.team_id = identity.team_id;
    }
    if user_info.team_name.is_none() {
        user_info.team_name = identity.team;
    }

    let creds = state.registry.create_user(token, user_info).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            api_key: creds.api_key,
            user_id: creds.user_id,
        }),
    ))
}

// ============================================================================
// OAuth handoff
// ============================================================================

#[derive(Deserialize)]
struct AuthorizeQuery {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    response_type: Option<String>,
}

/// GET /oauth/authorize — start the handoff and bounce to the connect page
async fn authorize(
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    if let Some(response_type) = query.response_type.as_deref() {
        if response_type != "code" {
            return oauth_error(
                StatusCode::BAD_REQUEST,
                "unsupported_response_type",
                "only response_type=code is supported",
            );
        }
    }

    let result = state.exchange.begin_authorization(
        query.client_id.as_deref().unwrap_or(""),
        query.redirect_uri.as_deref().unwrap_or(""),
        query.state.as_deref(),
    );

    match result {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Err(BridgeError::InvalidRequest(msg)) => {
            oauth_error(StatusCode::BAD_REQUEST, "invalid_request", &msg)
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

#[derive(Deserialize)]
struct ConnectQuery {
    #[serde(default)]
    auth_code: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

/// GET /connect — the human-facing token submission page
async fn connect_page(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
) -> std::result::Result<Html<String>, AppError> {
    let html = state.templates.render_connect(
        query.auth_code.as_deref(),
        query.redirect_uri.as_deref(),
        query.state.as_deref(),
    )?;
    Ok(Html(html))
}

#[derive(Deserialize)]
struct StoreTokenRequest {
    #[serde(default, alias = "authCode")]
    auth_code: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// POST /oauth/store-token — finish the human step of the handoff.
///
/// Validates the submitted Slack token live, registers (or re-keys) the
/// user, and stores the minted api key under the in-flight code. The
/// assistant that later redeems the code therefore receives a bridge key,
/// never the raw Slack secret.
async fn store_token(
    State(state): State<AppState>,
    Json(req): Json<StoreTokenRequest>,
) -> std::result::Result<Json<serde_json::Value>, AppError> {
    // 1. Both fields, shape-checked, before any side effects
    let code = req.auth_code.as_deref().unwrap_or("");
    let token = req.token.as_deref().unwrap_or("");
    if code.is_empty() || token.is_empty() {
        return Err(AppError::bad_request(
            "invalid_request",
            "authCode and token are required",
        ));
    }
    if !is_valid_platform_token(token) {
        return Err(AppError::bad_request(
            "invalid_credential_format",
            "token must be a Slack user token (xoxp-…)",
        ));
    }

    // 2. Live validation
    let identity = match state.validator.validate(token).await {
        Ok(identity) => identity,
        Err(BridgeError::Upstream(msg)) => {
            tracing::warn!(token = %credential_preview(token), error = %msg, "Connect token rejected by Slack");
            return Err(AppError::bad_request(
                "invalid_token",
                "Slack rejected the supplied token",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    // 3. Register and store the api key against the code
    let user_info = UserInfo {
        name: identity.user,
        team_id: identity.team_id,
        team_name: identity.team,
        source: Some("oauth".to_string()),
        ..Default::default()
    };
    let creds = state.registry.create_user(token, user_info).await?;
    state.exchange.store_token(code, &creds.api_key).await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
struct TokenRequest {
    #[serde(default)]
    grant_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    // Accepted and ignored: the redirect happened before the code was stored
    #[serde(default)]
    #[allow(dead_code)]
    redirect_uri: Option<String>,
}

/// POST /oauth/token — redeem a code, once, for the stored credential
async fn token(
    State(state): State<AppState>,
    axum::extract::Form(req): axum::extract::Form<TokenRequest>,
) -> Response {
    let result = state
        .exchange
        .exchange(
            req.grant_type.as_deref().unwrap_or(""),
            req.code.as_deref().unwrap_or(""),
            req.client_id.as_deref().unwrap_or(""),
        )
        .await;

    match result {
        Ok(grant) => Json(grant).into_response(),
        Err(BridgeError::UnsupportedGrantType(g)) => oauth_error(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            &format!("unsupported grant type: {g}"),
        ),
        Err(BridgeError::InvalidRequest(msg)) => {
            oauth_error(StatusCode::BAD_REQUEST, "invalid_request", &msg)
        }
        Err(BridgeError::InvalidGrant) => oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_grant",
            "authorization code is invalid, expired, or already used",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal error",
            )
        }
    }
}

/// GET /oauth/config — discovery document for OAuth-aware clients
async fn oauth_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let base = &state.config.public_base_url;
    Json(json!({
        "authorization_endpoint": format!("{base}/oauth/authorize"),
        "token_endpoint": format!("{base}/oauth/token"),
        "registration_endpoint": format!("{base}/register"),
        "client_id": state.config.oauth_client_id,
        "scopes": crate::constants::OAUTH_SCOPES,
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code"],
    }))
}

/// OAuth-vocabulary error body (`error` + `error_description`)
fn oauth_error(status: StatusCode, error: &str, description: &str) -> Response {
    (
        status,
        Json(json!({ "error": error, "error_description": description })),
    )
        .into_response()
}
