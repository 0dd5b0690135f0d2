//! Outbound Slack Web API client
//!
//! Thin authenticated wrapper over the handful of Slack methods the tool
//! surface needs, plus the live token validation used at registration time.
//! Slack's `{ok: false, error}` envelope is mapped to `Upstream` errors
//! carrying the Slack error code.

use crate::{BridgeError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Default Slack Web API base
pub const SLACK_API_BASE: &str = "https://slack.com/api";

// ============================================================================
// Response shapes (only the fields we render)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTestResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub num_members: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchMatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub channel: Option<SearchChannel>,
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchChannel {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchMessages {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: SearchMessages,
}

/// Search results after envelope unwrapping
#[derive(Debug)]
pub struct SearchResults {
    pub total: u64,
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channel: Option<String>,
}

/// Confirmation for a posted message
#[derive(Debug)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

/// Identity details confirmed by `auth.test`
#[derive(Debug, Clone)]
pub struct ValidatedIdentity {
    pub user: Option<String>,
    pub user_id: Option<String>,
    pub team: Option<String>,
    pub team_id: Option<String>,
}

// ============================================================================
// Live validation seam
// ============================================================================

/// Live validation of a platform token against Slack.
///
/// A trait so the HTTP handlers can be exercised without network access.
#[async_trait]
pub trait PlatformValidator: Send + Sync {
    /// Confirm the token authenticates, returning who it belongs to
    async fn validate(&self, token: &str) -> Result<ValidatedIdentity>;
}

/// Production validator backed by `auth.test`
pub struct SlackValidator {
    base_url: String,
}

impl SlackValidator {
    pub fn new() -> Self {
        Self {
            base_url: SLACK_API_BASE.to_string(),
        }
    }
}

impl Default for SlackValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformValidator for SlackValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedIdentity> {
        let client = SlackClient::with_base(token, &self.base_url)?;
        client.auth_test().await
    }
}

// ============================================================================
// Client
// ============================================================================

/// Authenticated client for one platform token
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    /// Build a client against the real Slack API.
    ///
    /// Returns an error if the HTTP client cannot be constructed (e.g. TLS
    /// initialization failure).
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base(token, SLACK_API_BASE)
    }

    /// Build a client against an alternate base URL
    pub fn with_base(token: &str, base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BridgeError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Validate the token and report the identity behind it
    pub async fn auth_test(&self) -> Result<ValidatedIdentity> {
        let resp: AuthTestResponse = self.get_json("auth.test", &[]).await?;
        if !resp.ok {
            return Err(slack_error("auth.test", resp.error));
        }
        Ok(ValidatedIdentity {
            user: resp.user,
            user_id: resp.user_id,
            team: resp.team,
            team_id: resp.team_id,
        })
    }

    /// List public channels, paginated by Slack's own cursor
    pub async fn list_channels(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<(Vec<Channel>, Option<String>)> {
        let mut query = vec![
            ("limit", limit.to_string()),
            ("types", "public_channel".to_string()),
            ("exclude_archived", "true".to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let resp: ChannelsResponse = self.get_json("conversations.list", &query).await?;
        if !resp.ok {
            return Err(slack_error("conversations.list", resp.error));
        }
        let next = (!resp.response_metadata.next_cursor.is_empty())
            .then(|| resp.response_metadata.next_cursor.clone());
        Ok((resp.channels, next))
    }

    /// Recent messages in a channel, newest first
    pub async fn channel_history(&self, channel_id: &str, limit: u32) -> Result<Vec<Message>> {
        let query = vec![
            ("channel", channel_id.to_string()),
            ("limit", limit.to_string()),
        ];
        let resp: HistoryResponse = self.get_json("conversations.history", &query).await?;
        if !resp.ok {
            return Err(slack_error("conversations.history", resp.error));
        }
        Ok(resp.messages)
    }

    /// Full-text message search; requires the search scope on the token
    pub async fn search_messages(&self, query_text: &str, count: u32) -> Result<SearchResults> {
        let query = vec![
            ("query", query_text.to_string()),
            ("count", count.to_string()),
        ];
        let resp: SearchResponse = self.get_json("search.messages", &query).await?;
        if !resp.ok {
            return Err(slack_error("search.messages", resp.error));
        }
        Ok(SearchResults {
            total: resp.messages.total,
            matches: resp.messages.matches,
        })
    }

    /// Post a message to a channel
    pub async fn post_message(&self, channel_id: &str, text: &str) -> Result<PostedMessage> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "channel": channel_id, "text": text }))
            .send()
            .await?;
        let resp: PostMessageResponse = response.json().await?;
        if !resp.ok {
            return Err(slack_error("chat.postMessage", resp.error));
        }
        Ok(PostedMessage {
            channel: resp.channel.unwrap_or_else(|| channel_id.to_string()),
            ts: resp.ts.unwrap_or_default(),
        })
    }

    /// List workspace members, paginated by Slack's own cursor
    pub async fn list_users(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<(Vec<Member>, Option<String>)> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let resp: UsersResponse = self.get_json("users.list", &query).await?;
        if !resp.ok {
            return Err(slack_error("users.list", resp.error));
        }
        let next = (!resp.response_metadata.next_cursor.is_empty())
            .then(|| resp.response_metadata.next_cursor.clone());
        Ok((resp.members, next))
    }
}

fn slack_error(method: &str, code: Option<String>) -> BridgeError {
    BridgeError::upstream(format!(
        "{method}: {}",
        code.unwrap_or_else(|| "unknown_error".to_string())
    ))
}

/// Does this upstream failure mean the token lacks search scope?
///
/// Drives the degraded-mode search fallback in the tool dispatcher.
pub fn is_search_scope_error(error: &BridgeError) -> bool {
    matches!(
        error,
        BridgeError::Upstream(msg)
            if msg.contains("not_allowed_token_type") || msg.contains("missing_scope")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_scope_error_detection() {
        let scoped = slack_error("search.messages", Some("missing_scope".to_string()));
        assert!(is_search_scope_error(&scoped));

        let other = slack_error("search.messages", Some("channel_not_found".to_string()));
        assert!(!is_search_scope_error(&other));
        assert!(!is_search_scope_error(&BridgeError::InvalidGrant));
    }

    #[test]
    fn test_envelope_error_mapping() {
        let err = slack_error("auth.test", None);
        assert!(matches!(err, BridgeError::Upstream(msg) if msg.contains("unknown_error")));
    }
}
