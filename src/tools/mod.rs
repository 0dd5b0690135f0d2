//! Assistant-facing tool surface
//!
//! A static catalog of schema-described Slack operations and the dispatcher
//! that resolves one `tools/call` into one outbound Slack call. Every reply —
//! success or failure — is rendered as display text in the uniform
//! `{content: [{type: "text", text}], isError?}` envelope, so the calling
//! assistant can show upstream errors instead of treating the call as a
//! protocol fault.

use crate::slack::{is_search_scope_error, Channel, Member, Message, SearchMatch, SlackClient};
use crate::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Envelope
// ============================================================================

/// One content block in a tool reply
#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Uniform tool reply envelope
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Successful text reply
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: None,
        }
    }

    /// Failed call, rendered for display rather than surfaced as a
    /// transport fault
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: Some(true),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// One named, schema-described operation the assistant may invoke
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(description = "Input for full-text message search")]
pub struct SearchMessagesInput {
    #[schemars(description = "Search query")]
    pub query: String,
    #[serde(default)]
    #[schemars(description = "Maximum number of results (default 20)")]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(description = "Input for listing channels")]
pub struct ListChannelsInput {
    #[serde(default)]
    #[schemars(description = "Maximum number of channels (default 100)")]
    pub limit: Option<u32>,
    #[serde(default)]
    #[schemars(description = "Pagination cursor from a previous call")]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(description = "Input for fetching channel history")]
pub struct ChannelHistoryInput {
    #[schemars(description = "Channel ID (e.g. C0123456789)")]
    pub channel_id: String,
    #[serde(default)]
    #[schemars(description = "Maximum number of messages (default 50)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(description = "Input for sending a message")]
pub struct PostMessageInput {
    #[schemars(description = "Channel ID to post to")]
    pub channel_id: String,
    #[schemars(description = "Message text")]
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(description = "Input for listing workspace users")]
pub struct ListUsersInput {
    #[serde(default)]
    #[schemars(description = "Maximum number of users (default 100)")]
    pub limit: Option<u32>,
    #[serde(default)]
    #[schemars(description = "Pagination cursor from a previous call")]
    pub cursor: Option<String>,
}

fn descriptor<T: JsonSchema>(name: &str, description: &str) -> ToolDescriptor {
    let schema = schemars::schema_for!(T);
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(schema).unwrap_or_else(|_| Value::Object(Default::default())),
    }
}

/// The full tool catalog, in the order clients display it
pub fn catalog() -> Vec<ToolDescriptor> {
    vec![
        descriptor::<SearchMessagesInput>(
            "slack_search_messages",
            "Search Slack messages across the workspace",
        ),
        descriptor::<ListChannelsInput>("slack_list_channels", "List public Slack channels"),
        descriptor::<ChannelHistoryInput>(
            "slack_get_channel_history",
            "Fetch recent messages from a Slack channel",
        ),
        descriptor::<PostMessageInput>("slack_post_message", "Send a message to a Slack channel"),
        descriptor::<ListUsersInput>("slack_list_users", "List Slack workspace users"),
    ]
}

// ============================================================================
// Dispatch
// ============================================================================

/// Resolves a tool name plus arguments into one outbound Slack call
#[derive(Clone)]
pub struct ToolDispatcher {
    slack_base: String,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self {
            slack_base: crate::slack::SLACK_API_BASE.to_string(),
        }
    }

    /// Point outbound calls at an alternate Slack base URL
    pub fn with_base(slack_base: &str) -> Self {
        Self {
            slack_base: slack_base.to_string(),
        }
    }

    /// Execute one tool call with the caller's platform token.
    ///
    /// Never returns an error: argument problems, unknown tools, and
    /// upstream failures all come back as `isError` envelopes.
    pub async fn dispatch(&self, name: &str, args: &Value, token: &str) -> ToolResult {
        let client = match SlackClient::with_base(token, &self.slack_base) {
            Ok(client) => client,
            Err(e) => return ToolResult::error(format!("Client setup failed: {e}")),
        };

        let result = match name {
            "slack_search_messages" => self.search_messages(&client, args).await,
            "slack_list_channels" => self.list_channels(&client, args).await,
            "slack_get_channel_history" => self.channel_history(&client, args).await,
            "slack_post_message" => self.post_message(&client, args).await,
            "slack_list_users" => self.list_users(&client, args).await,
            other => return ToolResult::error(format!("Unknown tool: {other}")),
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                ToolResult::error(format!("Tool call failed: {e}"))
            }
        }
    }

    async fn search_messages(&self, client: &SlackClient, args: &Value) -> Result<ToolResult> {
        let input: SearchMessagesInput = parse_args(args)?;
        let count = input.count.unwrap_or(20).min(100);

        match client.search_messages(&input.query, count).await {
            Ok(results) => Ok(ToolResult::text(render_search(&input.query, results.total, &results.matches))),
            // Tokens without search scope degrade to client-side filtering
            // over recent history rather than failing the call
            Err(e) if is_search_scope_error(&e) => {
                tracing::debug!(query = %input.query, "Search scope missing, falling back to history filter");
                self.fallback_search(client, &input.query, count as usize).await
            }
            Err(e) => Err(e),
        }
    }

    /// Degraded-mode search: recent channel histories filtered locally
    async fn fallback_search(
        &self,
        client: &SlackClient,
        query: &str,
        count: usize,
    ) -> Result<ToolResult> {
        let terms = query_terms(query);
        let (channels, _) = client.list_channels(10, None).await?;

        let mut lines = Vec::new();
        for channel in &channels {
            if lines.len() >= count {
                break;
            }
            // A channel the token cannot read is skipped, not fatal
            let messages = match client.channel_history(&channel.id, 50).await {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::debug!(channel = %channel.id, error = %e, "History fetch skipped in fallback search");
                    continue;
                }
            };
            for message in messages {
                if lines.len() >= count {
                    break;
                }
                if message_matches(&message.text, &terms) {
                    lines.push(format!(
                        "#{} [{}] {}: {}",
                        channel.name,
                        message.ts,
                        message.user.as_deref().unwrap_or("unknown"),
                        message.text
                    ));
                }
            }
        }

        let text = if lines.is_empty() {
            format!("No messages matching \"{query}\" in recent channel history (search scope unavailable on this token).")
        } else {
            format!(
                "Search scope unavailable on this token; showing substring matches from recent channel history:\n{}",
                lines.join("\n")
            )
        };
        Ok(ToolResult::text(text))
    }

    async fn list_channels(&self, client: &SlackClient, args: &Value) -> Result<ToolResult> {
        let input: ListChannelsInput = parse_args(args)?;
        let limit = input.limit.unwrap_or(100).min(1000);
        let (channels, next) = client.list_channels(limit, input.cursor.as_deref()).await?;
        Ok(ToolResult::text(render_channels(&channels, next.as_deref())))
    }

    async fn channel_history(&self, client: &SlackClient, args: &Value) -> Result<ToolResult> {
        let input: ChannelHistoryInput = parse_args(args)?;
        let limit = input.limit.unwrap_or(50).min(1000);
        let messages = client.channel_history(&input.channel_id, limit).await?;
        Ok(ToolResult::text(render_history(&input.channel_id, &messages)))
    }

    async fn post_message(&self, client: &SlackClient, args: &Value) -> Result<ToolResult> {
        let input: PostMessageInput = parse_args(args)?;
        let posted = client.post_message(&input.channel_id, &input.text).await?;
        Ok(ToolResult::text(format!(
            "Message sent to {} (ts {})",
            posted.channel, posted.ts
        )))
    }

    async fn list_users(&self, client: &SlackClient, args: &Value) -> Result<ToolResult> {
        let input: ListUsersInput = parse_args(args)?;
        let limit = input.limit.unwrap_or(100).min(1000);
        let (members, next) = client.list_users(limit, input.cursor.as_deref()).await?;
        Ok(ToolResult::text(render_users(&members, next.as_deref())))
    }
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| crate::BridgeError::invalid_request(format!("invalid arguments: {e}")))
}

// ============================================================================
// Query filtering (degraded-mode search)
// ============================================================================

/// Whitespace-split query terms longer than two characters, lowercased
fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|term| term.len() > 2)
        .map(String::from)
        .collect()
}

/// Substring match of any term against the lowercased message text
fn message_matches(text: &str, terms: &[String]) -> bool {
    if terms.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    terms.iter().any(|term| haystack.contains(term.as_str()))
}

// ============================================================================
// Rendering
// ============================================================================

fn render_search(query: &str, total: u64, matches: &[SearchMatch]) -> String {
    if matches.is_empty() {
        return format!("No messages matching \"{query}\".");
    }
    let mut out = format!("{total} messages matching \"{query}\":\n");
    for (i, m) in matches.iter().enumerate() {
        let channel = m
            .channel
            .as_ref()
            .map(|c| format!("#{}", c.name))
            .unwrap_or_else(|| "(unknown channel)".to_string());
        out.push_str(&format!(
            "{}. {} [{}] {}: {}\n",
            i + 1,
            channel,
            m.ts,
            m.username.as_deref().unwrap_or("unknown"),
            m.text
        ));
    }
    out
}

fn render_channels(channels: &[Channel], next_cursor: Option<&str>) -> String {
    if channels.is_empty() {
        return "No channels visible to this token.".to_string();
    }
    let mut out = format!("{} channels:\n", channels.len());
    for channel in channels {
        let members = channel
            .num_members
            .map(|n| format!(", {n} members"))
            .unwrap_or_default();
        out.push_str(&format!("#{} ({}{})\n", channel.name, channel.id, members));
    }
    if let Some(cursor) = next_cursor {
        out.push_str(&format!("More available; pass cursor {cursor}\n"));
    }
    out
}

fn render_history(channel_id: &str, messages: &[Message]) -> String {
    if messages.is_empty() {
        return format!("No recent messages in {channel_id}.");
    }
    let mut out = format!("{} messages from {channel_id}:\n", messages.len());
    for message in messages {
        out.push_str(&format!(
            "[{}] {}: {}\n",
            message.ts,
            message.user.as_deref().unwrap_or("unknown"),
            message.text
        ));
    }
    out
}

fn render_users(members: &[Member], next_cursor: Option<&str>) -> String {
    let visible: Vec<&Member> = members.iter().filter(|m| !m.deleted).collect();
    if visible.is_empty() {
        return "No users visible to this token.".to_string();
    }
    let mut out = format!("{} users:\n", visible.len());
    for member in visible {
        let kind = if member.is_bot { " (bot)" } else { "" };
        match &member.real_name {
            Some(real_name) => out.push_str(&format!(
                "{} — {} ({}){}\n",
                member.id, member.name, real_name, kind
            )),
            None => out.push_str(&format!("{} — {}{}\n", member.id, member.name, kind)),
        }
    }
    if let Some(cursor) = next_cursor {
        out.push_str(&format!("More available; pass cursor {cursor}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_and_schemas() {
        let tools = catalog();
        assert_eq!(tools.len(), 5);

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"slack_post_message"));
        assert!(names.contains(&"slack_search_messages"));

        // Every descriptor carries a JSON schema object
        for tool in &tools {
            assert!(tool.input_schema.is_object(), "{} schema", tool.name);
        }
    }

    #[test]
    fn test_envelope_serialization() {
        let ok = serde_json::to_value(ToolResult::text("hi")).unwrap();
        assert_eq!(ok["content"][0]["type"], "text");
        assert_eq!(ok["content"][0]["text"], "hi");
        assert!(ok.get("isError").is_none());

        let err = serde_json::to_value(ToolResult::error("boom")).unwrap();
        assert_eq!(err["isError"], true);
    }

    #[test]
    fn test_query_terms_drop_short_words() {
        assert_eq!(query_terms("fix CI on main"), vec!["fix", "main"]);
        assert!(query_terms("a of to").is_empty());
    }

    #[test]
    fn test_message_matches_is_case_insensitive_substring() {
        let terms = query_terms("Deploy failed");
        assert!(message_matches("The DEPLOY went out at noon", &terms));
        assert!(message_matches("tests failed again", &terms));
        assert!(!message_matches("all green", &terms));
        assert!(!message_matches("anything", &[]));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_client_error_envelope() {
        let dispatcher = ToolDispatcher::new();
        let result = dispatcher
            .dispatch("slack_reverse_entropy", &serde_json::json!({}), "xoxp-x")
            .await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.contains("Unknown tool"));
    }
}
