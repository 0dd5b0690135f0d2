//! Shared constants: key namespaces, credential shapes, protocol values

/// Store namespace for user records (`user:<id>`)
pub const KEY_PREFIX_USER: &str = "user:";

/// Store namespace for api-key → user-id index entries (`apikey:<key>`)
pub const KEY_PREFIX_API_KEY: &str = "apikey:";

/// Store namespace for platform-token → user-id dedupe index (`token:<token>`)
pub const KEY_PREFIX_TOKEN: &str = "token:";

/// Store namespace for in-flight authorization codes (`oauth_code:<code>`)
pub const KEY_PREFIX_OAUTH_CODE: &str = "oauth_code:";

/// Counter of all registrations ever made
pub const KEY_STATS_TOTAL_USERS: &str = "stats:total_users";

/// Counter of currently active registrations
pub const KEY_STATS_ACTIVE_USERS: &str = "stats:active_users";

/// Authorization codes live this long between the connect page and exchange
pub const OAUTH_CODE_TTL_SECS: u64 = 600;

/// Slack user tokens carry this prefix
pub const PLATFORM_TOKEN_PREFIX: &str = "xoxp-";

/// Minimum plausible Slack user token length (format check only)
pub const PLATFORM_TOKEN_MIN_LEN: usize = 20;

/// Bridge-issued api keys carry this prefix
pub const API_KEY_PREFIX: &str = "smcp_";

/// Random bytes behind each api key (hex-encoded to 64 chars)
pub const API_KEY_BYTES: usize = 32;

/// Illustrative `expires_in` returned by the token endpoint; the underlying
/// credential does not expire on this schedule
pub const ACCESS_TOKEN_EXPIRES_IN: u64 = 31_536_000;

/// Scope string advertised by the OAuth surface
pub const OAUTH_SCOPES: &str = "slack:read slack:write";

/// MCP protocol revision answered to `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name answered to `initialize`
pub const MCP_SERVER_NAME: &str = "slackbridge";
