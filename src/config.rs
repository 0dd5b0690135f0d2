//! Runtime configuration
//!
//! Everything comes from the environment; unset values fall back to
//! development defaults. `REDIS_URL` is the one deliberate exception: when it
//! is absent the binary runs against the in-memory store instead of failing.

use std::net::SocketAddr;

/// Bridge configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// Externally reachable base URL, used when building redirect URLs
    pub public_base_url: String,

    /// Redis connection URL; `None` selects the in-memory store
    pub redis_url: Option<String>,

    /// Client id advertised by the OAuth discovery document
    pub oauth_client_id: String,
}

impl Config {
    /// Load configuration from the environment
    pub fn from_env() -> crate::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| crate::BridgeError::internal("PORT must be a number"))?;

        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| crate::BridgeError::internal(format!("invalid bind address: {e}")))?;

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let redis_url = std::env::var("REDIS_URL").ok();

        let oauth_client_id =
            std::env::var("OAUTH_CLIENT_ID").unwrap_or_else(|_| "slackbridge".to_string());

        Ok(Self {
            bind_addr,
            public_base_url,
            redis_url,
            oauth_client_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Run with a clean slate for the variables we read
        for key in ["HOST", "PORT", "PUBLIC_BASE_URL", "REDIS_URL", "OAUTH_CLIENT_ID"] {
            std::env::remove_var(key);
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.public_base_url, "http://localhost:8080");
        assert!(config.redis_url.is_none());
        assert_eq!(config.oauth_client_id, "slackbridge");
    }
}
