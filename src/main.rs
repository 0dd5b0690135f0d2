//! Bridge server binary

use slackbridge::config::Config;
use slackbridge::http::{router, template::TemplateRenderer, AppState};
use slackbridge::oauth::OauthExchange;
use slackbridge::registry::UserRegistry;
use slackbridge::slack::SlackValidator;
use slackbridge::store::{KvStore, MemoryKv, RedisKv};
use slackbridge::tools::ToolDispatcher;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> slackbridge::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Arc::new(Config::from_env()?);

    let store: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisKv::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory store (data is lost on restart)");
            Arc::new(MemoryKv::new())
        }
    };

    let state = AppState {
        registry: UserRegistry::new(Arc::clone(&store)),
        exchange: OauthExchange::new(
            Arc::clone(&store),
            format!("{}/connect", config.public_base_url),
        ),
        dispatcher: ToolDispatcher::new(),
        validator: Arc::new(SlackValidator::new()),
        config: Arc::clone(&config),
        templates: Arc::new(TemplateRenderer::new()?),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| slackbridge::BridgeError::internal(format!("bind failed: {e}")))?;
    tracing::info!(addr = %config.bind_addr, "Slack MCP bridge listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| slackbridge::BridgeError::internal(format!("server error: {e}")))
}
