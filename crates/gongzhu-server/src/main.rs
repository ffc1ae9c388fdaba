use gongzhu_server::{GameServer, ServerConfig, ServerError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading configuration");
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };

    GameServer::bind(config).await?.run().await;
    Ok(())
}
