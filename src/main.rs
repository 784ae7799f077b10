use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use creative_writer::config::Config;
use creative_writer::gemini::GeminiClient;
use creative_writer::history::{FileStorage, HistoryStore};
use creative_writer::routes::{router, AppState};
use creative_writer::session::{SessionFlags, Writer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    let storage = FileStorage::new(&config.history_dir);
    tracing::info!("History directory: {}", storage.dir().display());

    let gemini = GeminiClient::new(config.api_key.clone(), config.api_base.clone(), config.model.clone());
    tracing::info!("Model: {}", gemini.model());

    let history = Arc::new(HistoryStore::open(Arc::new(storage)));
    // A fresh process is a fresh session, so the welcome has not been shown yet.
    let writer = Arc::new(Writer::new(Arc::new(gemini), history, SessionFlags::default()));
    let app = router(AppState::new(writer));

    // Single-user local host; bind loopback only.
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
