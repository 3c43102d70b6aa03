use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use figure_studio::{AppConfig, AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    init_tracing();
    if !dotenv_loaded {
        tracing::debug!("no .env file found, using process environment");
    }

    let config = Arc::new(AppConfig::from_env()?);
    if !config.missing.is_empty() {
        tracing::warn!(missing = ?config.missing, "starting with partial configuration");
    }
    tracing::info!(
        ?config.listen_addr,
        timeout = ?config.request_timeout,
        upstream_timeout = ?config.upstream_timeout,
        "configuration loaded"
    );

    let state = AppState::from_config(config.clone())?;
    let router = build_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,axum::rejection=trace".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
