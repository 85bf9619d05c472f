use eyre::Context;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use youtube_metadata::config::Config;
use youtube_metadata::routes::{API_PREFIX, AppState, app};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // a missing .env is fine; the real environment may carry everything
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let config = Config::from_env().context("load configuration")?;
    let state = AppState::from_config(&config)
        .await
        .context("initialize service")?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("bind port {}", config.port))?;
    tracing::info!(
        addr = %listener.local_addr().context("read bound address")?,
        prefix = API_PREFIX,
        concurrency = config.bulk_concurrency,
        "listening"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("serve HTTP")?;
    Ok(())
}
