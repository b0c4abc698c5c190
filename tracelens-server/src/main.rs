use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use tracelens_core::config::Config;
use tracelens_core::state::AppState;

mod api;

#[derive(Parser)]
#[command(name = "tracelens-server", about = "Stack trace analysis service")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "tracelens.toml")]
    config: PathBuf,
}

fn load_config(path: &Path) -> Result<Config, String> {
    if path.exists() {
        Config::from_file(path)
    } else {
        log::warn!("{} not found, using default configuration", path.display());
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let addr = config.bind_address();
    let generation = match &config.generation {
        Some(g) => format!("{} ({})", g.model, g.endpoint),
        None => "not configured".to_string(),
    };

    let state = AppState::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    let embedder = state.embedder().model_name().to_string();
    let dimension = state.retriever.dimension();
    let llm_ready = state.analyzer.provider().is_some();

    let app = api::router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to bind to {addr}: {e}");
            std::process::exit(1);
        });

    log::info!("tracelens server started");
    log::info!("  address:    http://{addr}");
    log::info!("  embedder:   {embedder} ({dimension} dims)");
    log::info!("  generation: {generation}");
    if !llm_ready {
        log::warn!("no LLM API key available, /analyze will return the fallback message");
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("Error: server error: {e}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        log::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}
