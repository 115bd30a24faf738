use std::{net::SocketAddr, path::PathBuf};

use backend::{config::ServerConfig, create_router, AppState};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(author, version, about = "AtlasGo places API")]
struct Args {
    /// Listen address, overrides ATLASGO_BIND
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Mock dataset, overrides MOCK_DATA_FILE
    #[arg(long)]
    mock_data: Option<PathBuf>,
    /// Serve mock data only, never query Overpass
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(path) = args.mock_data {
        config.mock_data_file = path;
    }
    if args.offline {
        config.overpass_url = None;
    }

    let state = AppState::from_config(&config)?;
    match &config.overpass_url {
        Some(url) => tracing::info!("overpass provider: {url}"),
        None => tracing::info!("overpass disabled, serving mock data only"),
    }
    let app = create_router(state);

    tracing::info!("starting backend on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
