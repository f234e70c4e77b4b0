//! wardrobe-closet - wardrobe catalog service
//!
//! Serves the catalog API and stored images, stores uploads with their tags
//! and asks a generative service for outfit suggestions.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use wardrobe_closet::background::{BackgroundRemover, RemoveBgClient};
use wardrobe_closet::lifecycle::Closet;
use wardrobe_closet::stylist::{GeminiClient, Stylist};
use wardrobe_closet::{build_router, AppState};
use wardrobe_common::config::{
    load_toml_config, resolve_api_key, resolve_root_folder, RootLayout, TomlConfig,
    ENV_GEMINI_API_KEY, ENV_REMOVE_BG_API_KEY,
};

/// Command-line arguments for wardrobe-closet
#[derive(Parser, Debug)]
#[command(name = "wardrobe-closet")]
#[command(about = "Wardrobe catalog and outfit suggestion service")]
#[command(version)]
struct Args {
    /// Folder holding metadata.csv and wardrobe_images/
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "WARDROBE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1", env = "WARDROBE_BIND")]
    bind: String,

    /// TOML config file
    #[arg(short, long, env = "WARDROBE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise start at info and switch to the configured level
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| default_filter("info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_toml_config(args.config.as_deref()).context("Failed to load config")?;

    if !filter_from_env {
        filter_handle
            .reload(default_filter(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!(
        "Starting wardrobe-closet v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    info!("Root folder: {}", root_folder.display());

    let layout = RootLayout::new(root_folder);
    let closet = Closet::open(layout).context("Failed to prepare root folder")?;
    info!("Metadata table: {}", closet.layout().table_path().display());
    info!("Image folder: {}", closet.layout().image_dir().display());

    match closet.load() {
        Ok(catalog) => info!("Catalog holds {} items", catalog.len()),
        Err(e) => warn!("Catalog could not be read yet: {}", e),
    }

    let stylist = build_stylist(&config);
    let mut state = AppState::new(closet, stylist).with_max_upload_bytes(config.max_upload_bytes);
    if let Some(remover) = build_background_remover(&config) {
        state = state.with_background(remover);
    }

    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", args.bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("wardrobe-closet listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "wardrobe_closet={level},wardrobe_common={level},tower_http={level}",
        level = level
    ))
}

fn build_stylist(config: &TomlConfig) -> Stylist {
    let Some(api_key) = resolve_api_key(ENV_GEMINI_API_KEY, config.stylist.api_key.as_deref())
    else {
        warn!(
            "No {} configured; outfit suggestions are disabled",
            ENV_GEMINI_API_KEY
        );
        return Stylist::disabled();
    };

    match GeminiClient::new(
        api_key,
        config.stylist.model.clone(),
        Duration::from_secs(config.stylist.timeout_secs),
        config.stylist.structured_output,
    ) {
        Ok(client) => {
            info!(
                model = %client.model(),
                structured = config.stylist.structured_output,
                "✓ Outfit suggestions enabled"
            );
            Stylist::new(Arc::new(client))
        }
        Err(e) => {
            error!("Failed to create generative client: {}", e);
            Stylist::disabled()
        }
    }
}

fn build_background_remover(config: &TomlConfig) -> Option<Arc<dyn BackgroundRemover>> {
    let api_key = resolve_api_key(ENV_REMOVE_BG_API_KEY, config.background.api_key.as_deref())?;

    match RemoveBgClient::new(api_key, Duration::from_secs(config.background.timeout_secs)) {
        Ok(client) => {
            info!("✓ Background removal enabled");
            Some(Arc::new(client))
        }
        Err(e) => {
            error!("Failed to create background removal client: {}", e);
            None
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
