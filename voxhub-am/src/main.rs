//! VoxHub Audio Manager - main entry point
//!
//! Serializes playback of speech and chime clips from many concurrent
//! client sessions onto the one shared output device, exposing an HTTP
//! control surface for reserve/fill/wait and player control.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxhub_am::api::{self, AppContext};
use voxhub_am::config::Config;
use voxhub_am::playback::{AudioSink, CpalPlayer, Dispatcher};
use voxhub_am::queue::{ChimeLimiter, CompletionTracker, ReservationQueue};
use voxhub_am::state::SharedState;

/// Command-line arguments for voxhub-am
#[derive(Parser, Debug)]
#[command(name = "voxhub-am")]
#[command(about = "VoxHub audio manager daemon")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "VOXHUB_PORT")]
    port: Option<u16>,

    /// Path to the TOML configuration file
    #[arg(short, long, env = "VOXHUB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_path) =
        Config::load(args.config.clone()).context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the config file level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("voxhub_am={},tower_http=warn", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No configuration file found, using built-in defaults"),
    }

    let port = args.port.unwrap_or(config.port);
    info!("Starting VoxHub audio manager on port {}", port);

    // Assemble the coordination core
    let config = Arc::new(config);
    let state = Arc::new(SharedState::new());
    let queue = Arc::new(ReservationQueue::new(
        config.queue.max_pending,
        config.reservation_ttl(),
    ));
    let tracker = Arc::new(CompletionTracker::new(
        config.tracker_grace(),
        config.completed_retention(),
    ));
    let chime = Arc::new(ChimeLimiter::new(config.chime_cooldown()));
    let sink: Arc<dyn AudioSink> = Arc::new(CpalPlayer::new(config.audio.device.clone()));

    // Single dispatch loop; the only component that starts playback
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        Arc::clone(&tracker),
        Arc::clone(&sink),
        Arc::clone(&state),
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(shutdown_rx));
    info!("Dispatcher started");

    // Build the application router
    let ctx = AppContext {
        queue: Arc::clone(&queue),
        tracker,
        sink: Arc::clone(&sink),
        chime,
        state,
        config,
    };
    let app = api::create_router(ctx);

    // Local-only service; sessions on this machine are the only clients
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Drain: refuse new reservations, cut the current clip, stop the loop
    queue.close();
    sink.stop();
    let _ = shutdown_tx.send(true);
    let _ = dispatcher_handle.await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
