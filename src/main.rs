//! Skylapse — service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at configured level
//!   4. Serve until ctrl-c

use tokio_util::sync::CancellationToken;
use tracing::info;

use skylapse::{config, error::AppError, logger, server};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::parse_level(&config.log_level)?;
    logger::init(&config.log_level)?;

    info!(
        bind = %config.server.bind,
        wms_url = %config.wms.url,
        layer = %config.wms.layer,
        video_dir = %config.video.dir.display(),
        "config loaded"
    );

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            token.cancel();
        }
    });

    server::serve(config, shutdown).await
}
