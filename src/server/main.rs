use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use zonewatch::alert::AlertConfig;
use zonewatch::logger::init_logger_exe;
use zonewatch::DetectionConfig;
use zonewatch_tools::database::ZoneMaskCache;
use zonewatch_tools::service::{app, AppState, DEFAULT_MAX_BODY_BYTES};

fn load_state() -> Result<AppState> {
    let defaults = match std::env::var("ZONEWATCH_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            DetectionConfig::from_json(&json)?
        }
        Err(_) => DetectionConfig::default(),
    };

    let cache = match std::env::var("ZONEWATCH_CACHE_DB") {
        Ok(path) if path == "off" => None,
        Ok(path) => Some(ZoneMaskCache::open(path)?),
        Err(_) => Some(ZoneMaskCache::open_default()?),
    };

    let artifact_dir = match std::env::var("ZONEWATCH_ARTIFACT_DIR") {
        Ok(dir) => {
            let dir = PathBuf::from(dir);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create artifact directory {}", dir.display()))?;
            Some(dir)
        }
        Err(_) => None,
    };

    let max_body_bytes = match std::env::var("ZONEWATCH_MAX_BODY_BYTES") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid ZONEWATCH_MAX_BODY_BYTES: {}", value))?,
        Err(_) => DEFAULT_MAX_BODY_BYTES,
    };

    Ok(AppState {
        defaults,
        cache,
        alerts: AlertConfig::from_env(),
        artifact_dir,
        max_body_bytes,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger_exe();

    log::info!("Starting server...");

    let state = load_state()?;
    if let Some(cache) = &state.cache {
        log::info!("Zone mask cache at {}", cache.path().display());
    }
    log::debug!("Default detection config: {:?}", state.defaults);

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .context("PORT must be a valid port number")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Attempting to bind to port {}", port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    log::info!("Successfully bound to http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::warn!("Ctrl-C received, stopping...");
        })
        .await?;

    log::info!("Exiting...");
    Ok(())
}
