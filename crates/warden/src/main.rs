//! # Warden - CAPTCHA gate for nginx `auth_request`
//!
//! Serves a challenge page, trades solved challenges for a cookie and answers
//! the proxy's per-request authentication subrequests.
//!
//! ## Architecture
//! ```text
//! Client → Nginx ──auth_request──→ Warden /auth
//!            │  401 → Warden /  (challenge, answer)
//!            └→ Backend
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt, fmt::writer::MakeWriterExt, prelude::*};

mod captcha;
mod config;
mod listener;
mod render;
mod routes;
mod state;
mod store;

use captcha::{GlyphRenderer, Pool, generate_pool_file};
use config::AppConfig;
use listener::{Bound, ListenAddr};
use render::Pages;
use state::AppState;
use store::sweeper_worker;

/// Warden - CAPTCHA gate for nginx auth_request
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/warden.toml", env = "WARDEN_CONFIG")]
    config: String,

    /// Listen address, `host:port` or `unix:/path` (overrides config)
    #[arg(short, long, env = "WARDEN_ADDRESS")]
    address: Option<String>,

    /// CAPTCHA pool file (overrides config)
    #[arg(long, env = "WARDEN_DB")]
    db: Option<PathBuf>,

    /// Generate a pool of N CAPTCHAs into --db and exit (0 disables)
    #[arg(long, default_value_t = 0, env = "WARDEN_GENERATE")]
    generate: usize,

    /// TrueType font for --generate (overrides config)
    #[arg(long, env = "WARDEN_FONT")]
    font: Option<PathBuf>,

    /// Prefix log lines with date and time
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "WARDEN_LOG_DATE_TIME")]
    log_date_time: bool,

    /// Enable debug logging
    #[arg(long, env = "WARDEN_DEBUG")]
    debug: bool,

    /// Enable JSON logging output
    #[arg(long, env = "WARDEN_JSON_LOGS")]
    json_logs: bool,
}

#[cfg(test)]
impl Args {
    fn for_tests() -> Self {
        Self::parse_from(["warden"])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.debug, args.log_date_time, args.json_logs)?;

    info!("🛡️ Starting Warden v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    if args.generate > 0 {
        let generated = GlyphRenderer::from_file(&config.font_path)
            .and_then(|renderer| generate_pool_file(&config.db_path, args.generate, &renderer));
        match generated {
            Ok(pool) => {
                info!("✅ Wrote {} CAPTCHAs to {}", pool.len(), config.db_path.display());
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, path = %config.db_path.display(), "CAPTCHA generation failed");
                std::process::exit(1);
            }
        }
    }

    let pool = Pool::load(&config.db_path)
        .with_context(|| format!("Failed to load CAPTCHA pool {}", config.db_path.display()))
        .inspect_err(|e| error!("{e:#}"))?;
    info!("🎯 Loaded {} CAPTCHAs from {}", pool.len(), config.db_path.display());

    let pages = Pages::new()
        .context("Failed to parse page templates")
        .inspect_err(|e| error!("{e:#}"))?;

    let addr = ListenAddr::parse(&config.address)?;
    let sweep_interval = config.sweep_interval();

    // Initialize application state
    let state = AppState::new(config, pool, pages);

    // Spawn expired record sweeper
    tokio::spawn(sweeper_worker(state.records.clone(), sweep_interval));

    // Build router
    let app = routes::create_router(state);

    // Start server
    let bound = Bound::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))
        .inspect_err(|e| error!("{e:#}"))?;
    info!("🚀 Warden listening on {}", addr);

    bound
        .serve(app, shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Warden shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("🛑 Shutdown signal received");
}

/// Initialize structured logging with tracing.
///
/// ERROR goes to stderr, everything else to stdout. Failed challenge
/// answers are also logged under the `bot` target.
fn init_logging(debug: bool, with_time: bool, json: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let writer = std::io::stderr
        .with_max_level(Level::ERROR)
        .or_else(std::io::stdout);

    let registry = tracing_subscriber::registry().with(filter);
    match (json, with_time) {
        (true, true) => registry.with(fmt::layer().json().with_writer(writer)).try_init(),
        (true, false) => registry
            .with(fmt::layer().json().without_time().with_writer(writer))
            .try_init(),
        (false, true) => registry
            .with(fmt::layer().with_target(true).with_writer(writer))
            .try_init(),
        (false, false) => registry
            .with(fmt::layer().with_target(true).without_time().with_writer(writer))
            .try_init(),
    }
    .context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = Args::for_tests();
        assert_eq!(args.config, "config/warden.toml");
        assert_eq!(args.generate, 0);
        assert!(args.log_date_time);
        assert!(!args.debug);
        assert!(args.address.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let args = Args::parse_from([
            "warden",
            "--address",
            "127.0.0.1:8080",
            "--db",
            "/tmp/pool.db",
            "--generate",
            "500",
            "--log-date-time",
            "false",
            "--debug",
        ]);
        assert_eq!(args.address.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(args.db, Some(PathBuf::from("/tmp/pool.db")));
        assert_eq!(args.generate, 500);
        assert!(!args.log_date_time);
        assert!(args.debug);
    }
}
