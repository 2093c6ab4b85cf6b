//! Clinical Calculators HTTP Server
//!
//! Serves the JSON API and the documentation browser.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p calc_web --bin calc-server
//!
//! # With a settings file
//! CLINICAL_CALCULATORS_CONFIG=calculators.toml cargo run -p calc_web --bin calc-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8000)
//! - `CLINICAL_CALCULATORS_CONFIG`: TOML settings file
//! - `RUST_LOG`: Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use calc_core::{Registry, Settings};
use calc_web::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Clinical Calculators server");

    let settings = Settings::load().context("failed to load settings")?;
    let registry = Arc::new(Registry::builtin(&settings));
    info!(calculators = registry.names().count(), "registry initialized");
    for name in registry.unregistered_docs() {
        warn!(doc = %name, "documentation file has no registered calculator");
    }

    if settings.dependencies.resolve_on_startup {
        let resolving = Arc::clone(&registry);
        let failures = tokio::task::spawn_blocking(move || resolving.resolve_all()).await?;
        if !failures.is_empty() {
            for (name, e) in &failures {
                error!(calculator = %name, error = %e, "dependency resolution failed");
            }
            bail!(
                "dependencies could not be resolved for: {}",
                failures
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        info!("calculator dependencies resolved");
    }

    let app = create_router(AppState::new(registry));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid HOST/PORT")?;

    info!("Server listening on http://{}", addr);
    info!("Documentation browser: http://{}/docs", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
