//! Headless update session host for stdin/stdout communication.
//!
//! Runs an update session against the simulated provider. Commands
//! (`check`, `check-silent`, `download`, `install`, `status`, `quit`) are
//! read one per line from stdin; replies and snapshots are written to stdout
//! as newline-delimited JSON.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.
//!
//! Usage: `update-session-host [CONFIG_PATH]`. Without a path the default
//! config location is used if it exists.

use std::path::PathBuf;
use std::sync::Arc;
use update_session::UpdateConfig;
use update_session::host::stdio::run_stdio_host;
use update_session::update::SimulatedProvider;

fn load_config(path: Option<PathBuf>) -> anyhow::Result<UpdateConfig> {
    match path {
        Some(path) => UpdateConfig::from_file(&path)
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {e}", path.display())),
        None => {
            let default_path = UpdateConfig::default_config_path();
            if default_path.exists() {
                tracing::info!(path = %default_path.display(), "loading config");
                UpdateConfig::from_file(&default_path).map_err(|e| {
                    anyhow::anyhow!("failed to load config {}: {e}", default_path.display())
                })
            } else {
                Ok(UpdateConfig::default())
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config(std::env::args_os().nth(1).map(PathBuf::from))?;
    tracing::info!(auto_check = config.auto_check, "update-session-host starting");

    run_stdio_host(Arc::new(SimulatedProvider::default()), config)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "update-session-host exited with error");
            anyhow::anyhow!("update-session-host failed: {e}")
        })?;

    tracing::info!("update-session-host shut down cleanly");
    Ok(())
}
