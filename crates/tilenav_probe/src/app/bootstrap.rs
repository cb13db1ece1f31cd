use std::path::PathBuf;

use thiserror::Error;
use tilenav::{ConfigError, GraphConfig, NavGrid, CONFIG_ENV_VAR};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub(crate) struct ProbeWiring {
    pub(crate) grid: NavGrid,
}

#[derive(Debug, Error)]
pub(crate) enum ProbeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(crate) fn build_probe() -> Result<ProbeWiring, ProbeError> {
    init_tracing();
    info!("=== tilenav probe ===");

    let config = match config_path_from_env() {
        Some(path) => {
            info!(path = %path.display(), "config_loading");
            GraphConfig::load(&path)?
        }
        None => GraphConfig::default(),
    };
    info!(
        chunk_size = config.chunk_size,
        tracked_layers = %config.tracked_layers,
        "config_resolved"
    );

    Ok(ProbeWiring {
        grid: NavGrid::new(config)?,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}
