use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::CollisionMask;

pub const DEFAULT_CHUNK_SIZE: u32 = 8;
pub const MIN_CHUNK_SIZE: u32 = 2;
pub const MAX_CHUNK_SIZE: u32 = 256;

/// Graph-wide settings, threaded into [`crate::NavGrid::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Edge length of every chunk, in tiles.
    pub chunk_size: u32,
    /// Collision layers that make an entity relevant to the graph at all.
    pub tracked_layers: CollisionMask,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            tracked_layers: CollisionMask::ALL,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("chunk_size must be between {min} and {max}, got {chunk_size}")]
    InvalidChunkSize { chunk_size: u32, min: u32, max: u32 },
}

impl GraphConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: GraphConfig = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |error| {
                let path = error.path().to_string();
                ConfigError::Parse {
                    path,
                    source: error.into_inner(),
                }
            },
        )?;
        config.validate()?;
        if config.tracked_layers.is_empty() {
            warn!("tracked_layers is empty; no entity will block or occupy tiles");
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(ConfigError::InvalidChunkSize {
                chunk_size: self.chunk_size,
                min: MIN_CHUNK_SIZE,
                max: MAX_CHUNK_SIZE,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = GraphConfig::from_json_str("{}").expect("config");
        assert_eq!(config, GraphConfig::default());
    }

    #[test]
    fn tracked_layers_accept_index_list() {
        let config = GraphConfig::from_json_str(r#"{ "chunk_size": 16, "tracked_layers": [0, 3] }"#)
            .expect("config");
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.tracked_layers, CollisionMask(0b1001));
    }

    #[test]
    fn parse_error_reports_field_path() {
        let error = GraphConfig::from_json_str(r#"{ "chunk_size": "eight" }"#)
            .expect_err("bad chunk size type");
        match error {
            ConfigError::Parse { path, .. } => assert_eq!(path, "chunk_size"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            GraphConfig::from_json_str(r#"{ "chunk_szie": 8 }"#),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn chunk_size_is_validated() {
        let error = GraphConfig::from_json_str(r#"{ "chunk_size": 1 }"#).expect_err("too small");
        assert!(matches!(
            error,
            ConfigError::InvalidChunkSize { chunk_size: 1, .. }
        ));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("tilenav.json");
        fs::write(&path, r#"{ "tracked_layers": 6 }"#).expect("write config");

        let config = GraphConfig::load(&path).expect("load");
        assert_eq!(config.tracked_layers, CollisionMask(0b0110));
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);

        let missing = GraphConfig::load(&temp.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }
}
