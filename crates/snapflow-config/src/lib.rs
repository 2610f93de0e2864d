pub mod error;
pub mod parser;

pub use error::*;
pub use parser::{Settings, SnapshotFile, load_snapshot_file, parse_snapshot_file};

use std::path::PathBuf;

const CANDIDATES: [&str; 4] = [
    "snapflow.local.kdl",
    ".snapflow.local.kdl",
    "snapflow.kdl",
    ".snapflow.kdl",
];

/// snapflow's config directory, created on first use
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("snapflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locate the snapshot declaration file
///
/// Search order:
/// 1. `SNAPFLOW_CONFIG_PATH` environment variable
/// 2. current directory: snapflow.local.kdl, .snapflow.local.kdl, snapflow.kdl, .snapflow.kdl
/// 3. `./.snapflow/` with the same names
/// 4. `~/.config/snapflow/snapflow.kdl`
pub fn find_snapshot_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("SNAPFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "SNAPFLOW_CONFIG_PATH points at a missing file: {}",
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let snapflow_dir = current_dir.join(".snapflow");
    if snapflow_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = snapflow_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("snapflow").join("snapflow.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::SnapshotFileNotFound)
}
