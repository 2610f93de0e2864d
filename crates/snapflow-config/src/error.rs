use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Snapshot file not found. Looked in:\n\
        - current directory: snapflow.local.kdl, .snapflow.local.kdl, snapflow.kdl, .snapflow.kdl\n\
        - ./.snapflow/\n\
        - ~/.config/snapflow/snapflow.kdl\n\
        Set SNAPFLOW_CONFIG_PATH to point at a file directly"
    )]
    SnapshotFileNotFound,

    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid duration for {key}: {value}")]
    InvalidDuration { key: String, value: String },

    #[error("Snapshot '{0}' is declared more than once")]
    DuplicateSnapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
