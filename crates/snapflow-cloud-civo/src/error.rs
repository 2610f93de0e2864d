//! Civo client error types

use snapflow_cloud::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CivoError {
    #[error("Environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Civo API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CivoError {
    /// Whether the same request may succeed when retried
    pub fn is_transient(&self) -> bool {
        match self {
            CivoError::ApiError { status, .. } => *status == 429 || *status >= 500,
            CivoError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

impl From<CivoError> for ClientError {
    fn from(err: CivoError) -> Self {
        match err {
            CivoError::SnapshotNotFound(id) => ClientError::NotFound(id),
            CivoError::ApiError { status: 404, message } => ClientError::NotFound(message),
            e if e.is_transient() => ClientError::Transient(e.to_string()),
            e => ClientError::Rejected(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CivoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let not_found: ClientError = CivoError::ApiError {
            status: 404,
            message: "database_snapshot_not_found".into(),
        }
        .into();
        assert!(not_found.is_not_found());

        let throttled: ClientError = CivoError::ApiError {
            status: 429,
            message: "too many requests".into(),
        }
        .into();
        assert!(throttled.is_transient());

        let server: ClientError = CivoError::ApiError {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert!(server.is_transient());

        let forbidden: ClientError = CivoError::ApiError {
            status: 403,
            message: "quota".into(),
        }
        .into();
        assert!(matches!(forbidden, ClientError::Rejected(_)));
    }

    #[test]
    fn test_config_errors_are_rejections() {
        let err: ClientError = CivoError::MissingEnvVar("CIVO_TOKEN".into()).into();
        assert!(matches!(err, ClientError::Rejected(_)));
    }
}
