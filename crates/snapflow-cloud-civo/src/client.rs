//! Civo snapshot API client
//!
//! Direct Civo v2 API implementation of [`RemoteClient`].
//! Uses Bearer token authentication.

use crate::error::{CivoError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapflow_cloud::{ClientResult, RemoteClient, RemoteSnapshot, SnapshotRequest, SnapshotState};

const CIVO_API_BASE: &str = "https://api.civo.com";
const DEFAULT_REGION: &str = "LON1";

/// Civo API client
pub struct CivoClient {
    client: reqwest::Client,
    api_key: String,
    region: String,
    api_url: String,
}

/// Configuration for the Civo client
#[derive(Debug, Clone)]
pub struct CivoConfig {
    pub api_key: String,
    pub region: String,
    pub api_url: String,
}

impl CivoConfig {
    pub fn new(api_key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            region: region.into(),
            api_url: CIVO_API_BASE.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Create CivoConfig from environment variables
    ///
    /// `CIVO_TOKEN` is required; `CIVO_REGION` and `CIVO_API_URL` fall back
    /// to `LON1` and the public endpoint.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CIVO_TOKEN")
            .map_err(|_| CivoError::MissingEnvVar("CIVO_TOKEN".to_string()))?;
        let region = std::env::var("CIVO_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let api_url = std::env::var("CIVO_API_URL").unwrap_or_else(|_| CIVO_API_BASE.to_string());

        Ok(Self {
            api_key,
            region,
            api_url,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(CivoError::InvalidConfig("API key is empty".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(CivoError::InvalidConfig("region is empty".to_string()));
        }
        Ok(())
    }
}

impl CivoClient {
    /// Create a new client
    pub fn new(config: CivoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.api_key,
            region: config.region,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Create (or overwrite) a snapshot named `name`
    pub async fn create_snapshot(
        &self,
        name: &str,
        request: &SnapshotRequest,
    ) -> Result<RemoteSnapshot> {
        let url = format!("{}/v2/snapshots/{}", self.api_url, name);

        let request_body = CreateSnapshotRequest {
            instance_id: request.source_id.clone(),
            safe: request.safe_mode,
            cron_timing: request.schedule.clone(),
            region: self.region.clone(),
        };

        tracing::debug!("PUT {} (instance {})", url, request.source_id);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .query(&[("region", self.region.as_str())])
            .json(&request_body)
            .send()
            .await?;

        let snapshot: ApiSnapshot = check(response).await?.json().await?;
        Ok(snapshot.into())
    }

    /// List all snapshots in the region
    pub async fn list_snapshots(&self) -> Result<Vec<RemoteSnapshot>> {
        let url = format!("{}/v2/snapshots", self.api_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("region", self.region.as_str())])
            .send()
            .await?;

        let snapshots: Vec<ApiSnapshot> = check(response).await?.json().await?;
        Ok(snapshots.into_iter().map(RemoteSnapshot::from).collect())
    }

    /// Find a snapshot by id, falling back to an exact name match
    pub async fn find_snapshot(&self, search: &str) -> Result<RemoteSnapshot> {
        let snapshots = self.list_snapshots().await?;

        if let Some(found) = snapshots.iter().find(|s| s.id == search) {
            return Ok(found.clone());
        }

        snapshots
            .into_iter()
            .find(|s| s.name == search)
            .ok_or_else(|| CivoError::SnapshotNotFound(search.to_string()))
    }

    /// Delete a snapshot
    pub async fn delete_snapshot(&self, id: &str) -> Result<()> {
        let url = format!("{}/v2/snapshots/{}", self.api_url, id);

        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .query(&[("region", self.region.as_str())])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for CivoClient {
    fn name(&self) -> &str {
        "civo"
    }

    async fn create(&self, name: &str, request: &SnapshotRequest) -> ClientResult<RemoteSnapshot> {
        Ok(self.create_snapshot(name, request).await?)
    }

    async fn find(&self, id: &str) -> ClientResult<RemoteSnapshot> {
        Ok(self.find_snapshot(id).await?)
    }

    async fn delete(&self, id: &str) -> ClientResult<()> {
        Ok(self.delete_snapshot(id).await?)
    }
}

/// Turn non-2xx responses into [`CivoError::ApiError`]
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|e| e.reason.or(e.code))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.trim().to_string()
            }
        });

    Err(CivoError::ApiError {
        status: status.as_u16(),
        message,
    })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSnapshot {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    instance_id: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    template_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    safe: i64,
    #[serde(default)]
    size_gb: i64,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    cron_timing: Option<String>,
    #[serde(default)]
    requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl From<ApiSnapshot> for RemoteSnapshot {
    fn from(s: ApiSnapshot) -> Self {
        Self {
            id: s.id,
            name: s.name.unwrap_or_default(),
            instance_id: s.instance_id.unwrap_or_default(),
            hostname: s.hostname.unwrap_or_default(),
            template_id: s.template_id.unwrap_or_default(),
            region: s.region.unwrap_or_default(),
            size_gb: s.size_gb,
            safe: s.safe,
            state: s
                .state
                .as_deref()
                .map(SnapshotState::parse)
                .unwrap_or_default(),
            cron_timing: s.cron_timing.unwrap_or_default(),
            requested_at: s.requested_at.filter(is_set),
            completed_at: s.completed_at.filter(is_set),
        }
    }
}

/// The API reports unset timestamps as the zero time (year 1)
fn is_set(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() > 0
}

#[derive(Debug, Serialize)]
struct CreateSnapshotRequest {
    instance_id: String,
    safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cron_timing: Option<String>,
    region: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use snapflow_cloud::ClientError;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CivoClient {
        CivoClient::new(CivoConfig::new("test-key", "LON1").with_api_url(server.uri())).unwrap()
    }

    fn snapshot_json(id: &str, name: &str, state: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "instance_id": "i-123",
            "hostname": "db1",
            "template_id": "ubuntu-22.04",
            "region": "LON1",
            "safe": 1,
            "size_gb": 20,
            "state": state,
            "cron_timing": null,
            "requested_at": "2024-05-01T03:00:00Z",
            "completed_at": "0001-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_create_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/snapshots/db-snap"))
            .and(header("authorization", "Bearer test-key"))
            .and(query_param("region", "LON1"))
            .and(body_partial_json(json!({"instance_id": "i-123", "safe": true})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(snapshot_json("snap-1", "db-snap", "pending")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = SnapshotRequest {
            source_id: "i-123".to_string(),
            safe_mode: true,
            schedule: None,
        };
        let created = client(&server).create("db-snap", &request).await.unwrap();

        assert_eq!(created.id, "snap-1");
        assert_eq!(created.state, SnapshotState::Pending);
        assert_eq!(created.safe, 1);
        assert!(created.completed_at.is_none());
        assert!(created.requested_at.is_some());
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/snapshots/db-snap"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "database_snapshot_cannot_create",
                "reason": "instance is not running"
            })))
            .mount(&server)
            .await;

        let request = SnapshotRequest {
            source_id: "i-123".to_string(),
            safe_mode: false,
            schedule: Some("0 3 * * *".to_string()),
        };
        let err = client(&server).create("db-snap", &request).await.unwrap_err();

        assert_eq!(
            err,
            ClientError::Rejected("Civo API error (400): instance is not running".to_string())
        );
    }

    #[tokio::test]
    async fn test_find_by_id_then_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/snapshots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                snapshot_json("snap-1", "db-snap", "complete"),
                snapshot_json("snap-2", "web-snap", "in_progress"),
            ])))
            .mount(&server)
            .await;

        let client = client(&server);

        let by_id = client.find("snap-1").await.unwrap();
        assert_eq!(by_id.name, "db-snap");
        assert!(by_id.state.is_complete());

        let by_name = client.find("web-snap").await.unwrap();
        assert_eq!(by_name.id, "snap-2");
        assert_eq!(by_name.state, SnapshotState::InProgress);
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/snapshots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = client(&server).find("snap-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/snapshots"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).find("snap-1").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_delete_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/snapshots/snap-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "success"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v2/snapshots/snap-404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client.delete("snap-1").await.is_ok());
        assert!(client.delete("snap-404").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_new_rejects_empty_key() {
        assert!(matches!(
            CivoClient::new(CivoConfig::new("", "LON1")),
            Err(CivoError::InvalidConfig(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            std::env::set_var("CIVO_TOKEN", "env-key");
            std::env::remove_var("CIVO_REGION");
            std::env::remove_var("CIVO_API_URL");
        }

        let config = CivoConfig::from_env().unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.region, "LON1");
        assert_eq!(config.api_url, "https://api.civo.com");

        unsafe {
            std::env::remove_var("CIVO_TOKEN");
        }
        assert!(matches!(
            CivoConfig::from_env(),
            Err(CivoError::MissingEnvVar(_))
        ));
    }
}
