//! HTTP client for the newsroom image API.
//!
//! One [`ApiClient`] serves as fetcher, committer and AI delegate so a session
//! talks to a single server with a single connection pool.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::ai::{AiAction, AiDelegate, AiError, AiResult};
use crate::config::{AiActionNames, AiConfig};
use crate::storage::{
    CommitRequest, ImageCommitter, ImageFetcher, ImageId, ImageSource, PersistedImageRecord,
    StorageError, StorageResult,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    action_names: AiActionNames,
}

impl ApiClient {
    pub fn new(config: &AiConfig) -> AiResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or(AiError::NotConfigured("ai.base_url is not set"))?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AiError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http_client,
            base_url,
            action_names: config.actions.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn image_file_url(&self, image_id: ImageId) -> String {
        format!("{}/image/{image_id}/file", self.base_url)
    }

    fn process_url(&self, image_id: ImageId) -> String {
        format!("{}/image/{image_id}/process", self.base_url)
    }

    fn commit_url(&self, image_id: Option<ImageId>) -> String {
        match image_id {
            Some(id) => format!("{}/image/{id}/edited", self.base_url),
            None => format!("{}/image/edited", self.base_url),
        }
    }

    async fn get_bytes(&self, url: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(map_storage_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                detail: error_detail(status, &body),
            });
        }
        let bytes = response.bytes().await.map_err(map_storage_error)?;
        Ok(bytes.to_vec())
    }
}

fn map_storage_error(err: reqwest::Error) -> StorageError {
    if err.is_timeout() {
        StorageError::Http(format!("request timed out: {err}"))
    } else if err.is_connect() {
        StorageError::Http(format!("could not connect: {err}"))
    } else {
        StorageError::Http(err.to_string())
    }
}

fn map_ai_error(err: reqwest::Error) -> AiError {
    if err.is_timeout() {
        AiError::Transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        AiError::Transport(format!("could not connect: {err}"))
    } else {
        AiError::Transport(err.to_string())
    }
}

/// Extracts the `detail` field of an error payload, falling back to the
/// body text or the status reason.
pub(crate) fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<serde_json::Value>(body) {
        match payload.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(detail) if !detail.is_null() => return detail.to_string(),
            _ => {}
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

impl ImageFetcher for ApiClient {
    async fn fetch(&self, source: &ImageSource) -> StorageResult<Vec<u8>> {
        match source {
            ImageSource::Url(url) => self.get_bytes(url).await,
            ImageSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| StorageError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            ImageSource::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }

    async fn fetch_by_id(&self, image_id: ImageId) -> StorageResult<Vec<u8>> {
        self.get_bytes(&self.image_file_url(image_id)).await
    }
}

impl ImageCommitter for ApiClient {
    async fn commit(
        &self,
        bytes: Vec<u8>,
        request: CommitRequest,
    ) -> StorageResult<PersistedImageRecord> {
        let url = self.commit_url(request.image_id);
        tracing::info!(%url, bytes = bytes.len(), "uploading edited image");
        let response = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, request.format.mime_type())
            .body(bytes)
            .send()
            .await
            .map_err(map_storage_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_storage_error)?;
        if !status.is_success() {
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                detail: error_detail(status, &body),
            });
        }
        serde_json::from_str(&body).map_err(|err| StorageError::InvalidRecord(err.to_string()))
    }
}

impl AiDelegate for ApiClient {
    async fn transform(&self, image_id: ImageId, action: AiAction) -> AiResult<Vec<u8>> {
        let url = self.process_url(image_id);
        let wire_name = action.wire_name(&self.action_names);
        tracing::info!(%url, image_id, action = wire_name, "requesting AI transform");

        let response = self
            .http_client
            .post(&url)
            .query(&[("action", wire_name)])
            .send()
            .await
            .map_err(map_ai_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(status, &body);
            tracing::warn!(
                image_id,
                %action,
                status = status.as_u16(),
                %detail,
                "AI transform rejected"
            );
            return Err(AiError::Rejected {
                action,
                status: status.as_u16(),
                detail,
            });
        }

        let bytes = response.bytes().await.map_err(map_ai_error)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(base_url: &str) -> AiConfig {
        AiConfig {
            base_url: Some(base_url.to_string()),
            ..AiConfig::default()
        }
    }

    #[test]
    fn new_requires_base_url() {
        let error = ApiClient::new(&AiConfig::default()).unwrap_err();
        assert!(matches!(error, AiError::NotConfigured(_)));
    }

    #[test]
    fn endpoints_are_built_from_trimmed_base_url() {
        let client = ApiClient::new(&configured("http://localhost:8000/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.process_url(12), "http://localhost:8000/image/12/process");
        assert_eq!(client.image_file_url(12), "http://localhost:8000/image/12/file");
        assert_eq!(client.commit_url(Some(12)), "http://localhost:8000/image/12/edited");
        assert_eq!(client.commit_url(None), "http://localhost:8000/image/edited");
    }

    #[test]
    fn error_detail_prefers_json_detail_field() {
        assert_eq!(
            error_detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"detail": "rembg model missing"}"#
            ),
            "rembg model missing"
        );
        assert_eq!(
            error_detail(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"detail": [{"msg": "bad action"}]}"#
            ),
            r#"[{"msg":"bad action"}]"#
        );
    }

    #[test]
    fn error_detail_falls_back_to_body_then_reason() {
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
        assert_eq!(error_detail(StatusCode::NOT_FOUND, ""), "Not Found");
    }
}
