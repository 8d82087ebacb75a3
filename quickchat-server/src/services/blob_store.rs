//! Blob-storage collaborator boundary.
//!
//! Raw image payloads are exchanged for a hosted URL before a message is
//! persisted. The collaborator is behind a trait so delivery logic can be
//! exercised without a network.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shared::config::server::BlobStoreConfig;
use thiserror::Error;
use tracing::instrument;

/// Errors from the blob-storage collaborator. All of them abort a send
/// before anything is persisted.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// The store rejected the payload.
    #[error("upload rejected: {0}")]
    Rejected(String),
    /// The store could not be reached.
    #[error("blob store unreachable: {0}")]
    Transport(String),
    /// No upload endpoint is configured.
    #[error("no blob store endpoint configured")]
    Disabled,
}

/// Exchange a raw image payload for a hosted URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads a raw image payload and returns its hosted URL.
    ///
    /// # Errors
    /// Returns a [`BlobStoreError`] if the upload is rejected or the store
    /// is unreachable.
    async fn upload_image(&self, payload: &str) -> Result<String, BlobStoreError>;
}

/// HTTP-backed blob store client.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    endpoint: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

impl HttpBlobStore {
    /// Builds a client from configuration; an absent endpoint disables raw
    /// uploads (already-hosted URLs still pass through delivery untouched).
    #[must_use]
    pub fn from_config(config: &BlobStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(name = "blob_store.upload", skip(self, payload), err)]
    async fn upload_image(&self, payload: &str) -> Result<String, BlobStoreError> {
        let endpoint = self.endpoint.as_ref().ok_or(BlobStoreError::Disabled)?;

        let response = self
            .client
            .post(endpoint)
            .json(&json!({ "image": payload }))
            .send()
            .await
            .map_err(|err| BlobStoreError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(BlobStoreError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| BlobStoreError::Rejected(err.to_string()))?;

        Ok(body.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_store_rejects_raw_uploads() {
        let store = HttpBlobStore::from_config(&BlobStoreConfig::default());
        let err = store
            .upload_image("data:image/png;base64,AAAA")
            .await
            .unwrap_err();
        assert!(matches!(err, BlobStoreError::Disabled));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let store = HttpBlobStore::from_config(&BlobStoreConfig {
            endpoint: Some("http://127.0.0.1:1/upload".into()),
        });
        let err = store
            .upload_image("data:image/png;base64,AAAA")
            .await
            .unwrap_err();
        assert!(matches!(err, BlobStoreError::Transport(_)));
    }
}
