//! REST adapter for the authoritative dashboard backend.

use async_trait::async_trait;
use serde_json::json;

use livedeck_sync::error::FetchError;
use livedeck_sync::fetch::{MutationCommands, SnapshotFetcher, ViewerStatsFetcher};
use livedeck_sync::models::snapshot::{StreamSnapshot, ViewerStatsSnapshot};

/// Thin client over the dashboard REST API. Cloneable; the underlying
/// `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    http: reqwest::Client,
}

impl RestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn stream_url(&self, stream_id: &str) -> String {
        format!("{}/api/v1/livestreams/{}", self.base_url, stream_id)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        let resp = self.http.get(&url).send().await.map_err(|e| {
            tracing::error!(?e, %url, "fetch failed");
            FetchError::Transport(e.to_string())
        })?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        resp.json().await.map_err(|e| {
            tracing::error!(?e, %url, "response parse failed");
            FetchError::Malformed(e.to_string())
        })
    }

    async fn send_command(&self, req: reqwest::RequestBuilder) -> Result<(), FetchError> {
        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        resp.error_for_status()
            .map(|_| ())
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

#[async_trait]
impl SnapshotFetcher for RestClient {
    async fn fetch_snapshot(&self, stream_id: &str) -> Result<StreamSnapshot, FetchError> {
        self.get_json(self.stream_url(stream_id)).await
    }
}

#[async_trait]
impl ViewerStatsFetcher for RestClient {
    async fn fetch_viewer_stats(
        &self,
        stream_id: &str,
    ) -> Result<ViewerStatsSnapshot, FetchError> {
        self.get_json(format!("{}/viewers", self.stream_url(stream_id)))
            .await
    }
}

#[async_trait]
impl MutationCommands for RestClient {
    async fn pin_comment(&self, stream_id: &str, comment_id: &str) -> Result<(), FetchError> {
        let url = format!("{}/comments/{}/pin", self.stream_url(stream_id), comment_id);
        self.send_command(self.http.put(&url)).await
    }

    async fn unpin_comment(&self, stream_id: &str, comment_id: &str) -> Result<(), FetchError> {
        let url = format!("{}/comments/{}/pin", self.stream_url(stream_id), comment_id);
        self.send_command(self.http.delete(&url)).await
    }

    async fn delete_comment(&self, stream_id: &str, comment_id: &str) -> Result<(), FetchError> {
        let url = format!("{}/comments/{}", self.stream_url(stream_id), comment_id);
        self.send_command(self.http.delete(&url)).await
    }

    async fn submit_comment(&self, stream_id: &str, text: &str) -> Result<(), FetchError> {
        let url = format!("{}/comments", self.stream_url(stream_id));
        self.send_command(self.http.post(&url).json(&json!({ "text": text })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RestClient::new("http://localhost:4000/");
        assert_eq!(
            client.stream_url("stm_1"),
            "http://localhost:4000/api/v1/livestreams/stm_1"
        );
    }
}
