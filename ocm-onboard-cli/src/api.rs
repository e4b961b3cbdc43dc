//! HTTP client for the cluster plugin API

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// Default route prefix the plugin is mounted under
pub const DEFAULT_API_BASE: &str = "/api/plugins/kubestellar-cluster-plugin";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(server: &str, api_base: &str) -> Self {
        Self {
            base_url: format!(
                "{}{}",
                server.trim_end_matches('/'),
                api_base.trim_end_matches('/')
            ),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    /// Like [`get`](Self::get), but a 404 is `None`
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.client.get(self.url(path)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    /// POST with no body; parameters travel in the query string
    pub async fn post_query<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::decode(response).await
    }

    /// Upload `file` as the `file_field` part next to plain text fields
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        file_field: &str,
        file: &Path,
    ) -> Result<T> {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "kubeconfig".to_string());

        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }
        form = form.part(
            file_field.to_string(),
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.message)
                .unwrap_or(error_text);
            anyhow::bail!("API request failed: {} - {}", status, message);
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let api = ApiClient::new("http://localhost:8080/", DEFAULT_API_BASE);
        assert_eq!(
            api.url("/status/prod-1"),
            "http://localhost:8080/api/plugins/kubestellar-cluster-plugin/status/prod-1"
        );

        let api = ApiClient::new("http://hub:9000", "/custom/");
        assert_eq!(api.url("/list"), "http://hub:9000/custom/list");
    }
}
