//! HTTP client for the provider's REST surface.

use questline_shared::{ApiError, UserStats};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Thin REST client for the gamification endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    /// Gamification stats for one user.
    pub async fn user_stats(&self, user_id: i64) -> Result<UserStats, ApiError> {
        self.get_json(&format!("/api/users/{user_id}/stats")).await
    }

    /// Stats with a mock fallback: dashboard views degrade to zeroed stats
    /// instead of erroring when the provider is unreachable.
    pub async fn user_stats_or_empty(&self, user_id: i64) -> UserStats {
        match self.user_stats(user_id).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, user_id, "stats fetch failed, using empty stats");
                UserStats::empty(user_id)
            }
        }
    }
}
