use common::{
    env_config::BackendConfig,
    error::{AppError, Res},
};
use reqwest::Client;

use crate::models::stats::StatsPayload;

/// Calls the backend's aggregate stats endpoint on behalf of a session.
#[derive(Debug, Clone)]
pub struct StatsClient {
    http: Client,
    stats_url: String,
}

impl StatsClient {
    pub fn new(config: &BackendConfig) -> Res<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AppError::from)?;

        Ok(Self {
            http,
            stats_url: config.stats_url(),
        })
    }

    pub fn stats_url(&self) -> &str {
        &self.stats_url
    }

    /// Fetches the stats payload with the caller's bearer token.
    pub async fn fetch_stats(&self, token: &str) -> Res<StatsPayload> {
        log::debug!("GET {}", self.stats_url);

        let response = self
            .http
            .get(&self.stats_url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&message),
            });
        }

        Ok(response.json::<StatsPayload>().await?)
    }
}

/// Prefers the backend's `{ "message": .. }` / `{ "error": .. }` text over the raw body.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
