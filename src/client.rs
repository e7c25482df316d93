//! HTTP client for the prediction service

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{PredictRequest, PredictResponse, RaceEntry, RedeployRequest, RedeployResponse};
use crate::predictor::PredictionBackend;

const RACES_PATH: &str = "races";
const PREDICT_PATH: &str = "predict";
const REDEPLOY_PATH: &str = "redeploy";

/// Prediction service client. No retries: a failed call needs a new user action.
pub struct PredictionClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl PredictionClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self::with_http_client(config, client))
    }

    /// Create a client around an already configured `reqwest::Client`
    pub fn with_http_client(config: ClientConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn races_url(&self) -> String {
        self.config.endpoint(RACES_PATH)
    }

    fn predict_url(&self) -> String {
        self.config.endpoint(PREDICT_PATH)
    }

    fn redeploy_url(&self) -> String {
        self.config.endpoint(REDEPLOY_PATH)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        info!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::read_json(response, url).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        info!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::read_json(response, url).await
    }

    /// Reject non-2xx responses and decode the body
    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Request to {} failed with status {}: {}", url, status, body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Malformed(e.to_string()))
    }
}

impl PredictionBackend for PredictionClient {
    async fn fetch_races(&self) -> Result<Vec<RaceEntry>, ClientError> {
        let url = self.races_url();
        self.get_json(&url).await
    }

    async fn predict(&self, index: i64) -> Result<PredictResponse, ClientError> {
        let url = self.predict_url();
        self.post_json(&url, &PredictRequest { index }).await
    }

    async fn redeploy(&self, index: i64) -> Result<RedeployResponse, ClientError> {
        let url = self.redeploy_url();
        self.post_json(&url, &RedeployRequest { index }).await
    }
}
