//! Client configuration
//!
//! Defaults can be overridden through environment variables:
//! - `PREDICTOR_API_URL`         = base URL of the prediction service
//! - `PREDICTOR_TIMEOUT_SECS`    = request timeout in seconds
//! - `PREDICTOR_DEPLOYMENT_TYPE` = `devops`, `mlops` or `offline`

use std::str::FromStr;
use std::time::Duration;

use crate::error::PredictorError;

pub const DEFAULT_API_URL: &str = "http://localhost:5010";

/// Which flavour of the service the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentType {
    /// Fixed race list, `/predict` only
    #[default]
    Devops,
    /// Race list from `/races`, `/redeploy` available
    Mlops,
    /// No network, synthetic predictions
    Offline,
}

impl DeploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::Devops => "devops",
            DeploymentType::Mlops => "mlops",
            DeploymentType::Offline => "offline",
        }
    }
}

impl FromStr for DeploymentType {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devops" => Ok(DeploymentType::Devops),
            "mlops" => Ok(DeploymentType::Mlops),
            "offline" => Ok(DeploymentType::Offline),
            other => Err(PredictorError::Config(format!(
                "unknown deployment type '{}', expected devops, mlops or offline",
                other
            ))),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    pub deployment: DeploymentType,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            user_agent: format!("cycling-predictor/{}", env!("CARGO_PKG_VERSION")),
            deployment: DeploymentType::default(),
        }
    }
}

impl ClientConfig {
    /// Build a config from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, PredictorError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("PREDICTOR_API_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(timeout) = std::env::var("PREDICTOR_TIMEOUT_SECS") {
            if !timeout.trim().is_empty() {
                config.timeout_secs = timeout.trim().parse().map_err(|_| {
                    PredictorError::Config(format!(
                        "PREDICTOR_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        timeout
                    ))
                })?;
            }
        }
        if let Ok(kind) = std::env::var("PREDICTOR_DEPLOYMENT_TYPE") {
            if !kind.trim().is_empty() {
                config.deployment = kind.parse()?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PredictorError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(PredictorError::Config(format!(
                "API URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(PredictorError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
