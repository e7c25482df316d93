use thiserror::Error;

/// User-facing messages. Raw transport errors are never shown to the user.
pub const MSG_CATALOG_LOAD: &str = "Failed to load races. Please try again.";
pub const MSG_PREDICTION_FETCH: &str = "Failed to fetch predictions. Please try again.";
pub const MSG_RACE_SELECTION: &str = "Failed to load race predictions";
pub const MSG_STAGE_RESOLUTION: &str = "The selected stage is not available for this race.";
pub const MSG_REDEPLOY: &str = "Failed to redeploy model. Please try again.";
pub const MSG_ADMIN_UNAVAILABLE: &str = "Model redeploy is not available in this deployment.";
pub const MSG_UNKNOWN_RACE: &str = "Unknown race. Please pick one from the list.";
pub const MSG_CONFIG: &str = "Invalid client configuration.";

/// Transport-level errors raised by the HTTP client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

/// Application error taxonomy
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Race catalog could not be loaded: {0}")]
    CatalogLoad(#[source] ClientError),

    #[error("Prediction fetch failed: {0}")]
    PredictionFetch(#[source] ClientError),

    #[error("No catalog entry for {race} / {stage}")]
    StageResolution { race: String, stage: String },

    #[error("Redeploy failed: {0}")]
    Redeploy(#[source] ClientError),

    #[error("Redeploy is not enabled for this client")]
    AdminUnavailable,

    #[error("Race not found in catalog: {0}")]
    UnknownRace(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PredictorError {
    /// Fixed message suitable for display, one per category
    pub fn user_message(&self) -> &'static str {
        match self {
            PredictorError::CatalogLoad(_) => MSG_CATALOG_LOAD,
            PredictorError::PredictionFetch(_) => MSG_PREDICTION_FETCH,
            PredictorError::StageResolution { .. } => MSG_STAGE_RESOLUTION,
            PredictorError::Redeploy(_) => MSG_REDEPLOY,
            PredictorError::AdminUnavailable => MSG_ADMIN_UNAVAILABLE,
            PredictorError::UnknownRace(_) => MSG_UNKNOWN_RACE,
            PredictorError::Config(_) => MSG_CONFIG,
        }
    }
}

pub fn validate_probability(prob: f64) -> Result<(), ClientError> {
    if !prob.is_finite() || !(0.0..=1.0).contains(&prob) {
        return Err(ClientError::Malformed(format!(
            "Probability must be between 0 and 1, got {}",
            prob
        )));
    }
    Ok(())
}
