use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage label used by single-day races
pub const ONE_DAY: &str = "One_Day";

fn default_stage() -> String {
    ONE_DAY.to_string()
}

/// Race identifier (numeric on the metadata server, a slug in the fixed table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RaceId {
    Numeric(u64),
    Slug(String),
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceId::Numeric(id) => write!(f, "{}", id),
            RaceId::Slug(slug) => write!(f, "{}", slug),
        }
    }
}

/// One selectable race (or race stage) from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEntry {
    pub id: RaceId,
    pub name: String,
    #[serde(default = "default_stage")]
    pub stage: String,
    pub index: i64,
}

impl RaceEntry {
    pub fn new(id: RaceId, name: impl Into<String>, stage: impl Into<String>, index: i64) -> Self {
        Self {
            id,
            name: name.into(),
            stage: stage.into(),
            index,
        }
    }
}

/// Prediction request body
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictRequest {
    pub index: i64,
}

/// Redeploy request body
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RedeployRequest {
    pub index: i64,
}

/// Single cyclist entry as returned by the prediction service.
///
/// The two deployments disagree on field names (`name`/`rider_name`,
/// `image_url`/`image_path`); both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPrediction {
    #[serde(alias = "rider_name")]
    pub name: String,
    #[serde(alias = "image_path", default)]
    pub image_url: String,
    pub prediction: f64,
}

/// Prediction response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: Vec<RawPrediction>,
}

/// Redeploy response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedeployResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Normalized, ranked cyclist prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// 1-based position in the response
    pub rank: usize,
    pub name: String,
    pub image_url: String,
    /// Win percentage with two decimals, e.g. "45.67"
    pub score: String,
    pub probability: f64,
}
