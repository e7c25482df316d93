use tracing::{info, warn};

use crate::error::{validate_probability, ClientError, PredictorError};
use crate::models::{PredictResponse, RaceEntry, RankedResult, RawPrediction, RedeployResponse};

/// Remote side of the predictor: race metadata, predictions and redeploys.
///
/// Implemented by the HTTP client and by the offline synthetic generator.
#[allow(async_fn_in_trait)]
pub trait PredictionBackend {
    /// `GET /races`
    async fn fetch_races(&self) -> Result<Vec<RaceEntry>, ClientError>;

    /// `POST /predict`
    async fn predict(&self, index: i64) -> Result<PredictResponse, ClientError>;

    /// `POST /redeploy`
    async fn redeploy(&self, index: i64) -> Result<RedeployResponse, ClientError>;
}

/// Format a probability in [0, 1] as a percentage with two decimals,
/// rounding half-up.
pub fn format_score(probability: f64) -> String {
    let hundredths = (probability * 100.0 * 100.0).round();
    format!("{:.2}", hundredths / 100.0)
}

/// Rank raw predictions in response order. The service owns the ordering.
pub fn rank_predictions(raw: Vec<RawPrediction>) -> Result<Vec<RankedResult>, ClientError> {
    raw.into_iter()
        .enumerate()
        .map(|(i, entry)| {
            validate_probability(entry.prediction)?;
            Ok(RankedResult {
                rank: i + 1,
                score: format_score(entry.prediction),
                probability: entry.prediction,
                name: entry.name,
                image_url: entry.image_url,
            })
        })
        .collect()
}

/// Issues prediction requests and normalizes the responses
pub struct PredictionFetcher<B> {
    backend: B,
}

impl<B: PredictionBackend> PredictionFetcher<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch and rank predictions for a catalog index
    pub async fn fetch_prediction(&self, index: i64) -> Result<Vec<RankedResult>, PredictorError> {
        info!("Fetching predictions for index {}", index);

        let response = self.backend.predict(index).await.map_err(|e| {
            warn!("Prediction request for index {} failed: {}", index, e);
            PredictorError::PredictionFetch(e)
        })?;

        let ranked = rank_predictions(response.prediction).map_err(|e| {
            warn!("Prediction response for index {} rejected: {}", index, e);
            PredictorError::PredictionFetch(e)
        })?;

        info!("Received {} predictions for index {}", ranked.len(), index);
        Ok(ranked)
    }
}
