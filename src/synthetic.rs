//! Synthetic predictions
//!
//! Generates placeholder win percentages for demoing the client without a
//! prediction service.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::catalog::RaceCatalog;
use crate::error::ClientError;
use crate::models::{PredictResponse, RaceEntry, RawPrediction, RedeployResponse};
use crate::predictor::PredictionBackend;

/// Number of cyclists generated per prediction
const NUM_CYCLISTS: usize = 10;

/// Offline backend producing random, descending-sorted predictions
pub struct SyntheticBackend {
    rng: Mutex<StdRng>,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator, for reproducible output
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn generate(&self) -> Vec<RawPrediction> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut cyclists: Vec<RawPrediction> = (1..=NUM_CYCLISTS)
            .map(|i| RawPrediction {
                name: format!("Cyclist {}", i),
                image_url: format!("/placeholder.svg?height=40&width=40&text={}", i),
                prediction: rng.gen_range(0.0..1.0),
            })
            .collect();

        cyclists.sort_by(|a, b| {
            b.prediction
                .partial_cmp(&a.prediction)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        cyclists
    }
}

impl PredictionBackend for SyntheticBackend {
    async fn fetch_races(&self) -> Result<Vec<RaceEntry>, ClientError> {
        Ok(RaceCatalog::offline_default().list_races().to_vec())
    }

    async fn predict(&self, _index: i64) -> Result<PredictResponse, ClientError> {
        Ok(PredictResponse {
            prediction: self.generate(),
        })
    }

    async fn redeploy(&self, _index: i64) -> Result<RedeployResponse, ClientError> {
        Err(ClientError::Unsupported("redeploy"))
    }
}
