//! Session wiring
//!
//! Picks the backend, catalog source and admin capability for a deployment
//! type and hands back a ready controller. Backends are dispatched through an
//! enum rather than trait objects.

use tracing::info;

use crate::catalog::{CatalogSource, RaceCatalog};
use crate::client::PredictionClient;
use crate::config::{ClientConfig, DeploymentType};
use crate::controller::{AdminCapability, SelectionController};
use crate::error::{ClientError, PredictorError};
use crate::models::{PredictResponse, RaceEntry, RedeployResponse};
use crate::predictor::PredictionBackend;
use crate::synthetic::SyntheticBackend;

/// Concrete backend selected at startup
pub enum Backend {
    Remote(PredictionClient),
    Synthetic(SyntheticBackend),
}

impl PredictionBackend for Backend {
    async fn fetch_races(&self) -> Result<Vec<RaceEntry>, ClientError> {
        match self {
            Backend::Remote(client) => client.fetch_races().await,
            Backend::Synthetic(synthetic) => synthetic.fetch_races().await,
        }
    }

    async fn predict(&self, index: i64) -> Result<PredictResponse, ClientError> {
        match self {
            Backend::Remote(client) => client.predict(index).await,
            Backend::Synthetic(synthetic) => synthetic.predict(index).await,
        }
    }

    async fn redeploy(&self, index: i64) -> Result<RedeployResponse, ClientError> {
        match self {
            Backend::Remote(client) => client.redeploy(index).await,
            Backend::Synthetic(synthetic) => synthetic.redeploy(index).await,
        }
    }
}

/// Build a controller for the configured deployment.
///
/// `seed` only affects the offline synthetic backend.
pub fn build_controller(
    config: &ClientConfig,
    seed: Option<u64>,
) -> Result<SelectionController<Backend>, PredictorError> {
    config.validate()?;
    info!(
        "Starting {} session against {}",
        config.deployment.as_str(),
        config.base_url
    );

    let controller = match config.deployment {
        DeploymentType::Devops => SelectionController::new(
            Backend::Remote(remote_client(config)?),
            CatalogSource::Static(RaceCatalog::devops_default().list_races().to_vec()),
            AdminCapability::Disabled,
        ),
        DeploymentType::Mlops => SelectionController::new(
            Backend::Remote(remote_client(config)?),
            CatalogSource::Remote,
            AdminCapability::Enabled,
        ),
        DeploymentType::Offline => {
            let synthetic = match seed {
                Some(seed) => SyntheticBackend::with_seed(seed),
                None => SyntheticBackend::new(),
            };
            SelectionController::new(
                Backend::Synthetic(synthetic),
                CatalogSource::Static(RaceCatalog::offline_default().list_races().to_vec()),
                AdminCapability::Disabled,
            )
        }
    };

    Ok(controller)
}

fn remote_client(config: &ClientConfig) -> Result<PredictionClient, PredictorError> {
    PredictionClient::new(config.clone())
        .map_err(|e| PredictorError::Config(format!("failed to build HTTP client: {}", e)))
}
