//! Cycling Predictor - client for a cycling race win-probability service
//!
//! This library provides:
//! - A race catalog with stage resolution for multi-stage races
//! - An HTTP client for the `/races`, `/predict` and `/redeploy` endpoints
//! - A selection controller sequencing race/stage picks and prediction fetches
//! - An offline synthetic backend for demos
//!
//! # Example
//!
//! ```no_run
//! use cycling_predictor::catalog::{CatalogSource, RaceCatalog};
//! use cycling_predictor::client::PredictionClient;
//! use cycling_predictor::config::ClientConfig;
//! use cycling_predictor::controller::{AdminCapability, SelectionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PredictionClient::new(ClientConfig::default())?;
//!     let races = RaceCatalog::devops_default().list_races().to_vec();
//!     let mut controller =
//!         SelectionController::new(client, CatalogSource::Static(races), AdminCapability::Disabled);
//!
//!     controller.select_race_by_name("Tour de France").await?;
//!     for row in controller.visible_results() {
//!         println!("{} {} {}%", row.rank, row.name, row.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod predictor;
pub mod session;
pub mod synthetic;

// Re-export commonly used types
pub use catalog::{CatalogSource, RaceCatalog, StageKind};
pub use client::PredictionClient;
pub use config::{ClientConfig, DeploymentType};
pub use controller::{AdminCapability, Phase, SelectionController, SelectionState};
pub use error::{ClientError, PredictorError};
pub use models::{RaceEntry, RaceId, RankedResult};
pub use predictor::{PredictionBackend, PredictionFetcher};
pub use session::{build_controller, Backend};
pub use synthetic::SyntheticBackend;
