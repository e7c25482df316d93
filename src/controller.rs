//! Selection state controller
//!
//! Owns the session's [`SelectionState`] and is the only place it is mutated.
//! Transitions:
//!
//! ```text
//! Idle -> StageResolving -> Loading -> Loaded
//!                              |
//!                              +-----> Error
//! ```
//!
//! Every fetch is tagged with a [`FetchTicket`]. Completions carrying a ticket
//! older than the latest one issued are discarded, so a slow response can
//! never overwrite the results of a newer selection.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::{stage_label, CatalogSource, RaceCatalog};
use crate::error::{
    PredictorError, MSG_CATALOG_LOAD, MSG_PREDICTION_FETCH, MSG_RACE_SELECTION, MSG_REDEPLOY,
    MSG_STAGE_RESOLUTION,
};
use crate::models::{RaceEntry, RankedResult, RedeployResponse};
use crate::predictor::{PredictionBackend, PredictionFetcher};

/// Rows shown while the show-all toggle is off
pub const TOP_N: usize = 10;

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    StageResolving,
    Loading,
    Loaded,
    Error,
}

/// Whether the redeploy action is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminCapability {
    #[default]
    Disabled,
    Enabled,
}

/// Session state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionState {
    pub phase: Phase,
    pub selected_race: Option<RaceEntry>,
    pub stages: Vec<String>,
    pub selected_stage: String,
    pub results: Vec<RankedResult>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub show_all: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            selected_race: None,
            stages: Vec::new(),
            selected_stage: stage_label(1),
            results: Vec::new(),
            is_loading: false,
            error_message: None,
            show_all: false,
        }
    }
}

/// Handle for one issued fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    index: i64,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn index(&self) -> i64 {
        self.index
    }
}

/// What happened to a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was issued; the completion was dropped
    Stale,
}

pub struct SelectionController<B> {
    fetcher: PredictionFetcher<B>,
    source: CatalogSource,
    catalog: RaceCatalog,
    admin: AdminCapability,
    state: SelectionState,
    last_issued: u64,
}

impl<B: PredictionBackend> SelectionController<B> {
    pub fn new(backend: B, source: CatalogSource, admin: AdminCapability) -> Self {
        let catalog = match &source {
            CatalogSource::Static(entries) => RaceCatalog::new(entries.clone()),
            CatalogSource::Remote => RaceCatalog::default(),
        };

        Self {
            fetcher: PredictionFetcher::new(backend),
            source,
            catalog,
            admin,
            state: SelectionState::default(),
            last_issued: 0,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn catalog(&self) -> &RaceCatalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        self.fetcher.backend()
    }

    pub fn admin(&self) -> AdminCapability {
        self.admin
    }

    /// Resolve the race list. Static catalogs are never re-fetched.
    pub async fn load_catalog(&mut self) -> Result<(), PredictorError> {
        let entries = match &self.source {
            CatalogSource::Static(entries) => entries.clone(),
            CatalogSource::Remote => match self.fetcher.backend().fetch_races().await {
                Ok(entries) => entries,
                Err(e) => {
                    error!("Failed to load races: {}", e);
                    self.state.error_message = Some(MSG_CATALOG_LOAD.to_string());
                    return Err(PredictorError::CatalogLoad(e));
                }
            },
        };

        info!("Race catalog loaded with {} entries", entries.len());
        self.catalog = RaceCatalog::new(entries);
        Ok(())
    }

    /// Select a race and fetch predictions for it (or for its first stage)
    pub async fn select_race(&mut self, entry: RaceEntry) -> Result<(), PredictorError> {
        self.state.stages.clear();
        self.state.selected_race = Some(entry.clone());

        match self.resolve_and_fetch(&entry).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Race selection for '{}' failed: {}", entry.name, e);
                // Fetch failures already carry their own message
                if !matches!(e, PredictorError::PredictionFetch(_)) {
                    // Results of the previous race must not show under this one
                    self.last_issued += 1;
                    self.state.results.clear();
                    self.state.is_loading = false;
                    self.state.error_message = Some(MSG_RACE_SELECTION.to_string());
                    self.state.phase = Phase::Error;
                }
                Err(e)
            }
        }
    }

    /// Select a race by name and then stage `stage` of it. A race whose
    /// "Stage 1" entry is missing can still be opened at another stage.
    /// One-day races ignore `stage`.
    pub async fn select_race_stage(&mut self, name: &str, stage: u32) -> Result<(), PredictorError> {
        match self.select_race_by_name(name).await {
            Ok(()) => {}
            Err(PredictorError::StageResolution { .. }) if !self.state.stages.is_empty() => {
                debug!("'{}' has no first stage, trying stage {}", name, stage);
            }
            Err(e) => return Err(e),
        }

        if self.state.stages.is_empty() {
            return Ok(());
        }

        let label = stage_label(stage);
        if self.state.phase == Phase::Loaded && self.state.selected_stage == label {
            return Ok(());
        }
        self.select_stage(&label).await
    }

    /// Select the first catalog entry carrying `name`
    pub async fn select_race_by_name(&mut self, name: &str) -> Result<(), PredictorError> {
        let entry = self
            .catalog
            .find_race(name)
            .cloned()
            .ok_or_else(|| PredictorError::UnknownRace(name.to_string()))?;
        self.select_race(entry).await
    }

    async fn resolve_and_fetch(&mut self, entry: &RaceEntry) -> Result<(), PredictorError> {
        if !self.catalog.is_multi_stage(entry) {
            debug!("'{}' is a single-stage race", entry.name);
            return self.fetch_prediction(entry.index).await;
        }

        self.state.phase = Phase::StageResolving;
        self.state.stages = self.catalog.stages_for(&entry.name);
        let first = stage_label(1);
        self.state.selected_stage = first.clone();

        let index = self
            .catalog
            .find_stage(&entry.name, &first)
            .map(|e| e.index)
            .ok_or_else(|| PredictorError::StageResolution {
                race: entry.name.clone(),
                stage: first,
            })?;

        self.fetch_prediction(index).await
    }

    /// Select a stage of the current race. An unknown stage issues no fetch
    /// and leaves the current results in place.
    pub async fn select_stage(&mut self, label: &str) -> Result<(), PredictorError> {
        self.state.selected_stage = label.to_string();

        let race = self
            .state
            .selected_race
            .as_ref()
            .map(|r| r.name.clone())
            .unwrap_or_default();

        match self.catalog.find_stage(&race, label).map(|e| e.index) {
            Some(index) => self.fetch_prediction(index).await,
            None => {
                warn!("No catalog entry for '{}' {}", race, label);
                self.state.error_message = Some(MSG_STAGE_RESOLUTION.to_string());
                Err(PredictorError::StageResolution {
                    race,
                    stage: label.to_string(),
                })
            }
        }
    }

    /// Fetch predictions for a catalog index and store them
    pub async fn fetch_prediction(&mut self, index: i64) -> Result<(), PredictorError> {
        let ticket = self.begin_fetch(index);
        let result = self.fetcher.fetch_prediction(index).await;
        self.complete_fetch(ticket, result).map(|_| ())
    }

    /// Mark a fetch as in flight and hand out its ticket
    pub fn begin_fetch(&mut self, index: i64) -> FetchTicket {
        self.last_issued += 1;
        self.state.is_loading = true;
        self.state.error_message = None;
        self.state.phase = Phase::Loading;

        FetchTicket {
            seq: self.last_issued,
            index,
        }
    }

    /// Apply a fetch result if its ticket is still the latest one
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<RankedResult>, PredictorError>,
    ) -> Result<FetchOutcome, PredictorError> {
        if ticket.seq != self.last_issued {
            debug!(
                "Dropping stale response for index {} (seq {}, latest {})",
                ticket.index, ticket.seq, self.last_issued
            );
            return Ok(FetchOutcome::Stale);
        }

        self.state.is_loading = false;
        match result {
            Ok(results) => {
                self.state.results = results;
                self.state.phase = Phase::Loaded;
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                error!("Error fetching predictions for index {}: {}", ticket.index, e);
                self.state.results.clear();
                self.state.error_message = Some(MSG_PREDICTION_FETCH.to_string());
                self.state.phase = Phase::Error;
                Err(e)
            }
        }
    }

    pub fn toggle_show_all(&mut self) {
        self.state.show_all = !self.state.show_all;
    }

    /// Rows to present: everything, or the top 10
    pub fn visible_results(&self) -> &[RankedResult] {
        let results = &self.state.results;
        if self.state.show_all {
            results
        } else {
            &results[..results.len().min(TOP_N)]
        }
    }

    /// Ask the service to redeploy the model for `index`. On success the
    /// catalog is re-resolved and the session starts over.
    pub async fn redeploy(&mut self, index: i64) -> Result<RedeployResponse, PredictorError> {
        if self.admin == AdminCapability::Disabled {
            return Err(PredictorError::AdminUnavailable);
        }

        info!("Requesting model redeploy for index {}", index);
        let response = match self.fetcher.backend().redeploy(index).await {
            Ok(response) => response,
            Err(e) => {
                error!("Redeploy for index {} failed: {}", index, e);
                self.state.error_message = Some(MSG_REDEPLOY.to_string());
                return Err(PredictorError::Redeploy(e));
            }
        };

        info!(
            "Redeploy accepted: {}",
            response.message.as_deref().unwrap_or("no message")
        );
        self.reset();
        self.load_catalog().await?;
        Ok(response)
    }

    /// Back to the freshly-mounted state; in-flight fetches become stale
    fn reset(&mut self) {
        self.last_issued += 1;
        self.state = SelectionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::models::{PredictResponse, RaceId, RawPrediction};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory backend recording every call
    #[derive(Default)]
    struct FakeBackend {
        races: Vec<RaceEntry>,
        failing_indices: HashSet<i64>,
        fail_races: bool,
        fail_redeploy: bool,
        predict_calls: Mutex<Vec<i64>>,
        redeploy_calls: Mutex<Vec<i64>>,
        races_calls: Mutex<usize>,
    }

    impl FakeBackend {
        fn predict_calls(&self) -> Vec<i64> {
            self.predict_calls.lock().unwrap().clone()
        }
    }

    impl PredictionBackend for FakeBackend {
        async fn fetch_races(&self) -> Result<Vec<RaceEntry>, ClientError> {
            *self.races_calls.lock().unwrap() += 1;
            if self.fail_races {
                return Err(ClientError::Status {
                    status: 503,
                    url: "http://fake/races".to_string(),
                });
            }
            Ok(self.races.clone())
        }

        async fn predict(&self, index: i64) -> Result<PredictResponse, ClientError> {
            self.predict_calls.lock().unwrap().push(index);
            if self.failing_indices.contains(&index) {
                return Err(ClientError::Status {
                    status: 500,
                    url: "http://fake/predict".to_string(),
                });
            }
            Ok(PredictResponse {
                prediction: vec![
                    RawPrediction {
                        name: format!("Rider {}", index),
                        image_url: "a.png".to_string(),
                        prediction: 0.4567,
                    },
                    RawPrediction {
                        name: "Other".to_string(),
                        image_url: "b.png".to_string(),
                        prediction: 0.1,
                    },
                ],
            })
        }

        async fn redeploy(&self, index: i64) -> Result<RedeployResponse, ClientError> {
            self.redeploy_calls.lock().unwrap().push(index);
            if self.fail_redeploy {
                return Err(ClientError::Status {
                    status: 500,
                    url: "http://fake/redeploy".to_string(),
                });
            }
            Ok(RedeployResponse {
                message: Some("Model redeployed successfully".to_string()),
                ..Default::default()
            })
        }
    }

    fn entry(id: u64, name: &str, stage: &str, index: i64) -> RaceEntry {
        RaceEntry::new(RaceId::Numeric(id), name, stage, index)
    }

    fn races() -> Vec<RaceEntry> {
        vec![
            entry(1, "Milano-Sanremo", "One_Day", 0),
            entry(2, "Tour de Suisse", "Stage 1", 10),
            entry(3, "Tour de Suisse", "Stage 2", 11),
            entry(4, "Tour de Suisse", "Stage 3", 12),
            entry(5, "Dauphiné", "Stage 2", 20),
            entry(6, "Dauphiné", "Stage 3", 21),
        ]
    }

    fn ranked(n: usize) -> Vec<RankedResult> {
        (1..=n)
            .map(|i| RankedResult {
                rank: i,
                name: format!("Cyclist {}", i),
                image_url: String::new(),
                score: "1.00".to_string(),
                probability: 0.01,
            })
            .collect()
    }

    async fn remote_controller(backend: FakeBackend) -> SelectionController<FakeBackend> {
        let mut controller =
            SelectionController::new(backend, CatalogSource::Remote, AdminCapability::Enabled);
        controller.load_catalog().await.unwrap();
        controller
    }

    fn backend() -> FakeBackend {
        FakeBackend {
            races: races(),
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_state() {
        let controller = SelectionController::new(
            backend(),
            CatalogSource::Static(RaceCatalog::devops_default().list_races().to_vec()),
            AdminCapability::Disabled,
        );
        let state = controller.state();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.selected_race.is_none());
        assert_eq!(state.selected_stage, "Stage 1");
        assert!(state.results.is_empty());
        assert!(!state.is_loading);
        assert!(state.error_message.is_none());
        assert_eq!(controller.catalog().len(), 4);
    }

    #[tokio::test]
    async fn test_static_catalog_is_not_fetched() {
        let mut controller = SelectionController::new(
            backend(),
            CatalogSource::Static(RaceCatalog::devops_default().list_races().to_vec()),
            AdminCapability::Disabled,
        );
        controller.load_catalog().await.unwrap();
        assert_eq!(*controller.backend().races_calls.lock().unwrap(), 0);
        assert_eq!(controller.catalog().len(), 4);
    }

    #[tokio::test]
    async fn test_catalog_load_failure() {
        let mut controller = SelectionController::new(
            FakeBackend {
                fail_races: true,
                ..Default::default()
            },
            CatalogSource::Remote,
            AdminCapability::Enabled,
        );
        let err = controller.load_catalog().await.unwrap_err();
        assert!(matches!(err, PredictorError::CatalogLoad(_)));
        assert_eq!(
            controller.state().error_message.as_deref(),
            Some(MSG_CATALOG_LOAD)
        );
    }

    #[tokio::test]
    async fn test_select_single_stage_race() {
        let mut controller = remote_controller(backend()).await;
        controller
            .select_race(entry(1, "Milano-Sanremo", "One_Day", 0))
            .await
            .unwrap();

        assert_eq!(controller.backend().predict_calls(), vec![0]);
        let state = controller.state();
        assert!(state.stages.is_empty());
        assert_eq!(state.phase, Phase::Loaded);
        assert!(!state.is_loading);
        assert_eq!(state.results.len(), 2);
        assert_eq!(state.results[0].score, "45.67");
        assert_eq!(state.results[1].score, "10.00");
    }

    #[tokio::test]
    async fn test_select_multi_stage_race_autoselects_first_stage() {
        let mut controller = remote_controller(backend()).await;
        controller
            .select_race(entry(4, "Tour de Suisse", "Stage 3", 12))
            .await
            .unwrap();

        let state = controller.state();
        assert_eq!(state.stages, vec!["Stage 1", "Stage 2", "Stage 3"]);
        assert_eq!(state.selected_stage, "Stage 1");
        assert_eq!(controller.backend().predict_calls(), vec![10]);
        assert_eq!(state.results[0].name, "Rider 10");
    }

    #[tokio::test]
    async fn test_select_race_clears_previous_stages() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_by_name("Tour de Suisse").await.unwrap();
        assert_eq!(controller.state().stages.len(), 3);

        controller.select_race_by_name("Milano-Sanremo").await.unwrap();
        assert!(controller.state().stages.is_empty());
        assert_eq!(controller.backend().predict_calls(), vec![10, 0]);
    }

    #[tokio::test]
    async fn test_missing_first_stage_is_reported() {
        let mut controller = remote_controller(backend()).await;
        let err = controller.select_race_by_name("Dauphiné").await.unwrap_err();

        assert!(matches!(err, PredictorError::StageResolution { .. }));
        let state = controller.state();
        assert_eq!(state.stages, vec!["Stage 1", "Stage 2", "Stage 3"]);
        assert_eq!(state.error_message.as_deref(), Some(MSG_RACE_SELECTION));
        assert_eq!(state.phase, Phase::Error);
        assert!(controller.backend().predict_calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_first_stage_clears_previous_results() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_by_name("Milano-Sanremo").await.unwrap();
        assert!(!controller.state().results.is_empty());

        assert!(controller.select_race_by_name("Dauphiné").await.is_err());

        let state = controller.state();
        assert_eq!(
            state.selected_race.as_ref().map(|r| r.name.as_str()),
            Some("Dauphiné")
        );
        assert_eq!(state.phase, Phase::Error);
        assert!(state.results.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_unrecognised_stage_label_is_single_stage() {
        let mut controller = remote_controller(FakeBackend {
            races: vec![entry(9, "Tour de Romandie", "Prologue", 7)],
            ..Default::default()
        })
        .await;
        controller.select_race_by_name("Tour de Romandie").await.unwrap();

        assert_eq!(controller.backend().predict_calls(), vec![7]);
        assert!(controller.state().stages.is_empty());
        assert_eq!(controller.state().phase, Phase::Loaded);
    }

    #[tokio::test]
    async fn test_oversized_stage_number_does_not_expand() {
        let mut controller = remote_controller(FakeBackend {
            races: vec![entry(9, "Tour de Pologne", "Stage 5000000", 32)],
            ..Default::default()
        })
        .await;
        controller.select_race_by_name("Tour de Pologne").await.unwrap();

        assert!(controller.state().stages.is_empty());
        assert_eq!(controller.backend().predict_calls(), vec![32]);
    }

    #[tokio::test]
    async fn test_select_race_stage_recovers_from_missing_first_stage() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_stage("Dauphiné", 2).await.unwrap();

        let state = controller.state();
        assert_eq!(state.selected_stage, "Stage 2");
        assert_eq!(state.phase, Phase::Loaded);
        assert!(state.error_message.is_none());
        assert_eq!(state.results[0].name, "Rider 20");
        assert_eq!(controller.backend().predict_calls(), vec![20]);
    }

    #[tokio::test]
    async fn test_select_race_stage_first_stage_fetches_once() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_stage("Tour de Suisse", 1).await.unwrap();
        assert_eq!(controller.backend().predict_calls(), vec![10]);

        controller.select_race_stage("Tour de Suisse", 3).await.unwrap();
        assert_eq!(controller.backend().predict_calls(), vec![10, 10, 12]);
        assert_eq!(controller.state().selected_stage, "Stage 3");
    }

    #[tokio::test]
    async fn test_select_race_stage_one_day_ignores_stage() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_stage("Milano-Sanremo", 4).await.unwrap();
        assert_eq!(controller.backend().predict_calls(), vec![0]);
        assert!(controller.state().stages.is_empty());
    }

    #[tokio::test]
    async fn test_select_race_stage_unknown_stage_reports() {
        let mut controller = remote_controller(backend()).await;
        let err = controller.select_race_stage("Dauphiné", 1).await.unwrap_err();
        assert!(matches!(err, PredictorError::StageResolution { .. }));
        assert!(controller.backend().predict_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_race_name() {
        let mut controller = remote_controller(backend()).await;
        let err = controller.select_race_by_name("Strade Bianche").await.unwrap_err();
        assert!(matches!(err, PredictorError::UnknownRace(_)));
        assert!(controller.backend().predict_calls().is_empty());
    }

    #[tokio::test]
    async fn test_select_stage_fetches_matching_entry() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_by_name("Tour de Suisse").await.unwrap();
        controller.select_stage("Stage 3").await.unwrap();

        assert_eq!(controller.state().selected_stage, "Stage 3");
        assert_eq!(controller.backend().predict_calls(), vec![10, 12]);
        assert_eq!(controller.state().results[0].name, "Rider 12");
    }

    #[tokio::test]
    async fn test_select_unknown_stage_issues_no_fetch() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_by_name("Tour de Suisse").await.unwrap();
        let before = controller.state().results.clone();

        let err = controller.select_stage("Stage 9").await.unwrap_err();

        assert!(matches!(err, PredictorError::StageResolution { .. }));
        assert_eq!(controller.state().selected_stage, "Stage 9");
        assert_eq!(controller.state().results, before);
        assert_eq!(controller.backend().predict_calls(), vec![10]);
        assert_eq!(
            controller.state().error_message.as_deref(),
            Some(MSG_STAGE_RESOLUTION)
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_clears_results() {
        let mut controller = remote_controller(FakeBackend {
            races: races(),
            failing_indices: [11].into_iter().collect(),
            ..Default::default()
        })
        .await;
        controller.select_race_by_name("Tour de Suisse").await.unwrap();
        assert!(!controller.state().results.is_empty());

        let err = controller.select_stage("Stage 2").await.unwrap_err();

        assert!(matches!(err, PredictorError::PredictionFetch(_)));
        let state = controller.state();
        assert!(state.results.is_empty());
        assert_eq!(state.error_message.as_deref(), Some(MSG_PREDICTION_FETCH));
        assert!(!state.is_loading);
        assert_eq!(state.phase, Phase::Error);
    }

    #[tokio::test]
    async fn test_fetch_failure_during_race_selection_keeps_fetch_message() {
        let mut controller = remote_controller(FakeBackend {
            races: races(),
            failing_indices: [0].into_iter().collect(),
            ..Default::default()
        })
        .await;
        assert!(controller.select_race_by_name("Milano-Sanremo").await.is_err());
        assert_eq!(
            controller.state().error_message.as_deref(),
            Some(MSG_PREDICTION_FETCH)
        );
    }

    #[tokio::test]
    async fn test_successful_fetch_clears_previous_error() {
        let mut controller = remote_controller(FakeBackend {
            races: races(),
            failing_indices: [11].into_iter().collect(),
            ..Default::default()
        })
        .await;
        controller.select_race_by_name("Tour de Suisse").await.unwrap();
        let _ = controller.select_stage("Stage 2").await;
        controller.select_stage("Stage 3").await.unwrap();

        assert!(controller.state().error_message.is_none());
        assert_eq!(controller.state().phase, Phase::Loaded);
    }

    #[test]
    fn test_begin_fetch_sets_loading() {
        let mut controller =
            SelectionController::new(backend(), CatalogSource::Remote, AdminCapability::Disabled);
        let ticket = controller.begin_fetch(5);
        assert_eq!(ticket.index(), 5);
        assert!(controller.state().is_loading);
        assert_eq!(controller.state().phase, Phase::Loading);
        assert!(controller.state().error_message.is_none());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut controller =
            SelectionController::new(backend(), CatalogSource::Remote, AdminCapability::Disabled);
        let first = controller.begin_fetch(1);
        let second = controller.begin_fetch(2);
        assert!(second.seq() > first.seq());

        // Newer request resolves first
        let outcome = controller.complete_fetch(second, Ok(ranked(3))).unwrap();
        assert_eq!(outcome, FetchOutcome::Applied);

        // Older one arrives late and must not overwrite
        let outcome = controller.complete_fetch(first, Ok(ranked(7))).unwrap();
        assert_eq!(outcome, FetchOutcome::Stale);
        assert_eq!(controller.state().results.len(), 3);
        assert!(!controller.state().is_loading);
    }

    #[test]
    fn test_stale_failure_is_discarded() {
        let mut controller =
            SelectionController::new(backend(), CatalogSource::Remote, AdminCapability::Disabled);
        let first = controller.begin_fetch(1);
        let second = controller.begin_fetch(2);

        let late_error = Err(PredictorError::PredictionFetch(ClientError::Malformed(
            "late".to_string(),
        )));
        assert_eq!(
            controller.complete_fetch(first, late_error).unwrap(),
            FetchOutcome::Stale
        );
        assert!(controller.state().is_loading);
        assert!(controller.state().error_message.is_none());

        controller.complete_fetch(second, Ok(ranked(2))).unwrap();
        assert_eq!(controller.state().phase, Phase::Loaded);
    }

    #[tokio::test]
    async fn test_toggle_show_all() {
        let mut controller =
            SelectionController::new(backend(), CatalogSource::Remote, AdminCapability::Disabled);
        let ticket = controller.begin_fetch(0);
        controller.complete_fetch(ticket, Ok(ranked(25))).unwrap();
        let calls_before = controller.backend().predict_calls();

        assert_eq!(controller.visible_results().len(), TOP_N);
        controller.toggle_show_all();
        assert!(controller.state().show_all);
        assert_eq!(controller.visible_results().len(), 25);
        controller.toggle_show_all();
        assert_eq!(controller.visible_results().len(), TOP_N);

        assert_eq!(controller.state().results.len(), 25);
        assert_eq!(controller.backend().predict_calls(), calls_before);
    }

    #[test]
    fn test_visible_results_short_list() {
        let mut controller =
            SelectionController::new(backend(), CatalogSource::Remote, AdminCapability::Disabled);
        let ticket = controller.begin_fetch(0);
        controller.complete_fetch(ticket, Ok(ranked(4))).unwrap();
        assert_eq!(controller.visible_results().len(), 4);
    }

    #[tokio::test]
    async fn test_redeploy_requires_admin() {
        let mut controller =
            SelectionController::new(backend(), CatalogSource::Remote, AdminCapability::Disabled);
        let err = controller.redeploy(3).await.unwrap_err();
        assert!(matches!(err, PredictorError::AdminUnavailable));
        assert!(controller.backend().redeploy_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redeploy_success_resets_session() {
        let mut controller = remote_controller(backend()).await;
        controller.select_race_by_name("Tour de Suisse").await.unwrap();

        let response = controller.redeploy(10).await.unwrap();

        assert_eq!(response.message.as_deref(), Some("Model redeployed successfully"));
        assert_eq!(*controller.backend().redeploy_calls.lock().unwrap(), vec![10]);
        assert_eq!(*controller.backend().races_calls.lock().unwrap(), 2);
        assert_eq!(*controller.state(), SelectionState::default());
        assert_eq!(controller.catalog().len(), races().len());
    }

    #[tokio::test]
    async fn test_redeploy_invalidates_in_flight_fetch() {
        let mut controller = remote_controller(backend()).await;
        let ticket = controller.begin_fetch(10);
        controller.redeploy(10).await.unwrap();

        let outcome = controller.complete_fetch(ticket, Ok(ranked(5))).unwrap();
        assert_eq!(outcome, FetchOutcome::Stale);
        assert!(controller.state().results.is_empty());
    }

    #[tokio::test]
    async fn test_redeploy_failure_keeps_state() {
        let mut controller = remote_controller(FakeBackend {
            races: races(),
            fail_redeploy: true,
            ..Default::default()
        })
        .await;
        controller.select_race_by_name("Milano-Sanremo").await.unwrap();
        let results_before = controller.state().results.clone();

        let err = controller.redeploy(0).await.unwrap_err();

        assert!(matches!(err, PredictorError::Redeploy(_)));
        let state = controller.state();
        assert_eq!(state.error_message.as_deref(), Some(MSG_REDEPLOY));
        assert_eq!(state.results, results_before);
        assert_eq!(
            state.selected_race.as_ref().map(|r| r.name.as_str()),
            Some("Milano-Sanremo")
        );
    }

    #[test]
    fn test_state_serializes() {
        let json = serde_json::to_value(SelectionState::default()).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["selected_stage"], "Stage 1");
        assert_eq!(json["show_all"], false);
    }
}
