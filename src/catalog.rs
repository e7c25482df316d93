//! Race catalog
//!
//! Holds the selectable races and derives stage lists for multi-stage races.
//! The catalog is either a fixed table compiled into the client or the result
//! of a `GET /races` call made once per session.

use regex::Regex;

use crate::models::{RaceEntry, RaceId, ONE_DAY};

/// Where the catalog comes from
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// Fixed list, never re-fetched
    Static(Vec<RaceEntry>),
    /// Fetched from the service's `/races` endpoint
    Remote,
}

/// Classification of a stage label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageKind {
    OneDay,
    Stage(u32),
    /// Anything else; treated as single-stage
    Unknown(String),
}

impl StageKind {
    pub fn is_multi_stage(&self) -> bool {
        matches!(self, StageKind::Stage(_))
    }
}

/// Highest stage number accepted from catalog data. Grand tours run 21 stages.
pub const MAX_STAGES: u32 = 50;

/// Label for stage `n`, e.g. "Stage 3"
pub fn stage_label(n: u32) -> String {
    format!("Stage {}", n)
}

/// Ordered list of races
#[derive(Debug, Clone)]
pub struct RaceCatalog {
    entries: Vec<RaceEntry>,
    stage_pattern: Regex,
}

impl Default for RaceCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RaceCatalog {
    pub fn new(entries: Vec<RaceEntry>) -> Self {
        Self {
            entries,
            stage_pattern: Regex::new(r"^Stage (\d+)$").unwrap(),
        }
    }

    /// Fixed race table of the devops deployment
    pub fn devops_default() -> Self {
        Self::new(fixed_races())
    }

    /// Race table used by the offline synthetic flavour
    pub fn offline_default() -> Self {
        Self::new(fixed_races())
    }

    pub fn list_races(&self) -> &[RaceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unique race names in order of first appearance
    pub fn race_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !names.contains(&entry.name.as_str()) {
                names.push(&entry.name);
            }
        }
        names
    }

    /// First catalog entry carrying `name`
    pub fn first_entry(&self, name: &str) -> Option<&RaceEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Case-insensitive lookup of the first entry carrying `name`
    pub fn find_race(&self, name: &str) -> Option<&RaceEntry> {
        let name = name.trim();
        self.first_entry(name).or_else(|| {
            self.entries
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn stage_kind(&self, label: &str) -> StageKind {
        let label = label.trim();
        if label.is_empty() || label == ONE_DAY || label == "One Day" {
            return StageKind::OneDay;
        }
        match self
            .stage_pattern
            .captures(label)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .filter(|n| (1..=MAX_STAGES).contains(n))
        {
            Some(n) => StageKind::Stage(n),
            None => StageKind::Unknown(label.to_string()),
        }
    }

    pub fn is_multi_stage(&self, entry: &RaceEntry) -> bool {
        self.stage_kind(&entry.stage).is_multi_stage()
    }

    /// Stage labels "Stage 1" .. "Stage N" for a race, N being the highest
    /// stage number present. Empty for single-stage races.
    pub fn stages_for(&self, name: &str) -> Vec<String> {
        let total = self.stage_count(name);
        (1..=total).map(stage_label).collect()
    }

    /// Highest stage number listed for `name`, 0 for single-stage races
    pub fn stage_count(&self, name: &str) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.name == name)
            .map(|e| match self.stage_kind(&e.stage) {
                StageKind::Stage(n) => n,
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// Catalog entry for a given race stage
    pub fn find_stage(&self, name: &str, label: &str) -> Option<&RaceEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.stage.trim() == label.trim())
    }
}

fn fixed_races() -> Vec<RaceEntry> {
    [
        ("tour-de-france", "Tour de France"),
        ("giro-italia", "Giro d'Italia"),
        ("vuelta-espana", "Vuelta a España"),
        ("paris-roubaix", "Paris-Roubaix"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (id, name))| RaceEntry::new(RaceId::Slug(id.to_string()), *name, ONE_DAY, i as i64))
    .collect()
}
