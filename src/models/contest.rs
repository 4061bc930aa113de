//! Contest and its match settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a contest.
pub type ContestId = Uuid;

/// How matches are organised in a contest.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// League play: every team meets every other team, tables assigned dynamically.
    #[default]
    RoundRobin,
    /// Single elimination bracket.
    Elimination,
    /// Single elimination with a seeds record for manual placement.
    SeedElimination,
    /// Two independent brackets whose winners meet in a final.
    DualGroupElimination,
}

impl MatchMode {
    pub fn is_bracket(self) -> bool {
        !matches!(self, MatchMode::RoundRobin)
    }
}

/// Singles or doubles.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    #[default]
    Single,
    Double,
}

/// Configuration for one point of a match (ordered by sequence).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PointConfig {
    #[serde(rename = "type")]
    pub point_type: PointType,
    #[serde(default)]
    pub note: String,
}

/// Lifecycle of a contest. The engine only ever moves it forward.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestStatus {
    /// Teams being entered; no matches yet.
    #[default]
    Setup,
    /// Matches generated, results arriving.
    InProgress,
    /// A champion has been decided (bracket) or every match is decided (round robin).
    Completed,
}

/// A contest: mode, tables, and per-match point layout.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub id: ContestId,
    pub name: String,
    pub match_mode: MatchMode,
    /// Physical tables available for simultaneous points.
    pub table_count: u32,
    /// Points per match.
    pub total_points: u32,
    pub points_config: Vec<PointConfig>,
    pub status: ContestStatus,
}

impl Contest {
    /// Create a contest in Setup with `total_points` singles points.
    pub fn new(name: impl Into<String>, match_mode: MatchMode, table_count: u32, total_points: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            match_mode,
            table_count,
            total_points,
            points_config: vec![PointConfig::default(); total_points as usize],
            status: ContestStatus::Setup,
        }
    }

    /// Replace the point layout; `total_points` follows its length.
    pub fn with_points_config(mut self, points_config: Vec<PointConfig>) -> Self {
        self.total_points = points_config.len() as u32;
        self.points_config = points_config;
        self
    }

    /// Point type for a 1-based sequence number, falling back to singles past the configured list.
    pub fn point_type_at(&self, sequence: u32) -> PointType {
        sequence
            .checked_sub(1)
            .and_then(|i| self.points_config.get(i as usize))
            .map(|c| c.point_type)
            .unwrap_or_default()
    }
}
