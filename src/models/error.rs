//! Error types for the engine and the store.

use crate::models::bracket::{MatchRef, Slot};
use crate::models::contest::{ContestId, ContestStatus, MatchMode};
use crate::models::point::PointId;
use crate::models::team::TeamId;
use thiserror::Error;

/// Failures reading or writing the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed JSON column: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid value {value:?} in column {column}")]
    InvalidColumn { column: &'static str, value: String },
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Errors that can occur during contest operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bracket generation needs at least two teams.
    #[error("need at least 2 teams to build a bracket (have {found})")]
    NotEnoughTeams { found: usize },
    #[error("table count must be at least 1 (got {0})")]
    InvalidTableCount(u32),
    #[error("a match needs at least one point (got {0})")]
    InvalidTotalPoints(u32),
    /// The operation does not apply to the contest's mode.
    #[error("operation not available in {0:?} mode")]
    WrongMode(MatchMode),
    #[error("not allowed while the contest is {0:?}")]
    WrongStatus(ContestStatus),
    #[error("team name must not be empty")]
    InvalidTeamName,
    #[error("team {team} is already placed in round {round}")]
    DuplicatePlacement { team: TeamId, round: u32 },
    #[error("team {0} is not entered in this contest")]
    TeamNotInContest(TeamId),
    #[error("no bracket match at {0}")]
    NoSuchMatch(MatchRef),
    #[error("slot {slot} at {at} is already taken by team {team}")]
    SlotTaken { at: MatchRef, slot: Slot, team: TeamId },
    /// Only first-round, non-bye slots take manual placements; the rest are filled by progression.
    #[error("slot {slot} at {at} is filled by progression, not placement")]
    NotPlaceable { at: MatchRef, slot: Slot },
    #[error("bracket has room for {capacity} teams, got {found}")]
    TooManyTeams { capacity: usize, found: usize },
    #[error("match point {0} not found")]
    PointNotFound(PointId),
    #[error("match point {0} cannot be relocated onto itself")]
    SelfRelocation(PointId),
    #[error("match point {0} is not on a table")]
    SourceNotTabled(PointId),
    #[error("match point {point} is already scored; table {table} is no longer its to give")]
    SourceScored { point: PointId, table: u32 },
    #[error("table {table} is held by match point {point}")]
    TableTaken { table: u32, point: PointId },
    #[error("match point {point} cannot take a table: {reason}")]
    TargetNotEligible { point: PointId, reason: &'static str },
    /// Relocation wrote the target but failed to free the source; not rolled back.
    #[error("point {to_point} now holds table {table} but point {from_point} could not be freed: {cause}")]
    PartialRelocation {
        table: u32,
        from_point: PointId,
        to_point: PointId,
        #[source]
        cause: StoreError,
    },
    #[error("corrupt bracket: {0}")]
    CorruptBracket(String),
    #[error("contest {0} not found")]
    ContestNotFound(ContestId),
    #[error("contest {0} has no bracket yet")]
    BracketNotConfigured(ContestId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("contest worker has shut down")]
    WorkerClosed,
}

impl EngineError {
    /// Errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            EngineError::Store(_) | EngineError::WorkerClosed | EngineError::CorruptBracket(_) | EngineError::PartialRelocation { .. }
        )
    }
}
