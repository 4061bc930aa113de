//! Backing store for contests, teams, matches and points.
//!
//! The engine reads whole rows and writes targeted fields; nothing here spans
//! more than one row, so callers must not assume multi-row atomicity.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{
    BracketDocument, Contest, ContestId, ContestMatch, ContestStatus, MatchId, MatchPoint, MemberId, PointId,
    PointType, Score, StoreError, TableSlot, Team, TeamId,
};

/// Relational store the engine runs against.
pub trait AssignmentStore: Send + Sync {
    fn insert_contest(&self, contest: &Contest) -> Result<(), StoreError>;
    fn load_contest(&self, id: ContestId) -> Result<Contest, StoreError>;
    fn set_contest_status(&self, id: ContestId, status: ContestStatus) -> Result<(), StoreError>;

    fn insert_team(&self, contest_id: ContestId, name: &str) -> Result<Team, StoreError>;
    /// Teams in entry order.
    fn load_teams(&self, contest_id: ContestId) -> Result<Vec<Team>, StoreError>;

    fn load_bracket(&self, contest_id: ContestId) -> Result<Option<BracketDocument>, StoreError>;
    fn save_bracket(&self, contest_id: ContestId, doc: &BracketDocument) -> Result<(), StoreError>;

    fn insert_match(
        &self,
        contest_id: ContestId,
        team1_id: TeamId,
        team2_id: TeamId,
        round: u32,
        sequence: u32,
    ) -> Result<ContestMatch, StoreError>;
    /// Matches in creation order.
    fn load_matches(&self, contest_id: ContestId) -> Result<Vec<ContestMatch>, StoreError>;
    fn set_match_winner(&self, match_id: MatchId, winner: Option<TeamId>) -> Result<(), StoreError>;

    fn insert_point(&self, match_id: MatchId, sequence: u32, point_type: PointType) -> Result<MatchPoint, StoreError>;
    /// Every point of every match in the contest, in creation order.
    fn load_points(&self, contest_id: ContestId) -> Result<Vec<MatchPoint>, StoreError>;
    fn load_point(&self, point_id: PointId) -> Result<MatchPoint, StoreError>;
    fn set_table_slot(&self, point_id: PointId, slot: TableSlot) -> Result<(), StoreError>;
    fn set_lineups(&self, point_id: PointId, team1: &[MemberId], team2: &[MemberId]) -> Result<(), StoreError>;
    fn set_score(&self, point_id: PointId, score: Option<Score>, winner: Option<TeamId>) -> Result<(), StoreError>;
}
