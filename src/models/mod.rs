//! Data structures for club contests: contests, teams, brackets, matches and points.

mod bracket;
mod contest;
mod error;
mod point;
mod team;

pub use bracket::{
    Bracket, BracketDocument, BracketMatch, Group, GroupId, MatchRef, NextSlot, Rounds, Section, SeedRecord, Slot,
};
pub use contest::{Contest, ContestId, ContestStatus, MatchMode, PointConfig, PointType};
pub use error::{EngineError, StoreError};
pub use point::{ContestMatch, MatchId, MatchPoint, MemberId, PointId, Score, TableSlot};
pub use team::{Team, TeamId, TeamStanding};
