//! Contest teams.

use crate::models::contest::ContestId;
use serde::{Deserialize, Serialize};

/// Row id of a team (`contest_team`).
pub type TeamId = i64;

/// A team entered in exactly one contest.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub contest_id: ContestId,
    pub name: String,
    /// Member id of the captain, if one has been named.
    pub captain_id: Option<i64>,
}

impl Team {
    pub fn new(id: TeamId, contest_id: ContestId, name: impl Into<String>) -> Self {
        Self {
            id,
            contest_id,
            name: name.into(),
            captain_id: None,
        }
    }
}

/// Per-team tally for round-robin contests.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_id: TeamId,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points_won: u32,
    pub points_lost: u32,
}

impl TeamStanding {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            ..Self::default()
        }
    }

    pub fn point_difference(&self) -> i64 {
        i64::from(self.points_won) - i64::from(self.points_lost)
    }
}
