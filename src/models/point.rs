//! Scheduled matches, their individual points, and table slots.

use crate::models::contest::{ContestId, PointType};
use crate::models::error::StoreError;
use crate::models::team::TeamId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row id of a scheduled match (`contest_match`).
pub type MatchId = i64;

/// Row id of a match point (`contest_match_detail`). Lower ids were created earlier.
pub type PointId = i64;

/// Row id of a club member appearing in a lineup.
pub type MemberId = i64;

/// Where a match point sits on the table board.
///
/// Stored as `null` (never assigned), `"--"` (table freed by relocation), `"Next"`
/// (overflow queue) or the table number as a string.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Option<String>", into = "Option<String>")]
pub enum TableSlot {
    #[default]
    Unassigned,
    Freed,
    Next,
    Table(u32),
}

impl TableSlot {
    pub const FREED: &'static str = "--";
    pub const NEXT: &'static str = "Next";

    /// Parse the stored column value.
    pub fn parse(raw: Option<&str>) -> Result<Self, StoreError> {
        let Some(raw) = raw else {
            return Ok(TableSlot::Unassigned);
        };
        match raw.trim() {
            "" => Ok(TableSlot::Unassigned),
            Self::FREED => Ok(TableSlot::Freed),
            Self::NEXT => Ok(TableSlot::Next),
            other => match other.parse::<u32>() {
                Ok(n) if n > 0 => Ok(TableSlot::Table(n)),
                _ => Err(StoreError::InvalidColumn {
                    column: "table_no",
                    value: raw.to_string(),
                }),
            },
        }
    }

    /// Column value for the store.
    pub fn to_column(self) -> Option<String> {
        match self {
            TableSlot::Unassigned => None,
            TableSlot::Freed => Some(Self::FREED.to_string()),
            TableSlot::Next => Some(Self::NEXT.to_string()),
            TableSlot::Table(n) => Some(n.to_string()),
        }
    }

    pub fn table(self) -> Option<u32> {
        match self {
            TableSlot::Table(n) => Some(n),
            _ => None,
        }
    }

    /// Neither on a table nor queued.
    pub fn is_untabled(self) -> bool {
        matches!(self, TableSlot::Unassigned | TableSlot::Freed)
    }
}

impl TryFrom<Option<String>> for TableSlot {
    type Error = StoreError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        TableSlot::parse(value.as_deref())
    }
}

impl From<TableSlot> for Option<String> {
    fn from(slot: TableSlot) -> Self {
        slot.to_column()
    }
}

impl fmt::Display for TableSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSlot::Unassigned => write!(f, "unassigned"),
            TableSlot::Freed => write!(f, "{}", Self::FREED),
            TableSlot::Next => write!(f, "{}", Self::NEXT),
            TableSlot::Table(n) => write!(f, "table {n}"),
        }
    }
}

/// A point score, stored as `"a:b"` (team 1 first).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Score {
    pub team1: u32,
    pub team2: u32,
}

impl Score {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidColumn {
            column: "score",
            value: raw.to_string(),
        };
        let (a, b) = raw.trim().split_once(':').ok_or_else(invalid)?;
        Ok(Score {
            team1: a.trim().parse().map_err(|_| invalid())?,
            team2: b.trim().parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for Score {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Score::parse(&value)
    }
}

impl From<Score> for String {
    fn from(score: Score) -> Self {
        score.to_string()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.team1, self.team2)
    }
}

/// A scheduled pairing between two teams. Bracket and round-robin contests both
/// record their real matches here; the points hang off it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContestMatch {
    pub id: MatchId,
    pub contest_id: ContestId,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
    pub round: u32,
    pub sequence: u32,
    /// Aggregated outcome for round-robin contests. Brackets keep theirs in the structure.
    pub winner_team_id: Option<TeamId>,
}

impl ContestMatch {
    /// True if this match is between `a` and `b`, in either order.
    pub fn is_pairing(&self, a: TeamId, b: TeamId) -> bool {
        (self.team1_id == a && self.team2_id == b) || (self.team1_id == b && self.team2_id == a)
    }
}

/// A single game within a match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchPoint {
    pub id: PointId,
    pub match_id: MatchId,
    pub sequence: u32,
    pub point_type: PointType,
    pub table_slot: TableSlot,
    pub team1_member_ids: Vec<MemberId>,
    pub team2_member_ids: Vec<MemberId>,
    pub score: Option<Score>,
    pub winner_team_id: Option<TeamId>,
}

impl MatchPoint {
    /// A fresh, unscored point with no lineups.
    pub fn new(id: PointId, match_id: MatchId, sequence: u32, point_type: PointType) -> Self {
        Self {
            id,
            match_id,
            sequence,
            point_type,
            table_slot: TableSlot::Unassigned,
            team1_member_ids: Vec::new(),
            team2_member_ids: Vec::new(),
            score: None,
            winner_team_id: None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    pub fn lineups_submitted(&self) -> bool {
        !self.team1_member_ids.is_empty() && !self.team2_member_ids.is_empty()
    }

    /// Ready to be played: both lineups in, no score yet.
    pub fn is_ready(&self) -> bool {
        !self.is_scored() && self.lineups_submitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_slot_column_values() {
        assert_eq!(TableSlot::parse(None).unwrap(), TableSlot::Unassigned);
        assert_eq!(TableSlot::parse(Some("--")).unwrap(), TableSlot::Freed);
        assert_eq!(TableSlot::parse(Some("Next")).unwrap(), TableSlot::Next);
        assert_eq!(TableSlot::parse(Some("3")).unwrap(), TableSlot::Table(3));
        assert!(TableSlot::parse(Some("0")).is_err());
        assert!(TableSlot::parse(Some("later")).is_err());
        assert_eq!(TableSlot::Table(12).to_column().as_deref(), Some("12"));
        assert_eq!(TableSlot::Unassigned.to_column(), None);
    }

    #[test]
    fn table_slot_json_matches_column() {
        let json = serde_json::to_string(&vec![TableSlot::Unassigned, TableSlot::Next, TableSlot::Table(2)]).unwrap();
        assert_eq!(json, r#"[null,"Next","2"]"#);
    }

    #[test]
    fn score_parses_with_spaces() {
        assert_eq!(Score::parse(" 11 : 7").unwrap(), Score { team1: 11, team2: 7 });
        assert!(Score::parse("11-7").is_err());
        assert_eq!(Score { team1: 3, team2: 11 }.to_string(), "3:11");
    }
}
