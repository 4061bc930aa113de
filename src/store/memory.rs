//! In-memory store, for tests and ephemeral runs.

use super::AssignmentStore;
use crate::models::{
    BracketDocument, Contest, ContestId, ContestMatch, ContestStatus, MatchId, MatchPoint, MemberId, PointId,
    PointType, Score, StoreError, TableSlot, Team, TeamId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    contests: HashMap<ContestId, Contest>,
    brackets: HashMap<ContestId, BracketDocument>,
    teams: BTreeMap<TeamId, Team>,
    matches: BTreeMap<MatchId, ContestMatch>,
    points: BTreeMap<PointId, MatchPoint>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn point_mut(&mut self, id: PointId) -> Result<&mut MatchPoint, StoreError> {
        self.points
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("match point", id))
    }
}

/// Rows held in maps behind a lock. Ids come from one counter, so creation order is id order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl AssignmentStore for MemoryStore {
    fn insert_contest(&self, contest: &Contest) -> Result<(), StoreError> {
        self.write()?.contests.insert(contest.id, contest.clone());
        Ok(())
    }

    fn load_contest(&self, id: ContestId) -> Result<Contest, StoreError> {
        self.read()?
            .contests
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("contest", id))
    }

    fn set_contest_status(&self, id: ContestId, status: ContestStatus) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let contest = t
            .contests
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("contest", id))?;
        contest.status = status;
        Ok(())
    }

    fn insert_team(&self, contest_id: ContestId, name: &str) -> Result<Team, StoreError> {
        let mut t = self.write()?;
        if !t.contests.contains_key(&contest_id) {
            return Err(StoreError::not_found("contest", contest_id));
        }
        let team = Team::new(t.next_id(), contest_id, name);
        t.teams.insert(team.id, team.clone());
        Ok(team)
    }

    fn load_teams(&self, contest_id: ContestId) -> Result<Vec<Team>, StoreError> {
        Ok(self
            .read()?
            .teams
            .values()
            .filter(|team| team.contest_id == contest_id)
            .cloned()
            .collect())
    }

    fn load_bracket(&self, contest_id: ContestId) -> Result<Option<BracketDocument>, StoreError> {
        Ok(self.read()?.brackets.get(&contest_id).cloned())
    }

    fn save_bracket(&self, contest_id: ContestId, doc: &BracketDocument) -> Result<(), StoreError> {
        self.write()?.brackets.insert(contest_id, doc.clone());
        Ok(())
    }

    fn insert_match(
        &self,
        contest_id: ContestId,
        team1_id: TeamId,
        team2_id: TeamId,
        round: u32,
        sequence: u32,
    ) -> Result<ContestMatch, StoreError> {
        let mut t = self.write()?;
        let m = ContestMatch {
            id: t.next_id(),
            contest_id,
            team1_id,
            team2_id,
            round,
            sequence,
            winner_team_id: None,
        };
        t.matches.insert(m.id, m.clone());
        Ok(m)
    }

    fn load_matches(&self, contest_id: ContestId) -> Result<Vec<ContestMatch>, StoreError> {
        Ok(self
            .read()?
            .matches
            .values()
            .filter(|m| m.contest_id == contest_id)
            .cloned()
            .collect())
    }

    fn set_match_winner(&self, match_id: MatchId, winner: Option<TeamId>) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let m = t
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| StoreError::not_found("match", match_id))?;
        m.winner_team_id = winner;
        Ok(())
    }

    fn insert_point(&self, match_id: MatchId, sequence: u32, point_type: PointType) -> Result<MatchPoint, StoreError> {
        let mut t = self.write()?;
        if !t.matches.contains_key(&match_id) {
            return Err(StoreError::not_found("match", match_id));
        }
        let point = MatchPoint::new(t.next_id(), match_id, sequence, point_type);
        t.points.insert(point.id, point.clone());
        Ok(point)
    }

    fn load_points(&self, contest_id: ContestId) -> Result<Vec<MatchPoint>, StoreError> {
        let t = self.read()?;
        Ok(t.points
            .values()
            .filter(|p| t.matches.get(&p.match_id).map_or(false, |m| m.contest_id == contest_id))
            .cloned()
            .collect())
    }

    fn load_point(&self, point_id: PointId) -> Result<MatchPoint, StoreError> {
        self.read()?
            .points
            .get(&point_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("match point", point_id))
    }

    fn set_table_slot(&self, point_id: PointId, slot: TableSlot) -> Result<(), StoreError> {
        self.write()?.point_mut(point_id)?.table_slot = slot;
        Ok(())
    }

    fn set_lineups(&self, point_id: PointId, team1: &[MemberId], team2: &[MemberId]) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let p = t.point_mut(point_id)?;
        p.team1_member_ids = team1.to_vec();
        p.team2_member_ids = team2.to_vec();
        Ok(())
    }

    fn set_score(&self, point_id: PointId, score: Option<Score>, winner: Option<TeamId>) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let p = t.point_mut(point_id)?;
        p.score = score;
        p.winner_team_id = winner;
        Ok(())
    }
}
