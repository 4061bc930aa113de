//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use club_tournament_web::models::{MatchId, MemberId, PointType};
use club_tournament_web::{
    AssignmentStore, BracketDocument, Contest, ContestId, ContestMatch, ContestStatus, MatchMode, MatchPoint,
    MemoryStore, PointId, Score, StoreError, TableSlot, Team, TeamId,
};

/// Wraps a memory store and injects failures: slot writes for one point,
/// and optionally every single-point read.
pub struct FailingStore {
    pub inner: MemoryStore,
    pub refuse_slot: Option<PointId>,
    pub fail_point_reads: bool,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            refuse_slot: None,
            fail_point_reads: false,
        }
    }
}

impl AssignmentStore for FailingStore {
    fn insert_contest(&self, contest: &Contest) -> Result<(), StoreError> {
        self.inner.insert_contest(contest)
    }
    fn load_contest(&self, id: ContestId) -> Result<Contest, StoreError> {
        self.inner.load_contest(id)
    }
    fn set_contest_status(&self, id: ContestId, status: ContestStatus) -> Result<(), StoreError> {
        self.inner.set_contest_status(id, status)
    }
    fn insert_team(&self, contest_id: ContestId, name: &str) -> Result<Team, StoreError> {
        self.inner.insert_team(contest_id, name)
    }
    fn load_teams(&self, contest_id: ContestId) -> Result<Vec<Team>, StoreError> {
        self.inner.load_teams(contest_id)
    }
    fn load_bracket(&self, contest_id: ContestId) -> Result<Option<BracketDocument>, StoreError> {
        self.inner.load_bracket(contest_id)
    }
    fn save_bracket(&self, contest_id: ContestId, doc: &BracketDocument) -> Result<(), StoreError> {
        self.inner.save_bracket(contest_id, doc)
    }
    fn insert_match(
        &self,
        contest_id: ContestId,
        team1_id: TeamId,
        team2_id: TeamId,
        round: u32,
        sequence: u32,
    ) -> Result<ContestMatch, StoreError> {
        self.inner.insert_match(contest_id, team1_id, team2_id, round, sequence)
    }
    fn load_matches(&self, contest_id: ContestId) -> Result<Vec<ContestMatch>, StoreError> {
        self.inner.load_matches(contest_id)
    }
    fn set_match_winner(&self, match_id: MatchId, winner: Option<TeamId>) -> Result<(), StoreError> {
        self.inner.set_match_winner(match_id, winner)
    }
    fn insert_point(&self, match_id: MatchId, sequence: u32, point_type: PointType) -> Result<MatchPoint, StoreError> {
        self.inner.insert_point(match_id, sequence, point_type)
    }
    fn load_points(&self, contest_id: ContestId) -> Result<Vec<MatchPoint>, StoreError> {
        self.inner.load_points(contest_id)
    }
    fn load_point(&self, point_id: PointId) -> Result<MatchPoint, StoreError> {
        if self.fail_point_reads {
            return Err(StoreError::Poisoned);
        }
        self.inner.load_point(point_id)
    }
    fn set_table_slot(&self, point_id: PointId, slot: TableSlot) -> Result<(), StoreError> {
        if self.refuse_slot == Some(point_id) {
            return Err(StoreError::Poisoned);
        }
        self.inner.set_table_slot(point_id, slot)
    }
    fn set_lineups(&self, point_id: PointId, team1: &[MemberId], team2: &[MemberId]) -> Result<(), StoreError> {
        self.inner.set_lineups(point_id, team1, team2)
    }
    fn set_score(&self, point_id: PointId, score: Option<Score>, winner: Option<TeamId>) -> Result<(), StoreError> {
        self.inner.set_score(point_id, score, winner)
    }
}

/// League contest with one match of `n` ready points. Returns the contest and point ids.
pub fn league_with_ready_points(store: &dyn AssignmentStore, table_count: u32, n: u32) -> (ContestId, Vec<PointId>) {
    let contest = Contest::new("Thursday league", MatchMode::RoundRobin, table_count, n);
    store.insert_contest(&contest).unwrap();
    let home = store.insert_team(contest.id, "Home").unwrap();
    let away = store.insert_team(contest.id, "Away").unwrap();
    let m = store.insert_match(contest.id, home.id, away.id, 1, 1).unwrap();
    let ids = (1..=n)
        .map(|seq| {
            let p = store.insert_point(m.id, seq, PointType::Single).unwrap();
            store.set_lineups(p.id, &[1], &[2]).unwrap();
            p.id
        })
        .collect();
    (contest.id, ids)
}
