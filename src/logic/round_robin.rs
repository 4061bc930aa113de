//! League play: schedule generation, match outcomes and standings.

use crate::logic::progression::match_winner;
use crate::logic::setup::{advance_status, load_contest};
use crate::models::{
    ContestId, ContestMatch, ContestStatus, EngineError, MatchId, MatchPoint, Team, TeamId, TeamStanding,
};
use crate::store::AssignmentStore;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashMap;

/// A pairing produced by the schedule generator, before it is stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pairing {
    pub round: u32,
    pub sequence: u32,
    pub team1: TeamId,
    pub team2: TeamId,
}

/// Every team meets every other team once (circle method).
///
/// With an odd number of teams one team sits out each round. `sequence` numbers
/// pairings across the whole schedule.
pub fn generate_round_robin(teams: &[TeamId]) -> Vec<Pairing> {
    let mut slots: Vec<Option<TeamId>> = teams.iter().copied().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let n = slots.len();
    if n < 2 {
        return Vec::new();
    }

    let mut pairings = Vec::new();
    let mut sequence = 0;
    for round in 1..n as u32 {
        for i in 0..n / 2 {
            if let (Some(team1), Some(team2)) = (slots[i], slots[n - 1 - i]) {
                sequence += 1;
                pairings.push(Pairing {
                    round,
                    sequence,
                    team1,
                    team2,
                });
            }
        }
        // Keep the first slot fixed and rotate the rest.
        slots[1..].rotate_right(1);
    }
    pairings
}

/// Generate and store the league schedule, one point row per configured point.
///
/// With `shuffle` the team order is randomised first; otherwise entry order is
/// used and the schedule is deterministic.
pub fn schedule_contest(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    shuffle: bool,
) -> Result<Vec<ContestMatch>, EngineError> {
    let contest = load_contest(store, contest_id)?;
    if contest.match_mode.is_bracket() {
        return Err(EngineError::WrongMode(contest.match_mode));
    }
    if contest.status != ContestStatus::Setup {
        return Err(EngineError::WrongStatus(contest.status));
    }
    let mut teams: Vec<TeamId> = store.load_teams(contest_id)?.iter().map(|t| t.id).collect();
    if teams.len() < 2 {
        return Err(EngineError::NotEnoughTeams { found: teams.len() });
    }
    if shuffle {
        teams.shuffle(&mut rand::thread_rng());
    }

    let mut created = Vec::new();
    for pairing in generate_round_robin(&teams) {
        let m = store.insert_match(contest_id, pairing.team1, pairing.team2, pairing.round, pairing.sequence)?;
        for sequence in 1..=contest.total_points {
            store.insert_point(m.id, sequence, contest.point_type_at(sequence))?;
        }
        created.push(m);
    }
    advance_status(store, &contest, ContestStatus::InProgress)?;
    log::info!(
        "Scheduled {} matches for contest {} ({} teams)",
        created.len(),
        contest_id,
        teams.len()
    );
    Ok(created)
}

/// League table: decided matches count as played; ties on wins break on point
/// difference, then team id.
pub fn standings(teams: &[Team], matches: &[ContestMatch], points: &[MatchPoint], total_points: u32) -> Vec<TeamStanding> {
    let mut table: HashMap<TeamId, TeamStanding> = teams.iter().map(|t| (t.id, TeamStanding::new(t.id))).collect();

    for m in matches {
        for p in points.iter().filter(|p| p.match_id == m.id) {
            let Some(w) = p.winner_team_id else { continue };
            let loser = if w == m.team1_id { m.team2_id } else { m.team1_id };
            table.entry(w).or_insert_with(|| TeamStanding::new(w)).points_won += 1;
            table.entry(loser).or_insert_with(|| TeamStanding::new(loser)).points_lost += 1;
        }
        if let Some(winner) = match_winner(m, points, total_points) {
            let loser = if winner == m.team1_id { m.team2_id } else { m.team1_id };
            let w = table.entry(winner).or_insert_with(|| TeamStanding::new(winner));
            w.played += 1;
            w.wins += 1;
            let l = table.entry(loser).or_insert_with(|| TeamStanding::new(loser));
            l.played += 1;
            l.losses += 1;
        }
    }

    let mut rows: Vec<TeamStanding> = table.into_values().collect();
    rows.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.point_difference().cmp(&a.point_difference()))
            .then(a.team_id.cmp(&b.team_id))
    });
    rows
}

/// Result of aggregating a league contest.
#[derive(Clone, Debug, Serialize)]
pub struct LeagueSummary {
    /// Matches whose stored winner was written by this run.
    pub updated: Vec<MatchId>,
    pub standings: Vec<TeamStanding>,
    pub completed: bool,
}

/// Recompute match winners from points, store the ones that changed, and
/// return the standings. Undecided matches keep whatever winner they had.
pub fn aggregate_contest(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<LeagueSummary, EngineError> {
    let contest = load_contest(store, contest_id)?;
    if contest.match_mode.is_bracket() {
        return Err(EngineError::WrongMode(contest.match_mode));
    }
    let teams = store.load_teams(contest_id)?;
    let matches = store.load_matches(contest_id)?;
    let points = store.load_points(contest_id)?;

    let mut updated = Vec::new();
    let mut undecided = 0;
    for m in &matches {
        match match_winner(m, &points, contest.total_points) {
            Some(winner) if m.winner_team_id != Some(winner) => {
                store.set_match_winner(m.id, Some(winner))?;
                log::debug!("Match {} decided for team {}", m.id, winner);
                updated.push(m.id);
            }
            Some(_) => {}
            None if m.winner_team_id.is_none() => undecided += 1,
            None => {}
        }
    }

    let completed = !matches.is_empty() && undecided == 0;
    if completed {
        advance_status(store, &contest, ContestStatus::Completed)?;
    }
    Ok(LeagueSummary {
        updated,
        standings: standings(&teams, &matches, &points, contest.total_points),
        completed,
    })
}
