//! Bracket progression: derive match winners from point results and carry them
//! forward through the bracket.
//!
//! [`resync`] recomputes everything from a snapshot of the points every time.
//! It needs no change list and is idempotent: running it on its own output with
//! the same snapshot changes nothing.

use crate::logic::bracket_builder::{load_bracket, save_if_changed};
use crate::logic::setup::{advance_status, load_contest};
use crate::models::{
    Bracket, BracketDocument, BracketMatch, ContestId, ContestMatch, ContestStatus, EngineError, Group, MatchPoint,
    MatchRef, Rounds, Section, TeamId,
};
use crate::store::AssignmentStore;
use serde::Serialize;
use std::collections::HashMap;

/// Winner of a match by strict majority of its points.
///
/// A team needs more than half of the match's points (the recorded point rows, or
/// `total_points` if no rows exist yet). An even split, or too few points played,
/// leaves the match undecided.
pub fn match_winner<'a>(
    m: &ContestMatch,
    points: impl IntoIterator<Item = &'a MatchPoint>,
    total_points: u32,
) -> Option<TeamId> {
    let mut rows = 0u32;
    let (mut wins1, mut wins2) = (0u32, 0u32);
    for p in points.into_iter().filter(|p| p.match_id == m.id) {
        rows += 1;
        match p.winner_team_id {
            Some(w) if w == m.team1_id => wins1 += 1,
            Some(w) if w == m.team2_id => wins2 += 1,
            _ => {}
        }
    }
    let total = if rows > 0 { rows } else { total_points };
    if total == 0 {
        return None;
    }
    let needed = total / 2 + 1;
    if wins1 >= needed {
        Some(m.team1_id)
    } else if wins2 >= needed {
        Some(m.team2_id)
    } else {
        None
    }
}

fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Decided outcomes of the contest's matches, looked up by pairing.
#[derive(Clone, Debug, Default)]
pub struct PointResults {
    by_pair: HashMap<(TeamId, TeamId), Option<TeamId>>,
}

impl PointResults {
    /// When a pairing was scheduled more than once, the latest match counts.
    pub fn new(matches: &[ContestMatch], points: &[MatchPoint], total_points: u32) -> Self {
        let mut by_match: HashMap<i64, Vec<&MatchPoint>> = HashMap::new();
        for p in points {
            by_match.entry(p.match_id).or_default().push(p);
        }
        let mut ordered: Vec<&ContestMatch> = matches.iter().collect();
        ordered.sort_by_key(|m| m.id);

        let mut by_pair = HashMap::new();
        for m in ordered {
            let pts = by_match.get(&m.id).map(Vec::as_slice).unwrap_or(&[]);
            let winner = match_winner(m, pts.iter().copied(), total_points);
            by_pair.insert(pair_key(m.team1_id, m.team2_id), winner);
        }
        Self { by_pair }
    }

    /// Decided winner between `a` and `b`, if they have played one.
    pub fn winner(&self, a: TeamId, b: TeamId) -> Option<TeamId> {
        self.by_pair.get(&pair_key(a, b)).copied().flatten()
    }

    pub fn has_pairing(&self, a: TeamId, b: TeamId) -> bool {
        self.by_pair.contains_key(&pair_key(a, b))
    }
}

/// Winner a match should carry given current slots and results.
///
/// A decided result wins; otherwise a stored winner stands as long as it is still
/// one of the two teams. Bye matches advance their lone team.
fn decide(m: &BracketMatch, results: &PointResults) -> Option<TeamId> {
    match (m.team1_id, m.team2_id) {
        (Some(a), Some(b)) => results
            .winner(a, b)
            .or(m.winner_id.filter(|w| *w == a || *w == b)),
        (Some(a), None) | (None, Some(a)) if m.bye => Some(a),
        _ => None,
    }
}

fn resync_rounds(section: Section, rounds: &mut Rounds, results: &PointResults) {
    for r in 0..rounds.len() {
        for p in 0..rounds[r].len() {
            let m = &mut rounds[r][p];
            let winner = decide(m, results);
            if m.winner_id != winner {
                log::debug!(
                    "{}: winner {:?} -> {:?}",
                    MatchRef::new(section, m.round, m.position),
                    m.winner_id,
                    winner
                );
                m.winner_id = winner;
            }
            let Some(next) = m.next() else { continue };
            if let Some(target) = rounds
                .get_mut(r + 1)
                .zip(next.position.checked_sub(1))
                .and_then(|(round, i)| round.get_mut(i as usize))
            {
                *target.team_mut(next.slot) = winner;
            }
        }
    }
}

/// The team a group sends to the final: its last match's winner, or its only member.
pub fn group_winner(group: &Group) -> Option<TeamId> {
    match group.rounds.last() {
        Some(last) => last.first().and_then(|m| m.winner_id),
        None if group.members.len() == 1 => group.members.first().copied(),
        None => None,
    }
}

/// Recompute every winner and every progression-filled slot from `results`.
///
/// First-round placements are left alone. Later slots always mirror the winner
/// of the match feeding them; in grouped brackets, side 1 of the final is group
/// A's winner and side 2 group B's.
pub fn resync(bracket: &Bracket, results: &PointResults) -> Bracket {
    let mut next = bracket.clone();
    match &mut next {
        Bracket::Plain { rounds, .. } => resync_rounds(Section::Main, rounds, results),
        Bracket::Grouped { groups, final_stage, .. } => {
            for (id, group) in groups.iter_mut() {
                resync_rounds(Section::Group(*id), &mut group.rounds, results);
                let winner = group_winner(group);
                if let Some(fm) = final_stage.first_mut().and_then(|r| r.first_mut()) {
                    *fm.team_mut(id.final_slot()) = winner;
                }
            }
            resync_rounds(Section::Final, final_stage, results);
        }
    }
    next
}

/// Result of a store-backed resync.
#[derive(Clone, Debug, Serialize)]
pub struct ResyncOutcome {
    pub document: BracketDocument,
    /// False when the recomputed bracket equalled the stored one and nothing was written.
    pub changed: bool,
    pub champion: Option<TeamId>,
}

/// Resync the stored bracket against the contest's current points.
///
/// All reads happen before any write; a failed read aborts with the stored
/// bracket untouched. The bracket is written only when it changed.
pub fn resync_contest(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<ResyncOutcome, EngineError> {
    let contest = load_contest(store, contest_id)?;
    let previous = load_bracket(store, contest_id)?;
    let matches = store.load_matches(contest_id)?;
    let points = store.load_points(contest_id)?;

    let results = PointResults::new(&matches, &points, contest.total_points);
    let structure = resync(&previous.structure, &results);
    let document = save_if_changed(store, contest_id, &previous, structure)?;
    let changed = document.version != previous.version;
    let champion = document.structure.champion();

    if changed {
        log::info!("Bracket for contest {} updated to version {}", contest_id, document.version);
    }
    if champion.is_some() {
        advance_status(store, &contest, ContestStatus::Completed)?;
    }

    Ok(ResyncOutcome {
        document,
        changed,
        champion,
    })
}

/// Bracket matches with both teams known but no scheduled match yet.
pub fn pending_pairings(bracket: &Bracket, results: &PointResults) -> Vec<(MatchRef, TeamId, TeamId)> {
    bracket
        .matches()
        .into_iter()
        .filter_map(|(at, m)| match (m.team1_id, m.team2_id) {
            (Some(a), Some(b)) if m.winner_id.is_none() && !results.has_pairing(a, b) => Some((at, a, b)),
            _ => None,
        })
        .collect()
}

/// Create match and point rows for every bracket pairing that is ready to play.
///
/// Returns the newly scheduled matches. Running it again schedules nothing new.
pub fn schedule_pending_matches(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
) -> Result<Vec<ContestMatch>, EngineError> {
    let contest = load_contest(store, contest_id)?;
    let doc = load_bracket(store, contest_id)?;
    let matches = store.load_matches(contest_id)?;
    let points = store.load_points(contest_id)?;
    let results = PointResults::new(&matches, &points, contest.total_points);

    let mut created = Vec::new();
    for (at, a, b) in pending_pairings(&doc.structure, &results) {
        let m = store.insert_match(contest_id, a, b, at.round, at.position)?;
        for sequence in 1..=contest.total_points {
            store.insert_point(m.id, sequence, contest.point_type_at(sequence))?;
        }
        log::info!("Scheduled {} ({} v {}) as match {}", at, a, b, m.id);
        created.push(m);
    }
    if !created.is_empty() {
        advance_status(store, &contest, ContestStatus::InProgress)?;
    }
    Ok(created)
}
