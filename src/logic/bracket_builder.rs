//! Bracket construction and team placement for elimination contests.

use crate::logic::seeding::split_into_groups;
use crate::logic::setup::{load_contest, validate_contest};
use crate::models::{
    Bracket, BracketDocument, BracketMatch, ContestId, EngineError, Group, MatchMode, MatchRef, NextSlot, Rounds,
    Section, SeedRecord, Slot, StoreError, TeamId,
};
use crate::store::AssignmentStore;
use std::collections::{BTreeMap, HashSet};

/// Empty rounds for `team_count` teams.
///
/// The draw is padded to the next power of two: round 1 has `size / 2` matches and
/// every later round half the one before, down to a single match. The padding
/// shows up as bye matches at the end of round 1, so `team_count - 1` matches
/// are actually played. Fewer than two teams need no matches at all.
pub fn build_rounds(team_count: usize) -> Rounds {
    if team_count < 2 {
        return Vec::new();
    }
    let size = team_count.next_power_of_two();
    let round_count = size.trailing_zeros();
    let first_round = size / 2;
    let byes = size - team_count;

    (1..=round_count)
        .map(|round| {
            let matches = (size >> round) as u32;
            (1..=matches)
                .map(|position| {
                    let next = (round < round_count).then(|| NextSlot {
                        position: position.div_ceil(2),
                        slot: Slot::for_position(position),
                    });
                    let mut m = BracketMatch::new(round, position, next);
                    m.bye = round == 1 && position as usize > first_round - byes;
                    m
                })
                .collect()
        })
        .collect()
}

/// Build a fresh bracket for the contest mode. Every slot is empty.
///
/// `seed_count` marks the first teams (in input order) as seeds; in dual-group
/// mode seeds are spread across the groups.
pub fn build_bracket(mode: MatchMode, teams: &[TeamId], seed_count: usize) -> Result<Bracket, EngineError> {
    if teams.len() < 2 {
        return Err(EngineError::NotEnoughTeams { found: teams.len() });
    }
    let seed_count = seed_count.min(teams.len());

    let bracket = match mode {
        MatchMode::RoundRobin => return Err(EngineError::WrongMode(mode)),
        MatchMode::Elimination => Bracket::Plain {
            rounds: build_rounds(teams.len()),
            seeds: SeedRecord::default(),
        },
        MatchMode::SeedElimination => Bracket::Plain {
            rounds: build_rounds(teams.len()),
            seeds: SeedRecord {
                seeds: teams[..seed_count].to_vec(),
                distribution: BTreeMap::new(),
            },
        },
        MatchMode::DualGroupElimination => {
            let (members, seeds) = split_into_groups(teams, seed_count);
            let groups = members
                .into_iter()
                .map(|(id, members)| {
                    let rounds = build_rounds(members.len());
                    (id, Group { members, rounds })
                })
                .collect();
            Bracket::Grouped {
                groups,
                final_stage: vec![vec![BracketMatch::new(1, 1, None)]],
                seeds,
            }
        }
    };
    bracket.validate()?;
    Ok(bracket)
}

/// Number of teams the first round of `rounds` can take.
pub fn capacity(rounds: &Rounds) -> usize {
    rounds
        .first()
        .map(|r| r.iter().map(|m| if m.bye { 1 } else { 2 }).sum())
        .unwrap_or(0)
}

fn fill_first_round(rounds: &mut Rounds, teams: &[TeamId]) -> Result<(), EngineError> {
    let cap = capacity(rounds);
    if teams.len() > cap && !(rounds.is_empty() && teams.len() == 1) {
        return Err(EngineError::TooManyTeams {
            capacity: cap,
            found: teams.len(),
        });
    }
    let mut teams = teams.iter().copied();
    if let Some(first) = rounds.first_mut() {
        for m in first.iter_mut() {
            m.team1_id = teams.next();
            if !m.bye {
                m.team2_id = teams.next();
            }
        }
    }
    Ok(())
}

/// Clear the bracket, then place teams into first-round slots in order.
///
/// Plain brackets take `teams`; grouped brackets place each group's drawn
/// members and ignore `teams`. A one-team group has no matches: its member
/// reaches the final through progression.
pub fn auto_place(bracket: &mut Bracket, teams: &[TeamId]) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    if let Some(&team) = teams.iter().find(|t| !seen.insert(**t)) {
        return Err(EngineError::DuplicatePlacement { team, round: 1 });
    }
    bracket.clear_placements();
    match bracket {
        Bracket::Plain { rounds, .. } => fill_first_round(rounds, teams)?,
        Bracket::Grouped { groups, .. } => {
            for group in groups.values_mut() {
                fill_first_round(&mut group.rounds, &group.members)?;
            }
        }
    }
    bracket.validate()
}

/// Put `team` into (or, with `None`, clear) one first-round slot.
///
/// A team may sit in only one first-round slot across the whole bracket; later
/// rounds and bye slots are filled by progression and cannot be placed.
pub fn assign_slot(bracket: &mut Bracket, at: MatchRef, slot: Slot, team: Option<TeamId>) -> Result<(), EngineError> {
    let m = bracket.match_at(at).ok_or(EngineError::NoSuchMatch(at))?;
    if at.round != 1 || at.section == Section::Final || (m.bye && slot == Slot::Two) {
        return Err(EngineError::NotPlaceable { at, slot });
    }
    if let Some(team) = team {
        if let Some(current) = m.team(slot).filter(|c| *c != team) {
            return Err(EngineError::SlotTaken { at, slot, team: current });
        }
        let elsewhere = bracket
            .matches()
            .into_iter()
            .filter(|(r, _)| r.round == 1 && r.section != Section::Final)
            .any(|(r, other)| {
                [Slot::One, Slot::Two]
                    .into_iter()
                    .any(|s| other.team(s) == Some(team) && !(r == at && s == slot))
            });
        if elsewhere {
            return Err(EngineError::DuplicatePlacement { team, round: 1 });
        }
    }

    let m = bracket.match_at_mut(at).ok_or(EngineError::NoSuchMatch(at))?;
    *m.team_mut(slot) = team;
    if m.winner_id.map_or(false, |w| !m.has_team(w)) {
        m.winner_id = None;
    }
    Ok(())
}

/// Build (or rebuild) the contest's bracket from its entered teams and persist it.
///
/// Rebuilding replaces the stored structure wholesale: no placement, winner or
/// group membership carries over. The document version keeps counting up.
pub fn configure_contest(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    seed_count: usize,
) -> Result<BracketDocument, EngineError> {
    let contest = load_contest(store, contest_id)?;
    validate_contest(&contest)?;
    if !contest.match_mode.is_bracket() {
        return Err(EngineError::WrongMode(contest.match_mode));
    }
    let teams: Vec<TeamId> = store.load_teams(contest_id)?.iter().map(|t| t.id).collect();
    let bracket = build_bracket(contest.match_mode, &teams, seed_count)?;

    let doc = match store.load_bracket(contest_id) {
        Ok(Some(previous)) => previous.succeed(bracket),
        Ok(None) => BracketDocument::new(bracket),
        Err(StoreError::Json(e)) => {
            log::warn!("Replacing unreadable bracket for contest {}: {}", contest_id, e);
            BracketDocument::new(bracket)
        }
        Err(e) => return Err(e.into()),
    };
    store.save_bracket(contest_id, &doc)?;
    log::info!(
        "Configured {:?} bracket for contest {} ({} teams, {} seeds, version {})",
        contest.match_mode,
        contest_id,
        teams.len(),
        doc.structure.seeds().seeds.len(),
        doc.version
    );
    Ok(doc)
}

/// Load the stored bracket, checking its links.
pub fn load_bracket(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<BracketDocument, EngineError> {
    let contest = load_contest(store, contest_id)?;
    if !contest.match_mode.is_bracket() {
        return Err(EngineError::WrongMode(contest.match_mode));
    }
    let doc = store
        .load_bracket(contest_id)?
        .ok_or(EngineError::BracketNotConfigured(contest_id))?;
    doc.structure.validate()?;
    Ok(doc)
}

/// Auto-place the contest's teams (entry order) into the stored bracket.
pub fn place_contest_teams(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<BracketDocument, EngineError> {
    let doc = load_bracket(store, contest_id)?;
    let teams: Vec<TeamId> = store.load_teams(contest_id)?.iter().map(|t| t.id).collect();
    let mut structure = doc.structure.clone();
    auto_place(&mut structure, &teams)?;
    save_if_changed(store, contest_id, &doc, structure)
}

/// Manually place (or clear) one slot of the stored bracket.
pub fn assign_contest_slot(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    at: MatchRef,
    slot: Slot,
    team: Option<TeamId>,
) -> Result<BracketDocument, EngineError> {
    let doc = load_bracket(store, contest_id)?;
    if let Some(team) = team {
        if !store.load_teams(contest_id)?.iter().any(|t| t.id == team) {
            return Err(EngineError::TeamNotInContest(team));
        }
    }
    let mut structure = doc.structure.clone();
    assign_slot(&mut structure, at, slot, team)?;
    save_if_changed(store, contest_id, &doc, structure)
}

/// Persist `structure` as the next version unless it equals what is stored.
pub(crate) fn save_if_changed(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    previous: &BracketDocument,
    structure: Bracket,
) -> Result<BracketDocument, EngineError> {
    if structure == previous.structure {
        return Ok(previous.clone());
    }
    let doc = previous.succeed(structure);
    store.save_bracket(contest_id, &doc)?;
    Ok(doc)
}
