//! Integration tests for league play: schedule generation, aggregation and standings.

use club_tournament_web::logic::{
    add_team, aggregate_contest, create_contest, generate_round_robin, record_score, schedule_contest,
};
use club_tournament_web::models::{PointConfig, PointType};
use club_tournament_web::{AssignmentStore, Contest, ContestId, ContestStatus, EngineError, MatchMode, MemoryStore, Score, TeamId};
use std::collections::HashSet;

fn league(store: &MemoryStore, teams: usize, total_points: u32) -> ContestId {
    let contest = Contest::new("Winter league", MatchMode::RoundRobin, 2, total_points);
    create_contest(store, &contest).unwrap();
    for i in 0..teams {
        add_team(store, contest.id, &format!("Team {i}")).unwrap();
    }
    contest.id
}

/// Give `winner` every point of the match between `a` and `b`.
fn sweep(store: &MemoryStore, contest_id: ContestId, a: TeamId, b: TeamId, winner: TeamId) {
    let m = store
        .load_matches(contest_id)
        .unwrap()
        .into_iter()
        .find(|m| m.is_pairing(a, b))
        .unwrap();
    let score = if winner == m.team1_id {
        Score { team1: 2, team2: 0 }
    } else {
        Score { team1: 0, team2: 2 }
    };
    for p in store.load_points(contest_id).unwrap().iter().filter(|p| p.match_id == m.id) {
        record_score(store, contest_id, p.id, Some(score)).unwrap();
    }
}

#[test]
fn every_pair_meets_once() {
    for n in 2..=9 {
        let teams: Vec<TeamId> = (1..=n).collect();
        let pairings = generate_round_robin(&teams);
        let n = n as usize;
        assert_eq!(pairings.len(), n * (n - 1) / 2);

        let pairs: HashSet<(TeamId, TeamId)> =
            pairings.iter().map(|p| (p.team1.min(p.team2), p.team1.max(p.team2))).collect();
        assert_eq!(pairs.len(), pairings.len());

        let rounds = pairings.iter().map(|p| p.round).max().unwrap();
        assert_eq!(rounds as usize, if n % 2 == 0 { n - 1 } else { n });
        for round in 1..=rounds {
            let mut seen = HashSet::new();
            for p in pairings.iter().filter(|p| p.round == round) {
                assert!(seen.insert(p.team1) && seen.insert(p.team2), "team plays twice in round {round}");
            }
        }
        let sequences: Vec<u32> = pairings.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, (1..=pairings.len() as u32).collect::<Vec<_>>());
    }
}

#[test]
fn one_team_gets_no_pairings() {
    assert!(generate_round_robin(&[1]).is_empty());
    assert!(generate_round_robin(&[]).is_empty());
}

#[test]
fn schedule_creates_points_per_config() {
    let store = MemoryStore::new();
    let contest = Contest::new("Doubles night", MatchMode::RoundRobin, 3, 0).with_points_config(vec![
        PointConfig {
            point_type: PointType::Single,
            note: String::new(),
        },
        PointConfig {
            point_type: PointType::Double,
            note: "pairs".into(),
        },
    ]);
    create_contest(&store, &contest).unwrap();
    for name in ["Aces", "Kings", "Queens"] {
        add_team(&store, contest.id, name).unwrap();
    }

    let matches = schedule_contest(&store, contest.id, false).unwrap();
    assert_eq!(matches.len(), 3);
    let points = store.load_points(contest.id).unwrap();
    assert_eq!(points.len(), 6);
    for m in &matches {
        let types: Vec<PointType> = points.iter().filter(|p| p.match_id == m.id).map(|p| p.point_type).collect();
        assert_eq!(types, vec![PointType::Single, PointType::Double]);
    }
    assert_eq!(store.load_contest(contest.id).unwrap().status, ContestStatus::InProgress);
}

#[test]
fn schedule_runs_once_and_locks_entries() {
    let store = MemoryStore::new();
    let id = league(&store, 4, 3);
    schedule_contest(&store, id, true).unwrap();
    assert_eq!(store.load_matches(id).unwrap().len(), 6);

    assert!(matches!(
        schedule_contest(&store, id, false),
        Err(EngineError::WrongStatus(ContestStatus::InProgress))
    ));
    assert!(matches!(add_team(&store, id, "Latecomers"), Err(EngineError::WrongStatus(_))));
}

#[test]
fn schedule_needs_two_teams() {
    let store = MemoryStore::new();
    let id = league(&store, 1, 3);
    assert!(matches!(
        schedule_contest(&store, id, false),
        Err(EngineError::NotEnoughTeams { found: 1 })
    ));
}

#[test]
fn standings_rank_by_wins_then_point_difference() {
    let store = MemoryStore::new();
    let id = league(&store, 3, 2);
    schedule_contest(&store, id, false).unwrap();
    let teams: Vec<TeamId> = store.load_teams(id).unwrap().iter().map(|t| t.id).collect();
    let (a, b, c) = (teams[0], teams[1], teams[2]);

    sweep(&store, id, a, b, a);
    let partial = aggregate_contest(&store, id).unwrap();
    assert!(!partial.completed);
    assert_eq!(partial.updated.len(), 1);

    sweep(&store, id, b, c, b);
    sweep(&store, id, a, c, c);
    let summary = aggregate_contest(&store, id).unwrap();
    assert!(summary.completed);
    assert_eq!(summary.updated.len(), 2);
    assert_eq!(store.load_contest(id).unwrap().status, ContestStatus::Completed);

    // Everyone won once; all point differences are zero, so ids decide.
    let order: Vec<TeamId> = summary.standings.iter().map(|s| s.team_id).collect();
    assert_eq!(order, vec![a, b, c]);
    for row in &summary.standings {
        assert_eq!((row.played, row.wins, row.losses), (2, 1, 1));
        assert_eq!((row.points_won, row.points_lost), (2, 2));
    }

    // Nothing changed: no winner rewritten.
    assert!(aggregate_contest(&store, id).unwrap().updated.is_empty());
}

#[test]
fn aggregation_is_league_only() {
    let store = MemoryStore::new();
    let contest = Contest::new("Cup", MatchMode::SeedElimination, 1, 1);
    store.insert_contest(&contest).unwrap();
    assert!(matches!(aggregate_contest(&store, contest.id), Err(EngineError::WrongMode(_))));
}
