//! Integration tests for lineup submission and score entry.

use club_tournament_web::logic::{record_score, submit_lineups};
use club_tournament_web::{AssignmentStore, EngineError, MemoryStore, Score, StoreError};

mod common;
use common::{league_with_ready_points, FailingStore};

#[test]
fn score_decides_the_point_winner() {
    let store = MemoryStore::new();
    let (id, points) = league_with_ready_points(&store, 1, 3);
    let m = store.load_matches(id).unwrap().remove(0);

    let winner = record_score(&store, id, points[0], Some(Score { team1: 1, team2: 3 })).unwrap();
    assert_eq!(winner, Some(m.team2_id));
    assert_eq!(record_score(&store, id, points[1], Some(Score { team1: 2, team2: 2 })).unwrap(), None);

    // Clearing a score clears the winner.
    assert_eq!(record_score(&store, id, points[0], None).unwrap(), None);
    let cleared = store.load_point(points[0]).unwrap();
    assert_eq!((cleared.score, cleared.winner_team_id), (None, None));
}

#[test]
fn unknown_point_is_not_found() {
    let store = MemoryStore::new();
    let (id, _) = league_with_ready_points(&store, 1, 1);
    assert!(matches!(
        record_score(&store, id, 999, Some(Score { team1: 1, team2: 0 })),
        Err(EngineError::PointNotFound(999))
    ));
}

#[test]
fn point_of_another_contest_is_not_found() {
    let store = MemoryStore::new();
    let (home, _) = league_with_ready_points(&store, 1, 1);
    let (_, away_points) = league_with_ready_points(&store, 1, 1);
    assert!(matches!(
        submit_lineups(&store, home, away_points[0], &[1], &[2]),
        Err(EngineError::PointNotFound(_))
    ));
}

#[test]
fn store_failure_is_not_reported_as_missing() {
    let mut store = FailingStore::new(MemoryStore::new());
    let (id, points) = league_with_ready_points(&store.inner, 1, 2);
    store.fail_point_reads = true;

    let err = record_score(&store, id, points[0], Some(Score { team1: 1, team2: 0 })).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Poisoned)), "got {err}");
    assert!(!err.is_client_error());

    let err = submit_lineups(&store, id, points[1], &[5], &[6]).unwrap_err();
    assert!(matches!(err, EngineError::Store(_)), "got {err}");
}

#[test]
fn scored_point_takes_no_new_lineups() {
    let store = MemoryStore::new();
    let (id, points) = league_with_ready_points(&store, 1, 1);
    record_score(&store, id, points[0], Some(Score { team1: 1, team2: 0 })).unwrap();
    assert!(matches!(
        submit_lineups(&store, id, points[0], &[7], &[8]),
        Err(EngineError::TargetNotEligible { .. })
    ));
}
