//! Integration tests for the per-contest workers.

use club_tournament_web::logic::{add_team, create_contest, table_board};
use club_tournament_web::{
    AssignmentStore, Contest, ContestId, ContestRegistry, ContestStatus, EngineError, MatchMode, MemoryStore, Score,
    TableSlot,
};
use std::sync::Arc;
use std::time::Duration;

fn registry_with_contest(mode: MatchMode, table_count: u32, teams: usize) -> (Arc<ContestRegistry>, ContestId) {
    let store = Arc::new(MemoryStore::new());
    let contest = Contest::new("Club championship", mode, table_count, 3);
    create_contest(store.as_ref(), &contest).unwrap();
    for i in 0..teams {
        add_team(store.as_ref(), contest.id, &format!("Team {i}")).unwrap();
    }
    (Arc::new(ContestRegistry::new(store)), contest.id)
}

#[tokio::test]
async fn unknown_contest_starts_no_worker() {
    let (registry, _) = registry_with_contest(MatchMode::RoundRobin, 1, 2);
    let missing = ContestId::new_v4();
    assert!(matches!(
        registry.resync(missing).await,
        Err(EngineError::ContestNotFound(id)) if id == missing
    ));
    assert_eq!(registry.active(), 0);
}

#[tokio::test]
async fn teams_enter_through_the_worker_until_play_starts() {
    let (registry, id) = registry_with_contest(MatchMode::RoundRobin, 1, 2);
    let team = registry.add_team(id, "  Late Arrivals ".into()).await.unwrap();
    assert_eq!(team.name, "Late Arrivals");
    assert_eq!(registry.store().load_teams(id).unwrap().len(), 3);
    assert!(matches!(
        registry.add_team(id, "   ".into()).await,
        Err(EngineError::InvalidTeamName)
    ));

    registry.schedule_matches(id, false).await.unwrap();
    assert!(matches!(
        registry.add_team(id, "Too Late".into()).await,
        Err(EngineError::WrongStatus(ContestStatus::InProgress))
    ));
    assert_eq!(registry.store().load_teams(id).unwrap().len(), 3);
}

#[tokio::test]
async fn bracket_score_triggers_resync() {
    let (registry, id) = registry_with_contest(MatchMode::Elimination, 1, 2);
    registry.configure(id, 0).await.unwrap();
    registry.place_teams(id).await.unwrap();
    let scheduled = registry.schedule_matches(id, false).await.unwrap();
    assert_eq!(scheduled.len(), 1);

    let points = registry.store().load_points(id).unwrap();
    let winner = scheduled[0].team2_id;
    for p in points.iter().take(2) {
        let got = registry
            .record_score(id, p.id, Some(Score { team1: 1, team2: 3 }))
            .await
            .unwrap();
        assert_eq!(got, Some(winner));
    }

    // The follow-up resync already ran, so this one finds nothing to change.
    let outcome = registry.resync(id).await.unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.champion, Some(winner));
    assert_eq!(registry.store().load_contest(id).unwrap().status, ContestStatus::Completed);
}

#[tokio::test]
async fn league_score_tops_up_tables() {
    let (registry, id) = registry_with_contest(MatchMode::RoundRobin, 1, 2);
    registry.schedule_matches(id, false).await.unwrap();
    let points = registry.store().load_points(id).unwrap();
    assert_eq!(points.len(), 3);
    for p in &points {
        registry.submit_lineups(id, p.id, vec![11], vec![21]).await.unwrap();
    }

    let report = registry.run_table_pass(id).await.unwrap();
    assert_eq!(report.applied.len(), 3);
    let board = table_board(&registry.store().load_points(id).unwrap());
    assert_eq!(board.tables.get(&1), Some(&points[0].id));
    assert_eq!(board.next, vec![points[1].id, points[2].id]);

    registry
        .record_score(id, points[0].id, Some(Score { team1: 3, team2: 0 }))
        .await
        .unwrap();
    // Queued behind the score's follow-up.
    registry.aggregate(id).await.unwrap();

    let board = table_board(&registry.store().load_points(id).unwrap());
    assert_eq!(board.tables.get(&1), Some(&points[1].id));
    assert_eq!(board.next, vec![points[2].id]);
    assert_eq!(
        registry.store().load_point(points[0].id).unwrap().table_slot,
        TableSlot::Table(1)
    );
}

#[tokio::test]
async fn concurrent_passes_do_not_overfill() {
    let (registry, id) = registry_with_contest(MatchMode::RoundRobin, 2, 4);
    registry.schedule_matches(id, false).await.unwrap();
    for p in registry.store().load_points(id).unwrap() {
        registry.submit_lineups(id, p.id, vec![1], vec![2]).await.unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.run_table_pass(id).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_clean());
    }

    let points = registry.store().load_points(id).unwrap();
    assert_eq!(points.iter().filter(|p| p.table_slot.table().is_some()).count(), 2);
    assert_eq!(points.iter().filter(|p| p.table_slot == TableSlot::Next).count(), 2);
}

#[tokio::test]
async fn idle_workers_are_reaped_and_restarted() {
    let (registry, id) = registry_with_contest(MatchMode::RoundRobin, 1, 2);
    registry.aggregate(id).await.unwrap();
    assert_eq!(registry.active(), 1);

    assert_eq!(registry.reap_idle(Duration::from_secs(3600)), 0);
    assert_eq!(registry.reap_idle(Duration::ZERO), 1);
    assert_eq!(registry.active(), 0);

    registry.aggregate(id).await.unwrap();
    assert_eq!(registry.active(), 1);
}

#[tokio::test]
async fn errors_come_back_to_the_caller() {
    let (registry, id) = registry_with_contest(MatchMode::RoundRobin, 1, 2);
    assert!(matches!(registry.configure(id, 0).await, Err(EngineError::WrongMode(_))));
    assert!(matches!(registry.relocate(id, 1, 1).await, Err(EngineError::SelfRelocation(1))));
    // The worker survives failed commands.
    assert!(registry.aggregate(id).await.is_ok());
}
