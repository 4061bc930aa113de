//! Setup phase: contest validation, creation and team entry.

use crate::models::{Contest, ContestId, ContestStatus, EngineError, StoreError, Team};
use crate::store::AssignmentStore;

/// Reject settings no schedule can be built from.
pub fn validate_contest(contest: &Contest) -> Result<(), EngineError> {
    if contest.table_count == 0 {
        return Err(EngineError::InvalidTableCount(contest.table_count));
    }
    if contest.total_points == 0 {
        return Err(EngineError::InvalidTotalPoints(contest.total_points));
    }
    Ok(())
}

/// Validate and store a new contest.
pub fn create_contest(store: &dyn AssignmentStore, contest: &Contest) -> Result<(), EngineError> {
    validate_contest(contest)?;
    store.insert_contest(contest)?;
    log::info!(
        "Created contest {} ({:?}, {} tables, {} points per match)",
        contest.id,
        contest.match_mode,
        contest.table_count,
        contest.total_points
    );
    Ok(())
}

/// Enter a team. Only allowed before matches exist.
pub fn add_team(store: &dyn AssignmentStore, contest_id: ContestId, name: &str) -> Result<Team, EngineError> {
    let contest = load_contest(store, contest_id)?;
    if contest.status != ContestStatus::Setup {
        return Err(EngineError::WrongStatus(contest.status));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::InvalidTeamName);
    }
    Ok(store.insert_team(contest_id, name)?)
}

/// Load a contest, mapping a missing row to [`EngineError::ContestNotFound`].
pub fn load_contest(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<Contest, EngineError> {
    match store.load_contest(contest_id) {
        Ok(contest) => Ok(contest),
        Err(StoreError::NotFound { .. }) => Err(EngineError::ContestNotFound(contest_id)),
        Err(e) => Err(e.into()),
    }
}

/// Move the contest forward to `status`; never moves it back.
pub fn advance_status(store: &dyn AssignmentStore, contest: &Contest, status: ContestStatus) -> Result<bool, EngineError> {
    let rank = |s: ContestStatus| match s {
        ContestStatus::Setup => 0,
        ContestStatus::InProgress => 1,
        ContestStatus::Completed => 2,
    };
    if rank(status) <= rank(contest.status) {
        return Ok(false);
    }
    store.set_contest_status(contest.id, status)?;
    log::info!("Contest {} is now {:?}", contest.id, status);
    Ok(true)
}
