//! Lineup submission and score entry for individual points.

use crate::models::{ContestId, ContestMatch, EngineError, MatchPoint, MemberId, PointId, Score, StoreError, TeamId};
use crate::store::AssignmentStore;

fn load_point_in_contest(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    point_id: PointId,
) -> Result<(MatchPoint, ContestMatch), EngineError> {
    let point = match store.load_point(point_id) {
        Ok(point) => point,
        Err(StoreError::NotFound { .. }) => return Err(EngineError::PointNotFound(point_id)),
        Err(e) => return Err(e.into()),
    };
    let m = store
        .load_matches(contest_id)?
        .into_iter()
        .find(|m| m.id == point.match_id)
        .ok_or(EngineError::PointNotFound(point_id))?;
    Ok((point, m))
}

/// Team that won a point with `score`, or `None` on a level score.
pub fn point_winner(m: &ContestMatch, score: Score) -> Option<TeamId> {
    match score.team1.cmp(&score.team2) {
        std::cmp::Ordering::Greater => Some(m.team1_id),
        std::cmp::Ordering::Less => Some(m.team2_id),
        std::cmp::Ordering::Equal => None,
    }
}

/// Record (or, with `None`, clear) a point's score; the winner follows the score.
pub fn record_score(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    point_id: PointId,
    score: Option<Score>,
) -> Result<Option<TeamId>, EngineError> {
    let (_, m) = load_point_in_contest(store, contest_id, point_id)?;
    let winner = score.and_then(|s| point_winner(&m, s));
    store.set_score(point_id, score, winner)?;
    Ok(winner)
}

/// Store both sides' lineups for a point.
pub fn submit_lineups(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    point_id: PointId,
    team1: &[MemberId],
    team2: &[MemberId],
) -> Result<(), EngineError> {
    let (point, _) = load_point_in_contest(store, contest_id, point_id)?;
    if point.is_scored() {
        return Err(EngineError::TargetNotEligible {
            point: point_id,
            reason: "it is already scored",
        });
    }
    store.set_lineups(point_id, team1, team2)?;
    Ok(())
}
