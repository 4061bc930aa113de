//! Table assignment for league (round-robin) contests.
//!
//! Ready points (both lineups in, no score) are put on the contest's tables in
//! creation order, with up to [`NEXT_QUEUE_LEN`] more queued as `"Next"`. Planning
//! is pure; [`apply_changes`] writes the plan back best-effort.

use crate::logic::setup::load_contest;
use crate::models::{ContestId, EngineError, MatchPoint, PointId, StoreError, TableSlot};
use crate::store::AssignmentStore;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// How many points may wait in the `"Next"` queue.
pub const NEXT_QUEUE_LEN: usize = 2;

/// One planned slot write.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct SlotChange {
    pub point_id: PointId,
    pub from: TableSlot,
    pub to: TableSlot,
}

impl SlotChange {
    fn of(point: &MatchPoint, to: TableSlot) -> Self {
        Self {
            point_id: point.id,
            from: point.table_slot,
            to,
        }
    }
}

/// A slot write that failed; the rest of its batch still went through.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FailedWrite {
    pub point_id: PointId,
    pub slot: TableSlot,
    pub error: String,
}

/// Outcome of writing a batch of slot changes.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PassReport {
    pub applied: Vec<SlotChange>,
    pub failed: Vec<FailedWrite>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Current board: unscored points on tables, and the queue.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TableBoard {
    pub tables: BTreeMap<u32, PointId>,
    pub next: Vec<PointId>,
}

fn by_creation(points: &[MatchPoint]) -> Vec<&MatchPoint> {
    let mut ordered: Vec<&MatchPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.id);
    ordered
}

/// True once any point holds a table number or sits in the queue.
pub fn assignment_started(points: &[MatchPoint]) -> bool {
    points
        .iter()
        .any(|p| matches!(p.table_slot, TableSlot::Table(_) | TableSlot::Next))
}

/// First assignment for a contest: tables `1..=min(table_count, ready)` in
/// creation order, then up to two points queued as `"Next"`.
///
/// Does nothing once assignment has started, so reloading never reshuffles a
/// schedule in progress.
pub fn initial_assignment(points: &[MatchPoint], table_count: u32) -> Vec<SlotChange> {
    if assignment_started(points) {
        return Vec::new();
    }
    let ready: Vec<&MatchPoint> = by_creation(points).into_iter().filter(|p| p.is_ready()).collect();
    let tabled = ready.len().min(table_count as usize);

    let mut changes: Vec<SlotChange> = ready[..tabled]
        .iter()
        .zip(1..)
        .map(|(p, table)| SlotChange::of(p, TableSlot::Table(table)))
        .collect();
    changes.extend(
        ready[tabled..]
            .iter()
            .take(NEXT_QUEUE_LEN)
            .map(|p| SlotChange::of(p, TableSlot::Next)),
    );
    changes
}

/// Refill tables freed by scored points, then top the queue back up.
///
/// Vacant tables go first to queued points, then to other ready points, each in
/// creation order. Unscored points on tables are never moved. A scored point
/// still marked `"Next"` leaves the queue (its slot becomes `"--"`).
pub fn top_up(points: &[MatchPoint], table_count: u32) -> Vec<SlotChange> {
    let ordered = by_creation(points);
    let mut changes = Vec::new();

    let occupied: BTreeSet<u32> = ordered
        .iter()
        .filter(|p| !p.is_scored())
        .filter_map(|p| p.table_slot.table())
        .collect();
    let vacant = (1..=table_count).filter(|t| !occupied.contains(t));

    for p in ordered.iter().filter(|p| p.is_scored() && p.table_slot == TableSlot::Next) {
        changes.push(SlotChange::of(p, TableSlot::Freed));
    }

    let mut queued: Vec<&MatchPoint> = ordered
        .iter()
        .copied()
        .filter(|p| p.table_slot == TableSlot::Next && !p.is_scored())
        .collect();
    let mut fresh: Vec<&MatchPoint> = ordered
        .iter()
        .copied()
        .filter(|p| p.is_ready() && p.table_slot.is_untabled())
        .collect();

    let mut queue_taken = 0;
    let mut fresh_taken = 0;
    for table in vacant {
        let candidate = if queue_taken < queued.len() {
            queue_taken += 1;
            queued[queue_taken - 1]
        } else if fresh_taken < fresh.len() {
            fresh_taken += 1;
            fresh[fresh_taken - 1]
        } else {
            break;
        };
        changes.push(SlotChange::of(candidate, TableSlot::Table(table)));
    }
    queued.drain(..queue_taken);
    fresh.drain(..fresh_taken);

    let room = NEXT_QUEUE_LEN.saturating_sub(queued.len());
    changes.extend(fresh.iter().take(room).map(|p| SlotChange::of(p, TableSlot::Next)));
    changes
}

/// One scheduling pass: the initial assignment if none has happened, else a top-up.
pub fn plan_pass(points: &[MatchPoint], table_count: u32) -> Vec<SlotChange> {
    if assignment_started(points) {
        top_up(points, table_count)
    } else {
        initial_assignment(points, table_count)
    }
}

/// Plan moving `source`'s table to `target`.
///
/// The target takes the table number; the source is marked `"--"`. Returned in
/// write order: target first, then source.
pub fn plan_relocation(points: &[MatchPoint], source: PointId, target: PointId) -> Result<[SlotChange; 2], EngineError> {
    if source == target {
        return Err(EngineError::SelfRelocation(source));
    }
    let find = |id: PointId| points.iter().find(|p| p.id == id).ok_or(EngineError::PointNotFound(id));
    let from = find(source)?;
    let to = find(target)?;

    let table = from.table_slot.table().ok_or(EngineError::SourceNotTabled(source))?;
    // A scored point's number is only a record; top-up may have handed the table on.
    if from.is_scored() {
        return Err(EngineError::SourceScored { point: source, table });
    }
    if let Some(holder) = points
        .iter()
        .find(|p| p.id != source && !p.is_scored() && p.table_slot == TableSlot::Table(table))
    {
        return Err(EngineError::TableTaken { table, point: holder.id });
    }
    let not_eligible = |reason| EngineError::TargetNotEligible { point: target, reason };
    if !to.table_slot.is_untabled() {
        return Err(not_eligible("it already holds a table or is queued"));
    }
    if to.is_scored() {
        return Err(not_eligible("it is already scored"));
    }
    if !to.lineups_submitted() {
        return Err(not_eligible("both lineups are not in yet"));
    }
    Ok([SlotChange::of(to, TableSlot::Table(table)), SlotChange::of(from, TableSlot::Freed)])
}

/// Current board for display.
pub fn table_board(points: &[MatchPoint]) -> TableBoard {
    let mut board = TableBoard::default();
    for p in by_creation(points).into_iter().filter(|p| !p.is_scored()) {
        match p.table_slot {
            TableSlot::Table(t) => {
                board.tables.entry(t).or_insert(p.id);
            }
            TableSlot::Next => board.next.push(p.id),
            _ => {}
        }
    }
    board
}

/// Write each change independently. A failed write is logged and reported; it
/// does not stop the others.
pub fn apply_changes(store: &dyn AssignmentStore, changes: &[SlotChange]) -> PassReport {
    let mut report = PassReport::default();
    for change in changes {
        match store.set_table_slot(change.point_id, change.to) {
            Ok(()) => report.applied.push(*change),
            Err(e) => {
                log::warn!("Failed to set point {} to {}: {}", change.point_id, change.to, e);
                report.failed.push(FailedWrite {
                    point_id: change.point_id,
                    slot: change.to,
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

fn ensure_league(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<u32, EngineError> {
    let contest = load_contest(store, contest_id)?;
    if contest.match_mode.is_bracket() {
        return Err(EngineError::WrongMode(contest.match_mode));
    }
    if contest.table_count == 0 {
        return Err(EngineError::InvalidTableCount(0));
    }
    Ok(contest.table_count)
}

/// Run one scheduling pass for a league contest and persist it.
pub fn run_table_pass(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<PassReport, EngineError> {
    let table_count = ensure_league(store, contest_id)?;
    let points = store.load_points(contest_id)?;
    let changes = plan_pass(&points, table_count);
    let report = apply_changes(store, &changes);
    if !changes.is_empty() {
        log::info!(
            "Table pass for contest {}: {} slot(s) set, {} failed",
            contest_id,
            report.applied.len(),
            report.failed.len()
        );
    }
    Ok(report)
}

/// Move a table from one point to another.
///
/// Two writes, target first. If the second fails the first is not undone; the
/// error names both points and the table.
pub fn relocate(
    store: &dyn AssignmentStore,
    contest_id: ContestId,
    source: PointId,
    target: PointId,
) -> Result<[SlotChange; 2], EngineError> {
    ensure_league(store, contest_id)?;
    let points = store.load_points(contest_id)?;
    let [to_target, to_source] = plan_relocation(&points, source, target)?;
    let table = to_target.to.table().unwrap_or_default();

    store.set_table_slot(to_target.point_id, to_target.to)?;
    if let Err(cause) = store.set_table_slot(to_source.point_id, to_source.to) {
        log::warn!("Relocation of table {} left point {} unfreed: {}", table, source, cause);
        return Err(EngineError::PartialRelocation {
            table,
            from_point: source,
            to_point: target,
            cause,
        });
    }
    log::info!("Table {} moved from point {} to point {}", table, source, target);
    Ok([to_target, to_source])
}

/// Board for a league contest, read fresh from the store.
pub fn contest_board(store: &dyn AssignmentStore, contest_id: ContestId) -> Result<TableBoard, StoreError> {
    Ok(table_board(&store.load_points(contest_id)?))
}
