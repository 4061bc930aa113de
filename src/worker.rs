//! One worker task per contest.
//!
//! Every operation that touches a contest's bracket or table slots goes through
//! that contest's worker as a [`Command`], so scheduling passes, resyncs and
//! relocations for one contest never interleave. Different contests run in
//! parallel.

use crate::logic::{
    add_team, aggregate_contest, assign_contest_slot, configure_contest, load_contest, place_contest_teams, record_score,
    relocate, resync_contest, run_table_pass, schedule_contest, schedule_pending_matches, submit_lineups,
    LeagueSummary, PassReport, ResyncOutcome, SlotChange,
};
use crate::models::{
    BracketDocument, ContestId, ContestMatch, EngineError, MatchRef, MemberId, PointId, Score, Slot, Team, TeamId,
};
use crate::store::AssignmentStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// Commands queued per worker before senders wait.
const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Requests a contest worker serves, in arrival order.
pub enum Command {
    /// Enter a team; only while the contest is still in setup.
    AddTeam { name: String, reply: Reply<Team> },
    /// Build (or rebuild) the bracket from the entered teams.
    Configure { seed_count: usize, reply: Reply<BracketDocument> },
    PlaceTeams { reply: Reply<BracketDocument> },
    AssignSlot {
        at: MatchRef,
        slot: Slot,
        team: Option<TeamId>,
        reply: Reply<BracketDocument>,
    },
    Resync { reply: Reply<ResyncOutcome> },
    /// League: generate the full schedule. Bracket: schedule pairings that are ready.
    ScheduleMatches { shuffle: bool, reply: Reply<Vec<ContestMatch>> },
    RunTablePass { reply: Reply<PassReport> },
    Relocate {
        source: PointId,
        target: PointId,
        reply: Reply<[SlotChange; 2]>,
    },
    SubmitLineups {
        point_id: PointId,
        team1: Vec<MemberId>,
        team2: Vec<MemberId>,
        reply: Reply<()>,
    },
    /// Record a score, then bring the bracket or league table and the tables up to date.
    RecordScore {
        point_id: PointId,
        score: Option<Score>,
        reply: Reply<Option<TeamId>>,
    },
    Aggregate { reply: Reply<LeagueSummary> },
}

/// Follow-up after a score lands. Failures are logged, not returned: the next
/// resync or pass repeats the same work.
fn after_score(store: &dyn AssignmentStore, contest_id: ContestId) {
    let contest = match load_contest(store, contest_id) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Skipping follow-up for contest {}: {}", contest_id, e);
            return;
        }
    };
    if contest.match_mode.is_bracket() {
        if let Err(e) = resync_contest(store, contest_id) {
            log::warn!("Resync for contest {} failed, will retry on next request: {}", contest_id, e);
        }
    } else {
        if let Err(e) = aggregate_contest(store, contest_id) {
            log::warn!("Aggregation for contest {} failed: {}", contest_id, e);
        }
        if let Err(e) = run_table_pass(store, contest_id) {
            log::warn!("Table top-up for contest {} failed: {}", contest_id, e);
        }
    }
}

fn handle(store: &dyn AssignmentStore, contest_id: ContestId, command: Command) {
    // A dropped receiver means the caller gave up; nothing to do about it.
    match command {
        Command::AddTeam { name, reply } => {
            let _ = reply.send(add_team(store, contest_id, &name));
        }
        Command::Configure { seed_count, reply } => {
            let _ = reply.send(configure_contest(store, contest_id, seed_count));
        }
        Command::PlaceTeams { reply } => {
            let _ = reply.send(place_contest_teams(store, contest_id));
        }
        Command::AssignSlot { at, slot, team, reply } => {
            let _ = reply.send(assign_contest_slot(store, contest_id, at, slot, team));
        }
        Command::Resync { reply } => {
            let result = resync_contest(store, contest_id);
            if let Err(e) = &result {
                log::warn!("Resync for contest {} aborted: {}", contest_id, e);
            }
            let _ = reply.send(result);
        }
        Command::ScheduleMatches { shuffle, reply } => {
            let result = load_contest(store, contest_id).and_then(|contest| {
                if contest.match_mode.is_bracket() {
                    schedule_pending_matches(store, contest_id)
                } else {
                    schedule_contest(store, contest_id, shuffle)
                }
            });
            let _ = reply.send(result);
        }
        Command::RunTablePass { reply } => {
            let _ = reply.send(run_table_pass(store, contest_id));
        }
        Command::Relocate { source, target, reply } => {
            let _ = reply.send(relocate(store, contest_id, source, target));
        }
        Command::SubmitLineups {
            point_id,
            team1,
            team2,
            reply,
        } => {
            let _ = reply.send(submit_lineups(store, contest_id, point_id, &team1, &team2));
        }
        Command::RecordScore { point_id, score, reply } => {
            let result = record_score(store, contest_id, point_id, score);
            let recorded = result.is_ok();
            let _ = reply.send(result);
            if recorded {
                after_score(store, contest_id);
            }
        }
        Command::Aggregate { reply } => {
            let _ = reply.send(aggregate_contest(store, contest_id));
        }
    }
}

/// Serve commands for one contest until every sender is gone.
pub async fn run(contest_id: ContestId, store: Arc<dyn AssignmentStore>, mut commands: mpsc::Receiver<Command>) {
    log::info!("Worker for contest {} started", contest_id);
    while let Some(command) = commands.recv().await {
        handle(store.as_ref(), contest_id, command);
    }
    log::info!("Worker for contest {} stopped", contest_id);
}

/// Per-contest entry: command channel + last activity time (for idle cleanup).
struct WorkerEntry {
    commands: mpsc::Sender<Command>,
    last_activity: Instant,
}

/// Owns the workers, starting one the first time a contest is addressed.
pub struct ContestRegistry {
    store: Arc<dyn AssignmentStore>,
    workers: RwLock<HashMap<ContestId, WorkerEntry>>,
}

impl ContestRegistry {
    pub fn new(store: Arc<dyn AssignmentStore>) -> Self {
        Self {
            store,
            workers: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn AssignmentStore> {
        &self.store
    }

    /// Number of running workers.
    pub fn active(&self) -> usize {
        self.workers.read().map(|w| w.len()).unwrap_or(0)
    }

    /// Sender for the contest's worker, spawning it if needed. Must be called
    /// inside a tokio runtime.
    fn sender(&self, contest_id: ContestId) -> Result<mpsc::Sender<Command>, EngineError> {
        let mut workers = self.workers.write().map_err(|_| EngineError::WorkerClosed)?;
        if let Some(entry) = workers.get_mut(&contest_id) {
            if !entry.commands.is_closed() {
                entry.last_activity = Instant::now();
                return Ok(entry.commands.clone());
            }
        }
        load_contest(self.store.as_ref(), contest_id)?;

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(contest_id, Arc::clone(&self.store), rx));
        workers.insert(
            contest_id,
            WorkerEntry {
                commands: tx.clone(),
                last_activity: Instant::now(),
            },
        );
        Ok(tx)
    }

    async fn request<T>(
        &self,
        contest_id: ContestId,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, EngineError> {
        let commands = self.sender(contest_id)?;
        let (reply, response) = oneshot::channel();
        commands
            .send(make(reply))
            .await
            .map_err(|_| EngineError::WorkerClosed)?;
        response.await.map_err(|_| EngineError::WorkerClosed)?
    }

    pub async fn add_team(&self, contest_id: ContestId, name: String) -> Result<Team, EngineError> {
        self.request(contest_id, |reply| Command::AddTeam { name, reply }).await
    }

    pub async fn configure(&self, contest_id: ContestId, seed_count: usize) -> Result<BracketDocument, EngineError> {
        self.request(contest_id, |reply| Command::Configure { seed_count, reply })
            .await
    }

    pub async fn place_teams(&self, contest_id: ContestId) -> Result<BracketDocument, EngineError> {
        self.request(contest_id, |reply| Command::PlaceTeams { reply }).await
    }

    pub async fn assign_slot(
        &self,
        contest_id: ContestId,
        at: MatchRef,
        slot: Slot,
        team: Option<TeamId>,
    ) -> Result<BracketDocument, EngineError> {
        self.request(contest_id, |reply| Command::AssignSlot { at, slot, team, reply })
            .await
    }

    pub async fn resync(&self, contest_id: ContestId) -> Result<ResyncOutcome, EngineError> {
        self.request(contest_id, |reply| Command::Resync { reply }).await
    }

    pub async fn schedule_matches(&self, contest_id: ContestId, shuffle: bool) -> Result<Vec<ContestMatch>, EngineError> {
        self.request(contest_id, |reply| Command::ScheduleMatches { shuffle, reply })
            .await
    }

    pub async fn run_table_pass(&self, contest_id: ContestId) -> Result<PassReport, EngineError> {
        self.request(contest_id, |reply| Command::RunTablePass { reply }).await
    }

    pub async fn relocate(
        &self,
        contest_id: ContestId,
        source: PointId,
        target: PointId,
    ) -> Result<[SlotChange; 2], EngineError> {
        self.request(contest_id, |reply| Command::Relocate { source, target, reply })
            .await
    }

    pub async fn submit_lineups(
        &self,
        contest_id: ContestId,
        point_id: PointId,
        team1: Vec<MemberId>,
        team2: Vec<MemberId>,
    ) -> Result<(), EngineError> {
        self.request(contest_id, |reply| Command::SubmitLineups {
            point_id,
            team1,
            team2,
            reply,
        })
        .await
    }

    pub async fn record_score(
        &self,
        contest_id: ContestId,
        point_id: PointId,
        score: Option<Score>,
    ) -> Result<Option<TeamId>, EngineError> {
        self.request(contest_id, |reply| Command::RecordScore { point_id, score, reply })
            .await
    }

    pub async fn aggregate(&self, contest_id: ContestId) -> Result<LeagueSummary, EngineError> {
        self.request(contest_id, |reply| Command::Aggregate { reply }).await
    }

    /// Drop workers idle for at least `timeout`. Their tasks end once the
    /// queued commands drain. Returns how many were removed.
    pub fn reap_idle(&self, timeout: Duration) -> usize {
        let Ok(mut workers) = self.workers.write() else {
            return 0;
        };
        let before = workers.len();
        workers.retain(|_, entry| entry.last_activity.elapsed() < timeout && !entry.commands.is_closed());
        before - workers.len()
    }
}
