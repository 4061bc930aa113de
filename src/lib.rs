//! Club contest engine: bracket building and progression, table scheduling for
//! league play, and the per-contest workers that serialize them.

pub mod config;
pub mod logic;
pub mod models;
pub mod store;
pub mod worker;

pub use logic::{
    auto_place, build_bracket, configure_contest, initial_assignment, plan_pass, relocate, resync, resync_contest,
    run_table_pass, top_up, PassReport, PointResults, ResyncOutcome, SlotChange,
};
pub use models::{
    Bracket, BracketDocument, BracketMatch, Contest, ContestId, ContestMatch, ContestStatus, EngineError, GroupId,
    MatchMode, MatchPoint, MatchRef, PointId, Score, Section, Slot, StoreError, TableSlot, Team, TeamId,
};
pub use store::{AssignmentStore, MemoryStore, SqliteStore};
pub use worker::ContestRegistry;
