//! Contest business logic: setup, bracket building and progression, table scheduling, league play.

mod bracket_builder;
mod progression;
mod round_robin;
mod scoring;
mod seeding;
mod setup;
mod table_scheduler;

pub use bracket_builder::{
    assign_contest_slot, assign_slot, auto_place, build_bracket, build_rounds, capacity, configure_contest,
    load_bracket, place_contest_teams,
};
pub use progression::{
    group_winner, match_winner, pending_pairings, resync, resync_contest, schedule_pending_matches, PointResults,
    ResyncOutcome,
};
pub use round_robin::{aggregate_contest, generate_round_robin, schedule_contest, standings, LeagueSummary, Pairing};
pub use scoring::{point_winner, record_score, submit_lineups};
pub use seeding::{distribute_seeds, group_sizes, split_into_groups};
pub use setup::{add_team, advance_status, create_contest, load_contest, validate_contest};
pub use table_scheduler::{
    apply_changes, assignment_started, contest_board, initial_assignment, plan_pass, plan_relocation, relocate,
    run_table_pass, table_board, top_up, FailedWrite, PassReport, SlotChange, TableBoard, NEXT_QUEUE_LEN,
};
