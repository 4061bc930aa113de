//! Single binary web server: JSON API over the contest engine.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT,
//! DATABASE_PATH (SQLite file; `:memory:` keeps state in process), WORKER_IDLE_SECS.

use actix_web::{
    get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use club_tournament_web::config::ServerConfig;
use club_tournament_web::logic::{contest_board, create_contest, load_bracket, load_contest};
use club_tournament_web::models::{MemberId, PointConfig};
use club_tournament_web::{
    AssignmentStore, Contest, ContestId, ContestRegistry, EngineError, MatchMode, MatchRef, MemoryStore, PointId,
    Score, Slot, SqliteStore, TeamId,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Shared state: the worker registry (which also holds the store).
type AppState = Data<ContestRegistry>;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    active_workers: usize,
}

#[derive(Deserialize)]
struct CreateContestBody {
    name: String,
    #[serde(default)]
    match_mode: MatchMode,
    #[serde(default = "default_table_count")]
    table_count: u32,
    #[serde(default = "default_total_points")]
    total_points: u32,
    /// Overrides `total_points` when given.
    points_config: Option<Vec<PointConfig>>,
}

fn default_table_count() -> u32 {
    1
}

fn default_total_points() -> u32 {
    3
}

#[derive(Deserialize)]
struct AddTeamBody {
    name: String,
}

#[derive(Deserialize, Default)]
struct ConfigureBody {
    #[serde(default)]
    seed_count: usize,
}

#[derive(Deserialize)]
struct AssignSlotBody {
    at: MatchRef,
    slot: Slot,
    team: Option<TeamId>,
}

#[derive(Deserialize, Default)]
struct ScheduleBody {
    #[serde(default)]
    shuffle: bool,
}

#[derive(Deserialize)]
struct RelocateBody {
    source: PointId,
    target: PointId,
}

#[derive(Deserialize)]
struct LineupsBody {
    team1: Vec<MemberId>,
    team2: Vec<MemberId>,
}

#[derive(Deserialize)]
struct ScoreBody {
    score: Option<Score>,
}

/// Path segment: contest id (e.g. /api/contests/{id})
#[derive(Deserialize)]
struct ContestPath {
    id: ContestId,
}

/// Path segments: contest id and point id (e.g. /api/contests/{id}/points/{point_id})
#[derive(Deserialize)]
struct ContestPointPath {
    id: ContestId,
    point_id: PointId,
}

/// Missing rows are 404, bad requests 400, store trouble 503 (clients retry).
fn error_response(e: EngineError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        EngineError::ContestNotFound(_) | EngineError::PointNotFound(_) | EngineError::BracketNotConfigured(_) => {
            HttpResponse::NotFound().json(body)
        }
        EngineError::Store(_) | EngineError::WorkerClosed => HttpResponse::ServiceUnavailable().json(body),
        ref e if e.is_client_error() => HttpResponse::BadRequest().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn respond<T: serde::Serialize>(result: Result<T, EngineError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

#[get("/api/health")]
async fn api_health(state: AppState) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "club-tournament-web",
        active_workers: state.active(),
    })
}

/// Create a contest (returns it with id; client stores id for subsequent requests).
#[post("/api/contests")]
async fn api_create_contest(state: AppState, body: Json<CreateContestBody>) -> HttpResponse {
    let body = body.into_inner();
    let mut contest = Contest::new(body.name.trim(), body.match_mode, body.table_count, body.total_points);
    if let Some(points_config) = body.points_config {
        contest = contest.with_points_config(points_config);
    }
    respond(create_contest(state.store().as_ref(), &contest).map(|()| contest))
}

#[get("/api/contests/{id}")]
async fn api_get_contest(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    respond(load_contest(state.store().as_ref(), path.id))
}

/// Enter a team (contest must be in Setup).
#[post("/api/contests/{id}/teams")]
async fn api_add_team(state: AppState, path: Path<ContestPath>, body: Json<AddTeamBody>) -> HttpResponse {
    respond(state.add_team(path.id, body.into_inner().name).await)
}

#[get("/api/contests/{id}/teams")]
async fn api_list_teams(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    let store = state.store();
    respond(load_contest(store.as_ref(), path.id).and_then(|_| Ok(store.load_teams(path.id)?)))
}

/// Build (or rebuild, clearing all placements) the bracket.
#[post("/api/contests/{id}/bracket")]
async fn api_configure_bracket(state: AppState, path: Path<ContestPath>, body: Option<Json<ConfigureBody>>) -> HttpResponse {
    let seed_count = body.map(|b| b.seed_count).unwrap_or_default();
    respond(state.configure(path.id, seed_count).await)
}

#[get("/api/contests/{id}/bracket")]
async fn api_get_bracket(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    respond(load_bracket(state.store().as_ref(), path.id))
}

/// Place entered teams into the first round, in entry order.
#[post("/api/contests/{id}/bracket/place")]
async fn api_place_teams(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    respond(state.place_teams(path.id).await)
}

/// Manually place (or clear) a first-round slot.
#[put("/api/contests/{id}/bracket/slot")]
async fn api_assign_slot(state: AppState, path: Path<ContestPath>, body: Json<AssignSlotBody>) -> HttpResponse {
    respond(state.assign_slot(path.id, body.at, body.slot, body.team).await)
}

/// Recompute winners from point results.
#[post("/api/contests/{id}/bracket/resync")]
async fn api_resync(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    respond(state.resync(path.id).await)
}

/// League: generate the schedule. Bracket: schedule ready pairings.
#[post("/api/contests/{id}/matches/schedule")]
async fn api_schedule_matches(state: AppState, path: Path<ContestPath>, body: Option<Json<ScheduleBody>>) -> HttpResponse {
    let shuffle = body.map(|b| b.shuffle).unwrap_or_default();
    respond(state.schedule_matches(path.id, shuffle).await)
}

#[get("/api/contests/{id}/matches")]
async fn api_list_matches(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    let store = state.store();
    respond(load_contest(store.as_ref(), path.id).and_then(|_| Ok(store.load_matches(path.id)?)))
}

#[get("/api/contests/{id}/points")]
async fn api_list_points(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    let store = state.store();
    respond(load_contest(store.as_ref(), path.id).and_then(|_| Ok(store.load_points(path.id)?)))
}

/// Run a table pass (initial assignment or top-up).
#[post("/api/contests/{id}/tables/pass")]
async fn api_table_pass(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    respond(state.run_table_pass(path.id).await)
}

#[get("/api/contests/{id}/tables")]
async fn api_table_board(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    let store = state.store();
    respond(load_contest(store.as_ref(), path.id).and_then(|_| Ok(contest_board(store.as_ref(), path.id)?)))
}

/// Move a table from one point to another.
#[post("/api/contests/{id}/tables/relocate")]
async fn api_relocate(state: AppState, path: Path<ContestPath>, body: Json<RelocateBody>) -> HttpResponse {
    respond(state.relocate(path.id, body.source, body.target).await)
}

#[put("/api/contests/{id}/points/{point_id}/lineups")]
async fn api_submit_lineups(state: AppState, path: Path<ContestPointPath>, body: Json<LineupsBody>) -> HttpResponse {
    let body = body.into_inner();
    respond(state.submit_lineups(path.id, path.point_id, body.team1, body.team2).await)
}

/// Record (or clear) a point score; returns the point winner.
#[put("/api/contests/{id}/points/{point_id}/score")]
async fn api_record_score(state: AppState, path: Path<ContestPointPath>, body: Json<ScoreBody>) -> HttpResponse {
    respond(state.record_score(path.id, path.point_id, body.score).await)
}

/// League standings (refreshes stored match winners).
#[get("/api/contests/{id}/standings")]
async fn api_standings(state: AppState, path: Path<ContestPath>) -> HttpResponse {
    respond(state.aggregate(path.id).await)
}

fn open_store(config: &ServerConfig) -> std::io::Result<Arc<dyn AssignmentStore>> {
    if config.database_path == ":memory:" {
        log::info!("Using in-memory store; contests are lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SqliteStore::open(&config.database_path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    log::info!("Database opened at {}", config.database_path);
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    let store = open_store(&config)?;
    let state = Data::new(ContestRegistry::new(store));

    // Background task: every 30 minutes, drop workers idle past the configured timeout
    let state_cleanup = state.clone();
    let idle = config.worker_idle;
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(30 * 60));
        loop {
            interval.tick().await;
            let removed = state_cleanup.reap_idle(idle);
            if removed > 0 {
                log::info!("Stopped {} idle contest worker(s)", removed);
            }
        }
    });

    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_contest)
            .service(api_get_contest)
            .service(api_add_team)
            .service(api_list_teams)
            .service(api_configure_bracket)
            .service(api_get_bracket)
            .service(api_place_teams)
            .service(api_assign_slot)
            .service(api_resync)
            .service(api_schedule_matches)
            .service(api_list_matches)
            .service(api_list_points)
            .service(api_table_pass)
            .service(api_table_board)
            .service(api_relocate)
            .service(api_submit_lineups)
            .service(api_record_score)
            .service(api_standings)
    })
    .bind(bind)?
    .run()
    .await
}
