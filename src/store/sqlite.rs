//! SQLite persistence for contests, teams, matches and match points.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::AssignmentStore;
use crate::models::{
    BracketDocument, Contest, ContestId, ContestMatch, ContestStatus, MatchId, MatchPoint, MemberId, PointConfig,
    PointId, PointType, Score, StoreError, TableSlot, Team, TeamId,
};

/// SQLite-backed store using the `contest`, `contest_team`, `contest_match` and
/// `contest_match_detail` tables.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database at `path` and ensure all tables exist. Pass
    /// `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contest (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                match_mode        TEXT NOT NULL,
                table_count       INTEGER NOT NULL,
                total_points      INTEGER NOT NULL,
                points_config     TEXT NOT NULL,
                bracket_structure TEXT,
                status            TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contest_team (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                contest_id TEXT NOT NULL REFERENCES contest(id),
                name       TEXT NOT NULL,
                captain_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS contest_match (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                contest_id     TEXT NOT NULL REFERENCES contest(id),
                team1_id       INTEGER NOT NULL REFERENCES contest_team(id),
                team2_id       INTEGER NOT NULL REFERENCES contest_team(id),
                round          INTEGER NOT NULL,
                sequence       INTEGER NOT NULL,
                winner_team_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS contest_match_detail (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id          INTEGER NOT NULL REFERENCES contest_match(id),
                sequence          INTEGER NOT NULL,
                match_type        TEXT NOT NULL,
                team1_member_ids  TEXT NOT NULL DEFAULT '[]',
                team2_member_ids  TEXT NOT NULL DEFAULT '[]',
                table_no          TEXT,
                score             TEXT,
                winner_team_id    INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_contest_team_contest ON contest_team(contest_id);
            CREATE INDEX IF NOT EXISTS idx_contest_match_contest ON contest_match(contest_id);
            CREATE INDEX IF NOT EXISTS idx_match_detail_match ON contest_match_detail(match_id);
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Unit enums are stored as their serde name.
fn to_text<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

fn from_text<T: DeserializeOwned>(column: &'static str, raw: String) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(raw.clone()))
        .map_err(|_| StoreError::InvalidColumn { column, value: raw })
}

fn parse_contest_id(raw: String) -> Result<ContestId, StoreError> {
    Uuid::parse_str(&raw).map_err(|_| StoreError::InvalidColumn {
        column: "contest_id",
        value: raw,
    })
}

/// Raw `contest_match_detail` row before column parsing.
struct PointRow {
    id: PointId,
    match_id: MatchId,
    sequence: u32,
    match_type: String,
    team1_member_ids: String,
    team2_member_ids: String,
    table_no: Option<String>,
    score: Option<String>,
    winner_team_id: Option<TeamId>,
}

const POINT_COLUMNS: &str = "d.id, d.match_id, d.sequence, d.match_type, d.team1_member_ids, d.team2_member_ids, d.table_no, d.score, d.winner_team_id";

impl PointRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            match_id: row.get(1)?,
            sequence: row.get(2)?,
            match_type: row.get(3)?,
            team1_member_ids: row.get(4)?,
            team2_member_ids: row.get(5)?,
            table_no: row.get(6)?,
            score: row.get(7)?,
            winner_team_id: row.get(8)?,
        })
    }

    fn into_point(self) -> Result<MatchPoint, StoreError> {
        Ok(MatchPoint {
            id: self.id,
            match_id: self.match_id,
            sequence: self.sequence,
            point_type: from_text("match_type", self.match_type)?,
            table_slot: TableSlot::parse(self.table_no.as_deref())?,
            team1_member_ids: serde_json::from_str(&self.team1_member_ids)?,
            team2_member_ids: serde_json::from_str(&self.team2_member_ids)?,
            score: self.score.as_deref().map(Score::parse).transpose()?,
            winner_team_id: self.winner_team_id,
        })
    }
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<(MatchId, String, TeamId, TeamId, u32, u32, Option<TeamId>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?))
}

impl AssignmentStore for SqliteStore {
    fn insert_contest(&self, contest: &Contest) -> Result<(), StoreError> {
        let points_config = serde_json::to_string(&contest.points_config)?;
        self.conn()?.execute(
            "INSERT INTO contest (id, name, match_mode, table_count, total_points, points_config, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                contest.id.to_string(),
                contest.name,
                to_text(&contest.match_mode)?,
                contest.table_count,
                contest.total_points,
                points_config,
                to_text(&contest.status)?,
            ],
        )?;
        Ok(())
    }

    fn load_contest(&self, id: ContestId) -> Result<Contest, StoreError> {
        let row = self
            .conn()?
            .query_row(
                "SELECT name, match_mode, table_count, total_points, points_config, status
                 FROM contest WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        let (name, mode, table_count, total_points, points_config, status) =
            row.ok_or_else(|| StoreError::not_found("contest", id))?;
        let points_config: Vec<PointConfig> = serde_json::from_str(&points_config)?;
        Ok(Contest {
            id,
            name,
            match_mode: from_text("match_mode", mode)?,
            table_count,
            total_points,
            points_config,
            status: from_text("status", status)?,
        })
    }

    fn set_contest_status(&self, id: ContestId, status: ContestStatus) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE contest SET status = ?1 WHERE id = ?2",
            params![to_text(&status)?, id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("contest", id));
        }
        Ok(())
    }

    fn insert_team(&self, contest_id: ContestId, name: &str) -> Result<Team, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contest_team (contest_id, name) VALUES (?1, ?2)",
            params![contest_id.to_string(), name],
        )?;
        Ok(Team::new(conn.last_insert_rowid(), contest_id, name))
    }

    fn load_teams(&self, contest_id: ContestId) -> Result<Vec<Team>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, captain_id FROM contest_team WHERE contest_id = ?1 ORDER BY id")?;
        let teams = stmt
            .query_map(params![contest_id.to_string()], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    contest_id,
                    name: row.get(1)?,
                    captain_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    fn load_bracket(&self, contest_id: ContestId) -> Result<Option<BracketDocument>, StoreError> {
        let raw: Option<Option<String>> = self
            .conn()?
            .query_row(
                "SELECT bracket_structure FROM contest WHERE id = ?1",
                params![contest_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            None => Err(StoreError::not_found("contest", contest_id)),
            Some(None) => Ok(None),
            Some(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
        }
    }

    fn save_bracket(&self, contest_id: ContestId, doc: &BracketDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string(doc)?;
        let changed = self.conn()?.execute(
            "UPDATE contest SET bracket_structure = ?1 WHERE id = ?2",
            params![json, contest_id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("contest", contest_id));
        }
        Ok(())
    }

    fn insert_match(
        &self,
        contest_id: ContestId,
        team1_id: TeamId,
        team2_id: TeamId,
        round: u32,
        sequence: u32,
    ) -> Result<ContestMatch, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contest_match (contest_id, team1_id, team2_id, round, sequence) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![contest_id.to_string(), team1_id, team2_id, round, sequence],
        )?;
        Ok(ContestMatch {
            id: conn.last_insert_rowid(),
            contest_id,
            team1_id,
            team2_id,
            round,
            sequence,
            winner_team_id: None,
        })
    }

    fn load_matches(&self, contest_id: ContestId) -> Result<Vec<ContestMatch>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, contest_id, team1_id, team2_id, round, sequence, winner_team_id
             FROM contest_match WHERE contest_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![contest_id.to_string()], match_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, contest, team1_id, team2_id, round, sequence, winner_team_id)| {
                Ok(ContestMatch {
                    id,
                    contest_id: parse_contest_id(contest)?,
                    team1_id,
                    team2_id,
                    round,
                    sequence,
                    winner_team_id,
                })
            })
            .collect()
    }

    fn set_match_winner(&self, match_id: MatchId, winner: Option<TeamId>) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE contest_match SET winner_team_id = ?1 WHERE id = ?2",
            params![winner, match_id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("match", match_id));
        }
        Ok(())
    }

    fn insert_point(&self, match_id: MatchId, sequence: u32, point_type: PointType) -> Result<MatchPoint, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contest_match_detail (match_id, sequence, match_type) VALUES (?1, ?2, ?3)",
            params![match_id, sequence, to_text(&point_type)?],
        )?;
        Ok(MatchPoint::new(conn.last_insert_rowid(), match_id, sequence, point_type))
    }

    fn load_points(&self, contest_id: ContestId) -> Result<Vec<MatchPoint>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POINT_COLUMNS} FROM contest_match_detail d
             JOIN contest_match m ON m.id = d.match_id
             WHERE m.contest_id = ?1 ORDER BY d.id"
        ))?;
        let rows = stmt
            .query_map(params![contest_id.to_string()], PointRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(PointRow::into_point).collect()
    }

    fn load_point(&self, point_id: PointId) -> Result<MatchPoint, StoreError> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {POINT_COLUMNS} FROM contest_match_detail d WHERE d.id = ?1"),
                params![point_id],
                PointRow::from_row,
            )
            .optional()?;
        row.ok_or_else(|| StoreError::not_found("match point", point_id))?
            .into_point()
    }

    fn set_table_slot(&self, point_id: PointId, slot: TableSlot) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE contest_match_detail SET table_no = ?1 WHERE id = ?2",
            params![slot.to_column(), point_id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("match point", point_id));
        }
        Ok(())
    }

    fn set_lineups(&self, point_id: PointId, team1: &[MemberId], team2: &[MemberId]) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE contest_match_detail SET team1_member_ids = ?1, team2_member_ids = ?2 WHERE id = ?3",
            params![serde_json::to_string(team1)?, serde_json::to_string(team2)?, point_id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("match point", point_id));
        }
        Ok(())
    }

    fn set_score(&self, point_id: PointId, score: Option<Score>, winner: Option<TeamId>) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE contest_match_detail SET score = ?1, winner_team_id = ?2 WHERE id = ?3",
            params![score.map(|s| s.to_string()), winner, point_id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("match point", point_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bracket, MatchMode, SeedRecord};

    /// Helper: a fresh in-memory database with one contest.
    fn test_store() -> (SqliteStore, Contest) {
        let store = SqliteStore::open(":memory:").expect("in-memory database should open");
        let contest = Contest::new("Club night", MatchMode::RoundRobin, 2, 3);
        store.insert_contest(&contest).unwrap();
        (store, contest)
    }

    #[test]
    fn contest_round_trips_enums_and_config() {
        let (store, contest) = test_store();
        let loaded = store.load_contest(contest.id).unwrap();
        assert_eq!(loaded, contest);

        store.set_contest_status(contest.id, ContestStatus::InProgress).unwrap();
        assert_eq!(store.load_contest(contest.id).unwrap().status, ContestStatus::InProgress);
    }

    #[test]
    fn missing_contest_is_not_found() {
        let (store, _) = test_store();
        assert!(matches!(
            store.load_contest(Uuid::new_v4()),
            Err(StoreError::NotFound { entity: "contest", .. })
        ));
    }

    #[test]
    fn points_keep_slot_lineups_and_score() {
        let (store, contest) = test_store();
        let a = store.insert_team(contest.id, "Aces").unwrap();
        let b = store.insert_team(contest.id, "Blades").unwrap();
        let m = store.insert_match(contest.id, a.id, b.id, 1, 1).unwrap();
        let p1 = store.insert_point(m.id, 1, PointType::Single).unwrap();
        let p2 = store.insert_point(m.id, 2, PointType::Double).unwrap();

        store.set_table_slot(p1.id, TableSlot::Table(2)).unwrap();
        store.set_table_slot(p2.id, TableSlot::Freed).unwrap();
        store.set_lineups(p1.id, &[10], &[20]).unwrap();
        store
            .set_score(p1.id, Some(Score { team1: 11, team2: 4 }), Some(a.id))
            .unwrap();

        let points = store.load_points(contest.id).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].table_slot, TableSlot::Table(2));
        assert_eq!(points[0].team1_member_ids, vec![10]);
        assert_eq!(points[0].winner_team_id, Some(a.id));
        assert_eq!(points[1].table_slot, TableSlot::Freed);
        assert_eq!(points[1].point_type, PointType::Double);
        assert_eq!(store.load_point(p2.id).unwrap(), points[1]);
    }

    #[test]
    fn bracket_column_starts_empty_and_saves() {
        let (store, contest) = test_store();
        assert!(store.load_bracket(contest.id).unwrap().is_none());

        let doc = BracketDocument::new(Bracket::Plain {
            rounds: Vec::new(),
            seeds: SeedRecord::default(),
        });
        store.save_bracket(contest.id, &doc).unwrap();
        assert_eq!(store.load_bracket(contest.id).unwrap(), Some(doc));
    }

    #[test]
    fn unknown_point_update_is_not_found() {
        let (store, _) = test_store();
        assert!(matches!(
            store.set_table_slot(999, TableSlot::Next),
            Err(StoreError::NotFound { .. })
        ));
    }
}
