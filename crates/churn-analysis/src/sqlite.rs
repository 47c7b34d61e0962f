//! SQLite storage and SQL-side aggregation.
//!
//! Play events live in a single `game_logs` table. The funnel and timing
//! reports are computed by SQL queries, the rate arithmetic is shared with
//! the in-memory engine so both produce identical rows.

use std::path::Path;

use churn_events::{format_date, parse_date, Level, PlayEvent};
use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use crate::engine::FunnelEngine;
use crate::funnel::{FunnelCounts, LevelFunnelStat};
use crate::timing::LevelTimingStat;
use crate::AnalysisError;

/// Schema for the play-log table.
pub const CREATE_GAME_LOGS_SQL: &str = "
CREATE TABLE IF NOT EXISTS game_logs (
    userid TEXT NOT NULL,
    install_date DATE NOT NULL,
    play_date DATE NOT NULL,
    level_cleared INTEGER NOT NULL
)";

const INSERT_EVENT_SQL: &str = "
INSERT INTO game_logs (userid, install_date, play_date, level_cleared)
VALUES (?1, ?2, ?3, ?4)";

const SELECT_EVENTS_SQL: &str = "
SELECT userid, install_date, play_date, level_cleared
FROM game_logs
ORDER BY rowid";

/// Per-level reach and stop counts, with the reach of the next observed level.
const LEVEL_FUNNEL_SQL: &str = "
WITH user_max_level AS (
    SELECT userid, MAX(level_cleared) AS max_level
    FROM game_logs
    GROUP BY userid
),
levels AS (
    SELECT DISTINCT level_cleared AS level
    FROM game_logs
),
stopped_users AS (
    SELECT max_level AS level, COUNT(*) AS users_stopped
    FROM user_max_level
    GROUP BY max_level
),
level_stats AS (
    SELECT
        l.level,
        COALESCE(su.users_stopped, 0) AS users_stopped,
        SUM(COALESCE(su.users_stopped, 0)) OVER (ORDER BY l.level DESC) AS users_reached
    FROM levels l
    LEFT JOIN stopped_users su ON su.level = l.level
)
SELECT
    level,
    users_reached,
    users_stopped,
    LEAD(users_reached) OVER (ORDER BY level) AS next_users_reached
FROM level_stats
ORDER BY level";

/// Summed day deltas between consecutive level starts, per level.
const LEVEL_TIMING_SQL: &str = "
WITH level_times AS (
    SELECT
        userid,
        level_cleared AS level,
        MIN(play_date) AS level_start_date
    FROM game_logs
    GROUP BY userid, level_cleared
)
SELECT
    t1.level,
    SUM(CAST(JULIANDAY(t2.level_start_date) - JULIANDAY(t1.level_start_date) AS INTEGER)) AS total_days,
    COUNT(*) AS users
FROM level_times t1
JOIN level_times t2 ON t1.userid = t2.userid AND t2.level = t1.level + 1
GROUP BY t1.level
ORDER BY t1.level";

/// Owns a SQLite connection holding the `game_logs` table.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a database file and ensures the schema exists.
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened SQLite database");
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, AnalysisError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AnalysisError> {
        conn.execute_batch(CREATE_GAME_LOGS_SQL)?;
        Ok(Self { conn })
    }

    /// Read-only handle for query engines.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Appends events in a single transaction.
    pub fn insert_events(&mut self, events: &[PlayEvent]) -> Result<usize, AnalysisError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_EVENT_SQL)?;
            for event in events {
                stmt.execute(params![
                    event.user_id,
                    format_date(event.install_date),
                    format_date(event.play_date),
                    event.level_cleared,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = events.len(), "inserted play events into game_logs");
        Ok(events.len())
    }

    /// Replaces the whole table contents with `events`.
    pub fn replace_events(&mut self, events: &[PlayEvent]) -> Result<usize, AnalysisError> {
        let removed = self.conn.execute("DELETE FROM game_logs", [])?;
        if removed > 0 {
            debug!(rows = removed, "cleared existing game_logs rows");
        }
        self.insert_events(events)
    }

    /// Number of stored events.
    pub fn event_count(&self) -> Result<u64, AnalysisError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM game_logs", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Reads every stored event into memory, in insertion order.
    pub fn read_events(&self) -> Result<Vec<PlayEvent>, AnalysisError> {
        let mut stmt = self.conn.prepare(SELECT_EVENTS_SQL)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Level>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(user_id, install, play, level)| {
                let install_date = parse_stored_date(&install)?;
                let play_date = parse_stored_date(&play)?;
                Ok(PlayEvent::new(user_id, install_date, play_date, level))
            })
            .collect()
    }
}

fn parse_stored_date(value: &str) -> Result<chrono::NaiveDate, AnalysisError> {
    parse_date(value).ok_or_else(|| AnalysisError::InvalidRow(format!("bad date '{}'", value)))
}

fn get_count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

/// Runs the funnel and timing queries against a borrowed connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteEngine<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteEngine<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl FunnelEngine for SqliteEngine<'_> {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn level_funnel(&self) -> Result<Vec<LevelFunnelStat>, AnalysisError> {
        let mut stmt = self.conn.prepare(LEVEL_FUNNEL_SQL)?;
        let rows = stmt
            .query_map([], |row| {
                let counts = FunnelCounts {
                    level: row.get(0)?,
                    users_reached: get_count(row, 1)?,
                    users_stopped: get_count(row, 2)?,
                };
                let next = row
                    .get::<_, Option<i64>>(3)?
                    .map(|_| get_count(row, 3))
                    .transpose()?;
                Ok(LevelFunnelStat::from_counts(counts, next))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn level_timing(&self) -> Result<Vec<LevelTimingStat>, AnalysisError> {
        let mut stmt = self.conn.prepare(LEVEL_TIMING_SQL)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LevelTimingStat::from_totals(
                    row.get(0)?,
                    row.get(1)?,
                    get_count(row, 2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::compute_funnel;
    use crate::timing::timing_report;
    use churn_events::fixtures::{day, sample_events, three_user_scenario};

    fn loaded(events: &[PlayEvent]) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_events(events).unwrap();
        store
    }

    #[test]
    fn test_empty_table_yields_empty_reports() {
        let store = SqliteStore::open_in_memory().unwrap();
        let engine = SqliteEngine::new(store.connection());
        assert!(engine.level_funnel().unwrap().is_empty());
        assert!(engine.level_timing().unwrap().is_empty());
        assert_eq!(store.event_count().unwrap(), 0);
    }

    #[test]
    fn test_events_round_trip_through_table() {
        let events = sample_events();
        let store = loaded(&events);
        assert_eq!(store.event_count().unwrap(), events.len() as u64);
        assert_eq!(store.read_events().unwrap(), events);
    }

    #[test]
    fn test_sql_funnel_matches_memory() {
        for events in [sample_events(), three_user_scenario()] {
            let store = loaded(&events);
            let engine = SqliteEngine::new(store.connection());
            assert_eq!(engine.level_funnel().unwrap(), compute_funnel(&events));
        }
    }

    #[test]
    fn test_sql_timing_matches_memory() {
        let events = sample_events();
        let store = loaded(&events);
        let engine = SqliteEngine::new(store.connection());
        assert_eq!(engine.level_timing().unwrap(), timing_report(&events));
    }

    #[test]
    fn test_sql_timing_negative_delta() {
        let events = vec![
            PlayEvent::new("u", day(1), day(5), 1),
            PlayEvent::new("u", day(1), day(3), 2),
        ];
        let store = loaded(&events);
        let timing = SqliteEngine::new(store.connection()).level_timing().unwrap();
        assert_eq!(timing.len(), 1);
        assert_eq!(timing[0].total_days, -2);
        assert_eq!(timing[0].avg_days_to_complete, -2.0);
    }

    #[test]
    fn test_replace_events_clears_previous_rows() {
        let mut store = loaded(&sample_events());
        let scenario = three_user_scenario();
        store.replace_events(&scenario).unwrap();
        assert_eq!(store.event_count().unwrap(), scenario.len() as u64);
    }

    #[test]
    fn test_duplicate_inserts_do_not_change_funnel() {
        let events = sample_events();
        let mut store = loaded(&events);
        store.insert_events(&events).unwrap();

        let engine = SqliteEngine::new(store.connection());
        assert_eq!(engine.level_funnel().unwrap(), compute_funnel(&events));
        assert_eq!(engine.level_timing().unwrap(), timing_report(&events));
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_analytics.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_events(&three_user_scenario()).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.event_count().unwrap(), 5);
    }

    #[test]
    fn test_bad_stored_date_is_invalid_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO game_logs VALUES ('u', 'not-a-date', '2024-01-01', 1)",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.read_events(),
            Err(AnalysisError::InvalidRow(_))
        ));
    }
}
