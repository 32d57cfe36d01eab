use super::{ConnectivityCheckRecord, OutageEvent, Sink, SinkError, StatusChangeRecord};
use crate::config::DeviceId;
use crate::monitor::ConnectionStatus;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub type DbPool = Pool<SqliteConnectionManager>;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: "001_initial_schema",
            sql: "-- tables are created by init_db
                  SELECT 1;",
        },
        Migration {
            name: "002_open_outage_index",
            sql: "CREATE INDEX IF NOT EXISTS idx_outages_open
                      ON outages(device_id) WHERE end_time IS NULL;",
        },
    ]
}

/// SQLite-backed record store.
pub struct SqliteSink {
    pool: DbPool,
}

impl SqliteSink {
    /// Opens (creating if needed) the database, applies pending migrations and
    /// closes outages left open by a previous run.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout=5000;"));
        let pool = Pool::builder().max_size(4).build(manager)?;
        pool.get()?.execute_batch("PRAGMA journal_mode=WAL;")?;

        let sink = Self { pool };
        sink.init_db()?;
        let applied = sink.run_pending_migrations()?;
        if !applied.is_empty() {
            debug!(migrations = ?applied, "applied database migrations");
        }
        let reconciled = sink.reconcile_open_outages()?;
        if reconciled > 0 {
            info!(count = reconciled, "closed outages left open by a previous run");
        }
        info!(path = %path.display(), "opened outage database");
        Ok(sink)
    }

    fn init_db(&self) -> Result<(), SinkError> {
        let conn = self.pool.get()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS migrations (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS connectivity_checks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                success INTEGER NOT NULL,
                latency_ms INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                error TEXT
            );

            CREATE TABLE IF NOT EXISTS status_changes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                from_status TEXT NOT NULL,
                to_status TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS outages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER,
                duration_ms INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_checks_device_ts ON connectivity_checks(device_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_status_changes_ts ON status_changes(timestamp);
            CREATE INDEX IF NOT EXISTS idx_outages_start ON outages(start_time);",
        )?;
        Ok(())
    }

    fn run_pending_migrations(&self) -> Result<Vec<&'static str>, SinkError> {
        let mut conn = self.pool.get()?;
        let applied_set: HashSet<String> = conn
            .prepare("SELECT name FROM migrations ORDER BY id")?
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<String>, _>>()?;

        let mut newly_applied = Vec::new();
        for migration in all_migrations() {
            if applied_set.contains(migration.name) {
                continue;
            }
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)?;
            tx.execute(
                "INSERT INTO migrations (name) VALUES (?1)",
                params![migration.name],
            )?;
            tx.commit()?;
            newly_applied.push(migration.name);
        }
        Ok(newly_applied)
    }

    /// Ends every open outage at the last check recorded after it started.
    fn reconcile_open_outages(&self) -> Result<usize, SinkError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let closed = tx.execute(
            "UPDATE outages SET end_time = COALESCE(
                 (SELECT MAX(c.timestamp) FROM connectivity_checks c
                   WHERE c.device_id = outages.device_id AND c.timestamp >= outages.start_time),
                 outages.start_time)
             WHERE end_time IS NULL",
            [],
        )?;
        tx.execute(
            "UPDATE outages SET duration_ms = end_time - start_time
             WHERE duration_ms IS NULL AND end_time IS NOT NULL",
            [],
        )?;
        tx.commit()?;
        Ok(closed)
    }

    pub fn query_checks(
        &self,
        device_id: DeviceId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ConnectivityCheckRecord>, SinkError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT device_id, success, latency_ms, timestamp, error FROM connectivity_checks
             WHERE device_id = ?1 AND timestamp >= ?2 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![device_id.to_string(), since.timestamp_millis()], |row| {
                Ok(ConnectivityCheckRecord {
                    device_id: device_id_column(row, 0)?,
                    success: row.get(1)?,
                    latency: Duration::from_millis(row.get::<_, i64>(2)?.max(0) as u64),
                    timestamp: timestamp_column(row, 3)?,
                    error: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn query_status_changes(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusChangeRecord>, SinkError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT device_id, from_status, to_status, timestamp FROM status_changes
             WHERE timestamp >= ?1 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![since.timestamp_millis()], |row| {
                Ok(StatusChangeRecord {
                    device_id: device_id_column(row, 0)?,
                    from: status_column(row, 1)?,
                    to: status_column(row, 2)?,
                    timestamp: timestamp_column(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn open_outage_start(&self, device_id: DeviceId) -> Result<Option<DateTime<Utc>>, SinkError> {
        let conn = self.pool.get()?;
        let start: Option<i64> = conn
            .query_row(
                "SELECT start_time FROM outages WHERE device_id = ?1 AND end_time IS NULL
                 ORDER BY start_time DESC LIMIT 1",
                params![device_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(start.and_then(DateTime::from_timestamp_millis))
    }
}

impl Sink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn record_check(&self, record: &ConnectivityCheckRecord) -> Result<(), SinkError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO connectivity_checks (device_id, success, latency_ms, timestamp, error)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.device_id.to_string(),
                record.success,
                record.latency.as_millis() as i64,
                record.timestamp.timestamp_millis(),
                record.error,
            ],
        )?;
        Ok(())
    }

    fn record_status_change(&self, change: &StatusChangeRecord) -> Result<(), SinkError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO status_changes (device_id, from_status, to_status, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                change.device_id.to_string(),
                change.from.label(),
                change.to.label(),
                change.timestamp.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn record_outage_start(&self, device_id: DeviceId, at: DateTime<Utc>) -> Result<(), SinkError> {
        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT INTO outages (device_id, start_time)
             SELECT ?1, ?2 WHERE NOT EXISTS
                 (SELECT 1 FROM outages WHERE device_id = ?1 AND end_time IS NULL)",
            params![device_id.to_string(), at.timestamp_millis()],
        )?;
        if inserted == 0 {
            return Err(SinkError::OutageAlreadyOpen(device_id));
        }
        Ok(())
    }

    fn record_outage_end(
        &self,
        device_id: DeviceId,
        duration: Duration,
        at: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE outages SET end_time = ?2, duration_ms = ?3
             WHERE id = (SELECT id FROM outages WHERE device_id = ?1 AND end_time IS NULL
                         ORDER BY start_time DESC LIMIT 1)",
            params![
                device_id.to_string(),
                at.timestamp_millis(),
                duration.as_millis() as i64,
            ],
        )?;
        if updated == 0 {
            return Err(SinkError::NoOpenOutage(device_id));
        }
        Ok(())
    }

    fn query_outages(&self, since: DateTime<Utc>) -> Result<Vec<OutageEvent>, SinkError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT device_id, start_time, end_time, duration_ms FROM outages
             WHERE start_time >= ?1 ORDER BY start_time ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![since.timestamp_millis()], |row| {
                let end: Option<i64> = row.get(2)?;
                let duration: Option<i64> = row.get(3)?;
                Ok(OutageEvent {
                    device_id: device_id_column(row, 0)?,
                    start: timestamp_column(row, 1)?,
                    end: end.and_then(DateTime::from_timestamp_millis),
                    duration: duration.map(|ms| Duration::from_millis(ms.max(0) as u64)),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn device_id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DeviceId> {
    let raw: String = row.get(idx)?;
    DeviceId::parse_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ConnectionStatus> {
    let raw: String = row.get(idx)?;
    raw.parse::<ConnectionStatus>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}
