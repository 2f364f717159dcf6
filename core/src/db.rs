use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{
    DATE_FORMAT, ExportData, ExportSetting, ImportSummary, LogEntry, LogKind, NewLogEntry,
    SettingKey, WeightEntry,
};

/// Highest schema version this build knows how to create.
pub const SCHEMA_VERSION: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::InMemory => f.write_str(":memory:"),
        }
    }
}

/// The three independent collections kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Log,
    WeightLog,
    Settings,
}

impl Collection {
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::WeightLog => "weight_log",
            Self::Settings => "settings",
        }
    }
}

enum ConnectionState {
    Unopened,
    Opening,
    Open(Connection),
}

/// Versioned local store over a single SQLite connection.
///
/// The connection is opened on first use and cached until the store is
/// dropped. While an open is running the state reads `Opening`; any caller
/// arriving in that window is refused with [`StoreError::OpenInProgress`].
pub struct LocalStore {
    location: StoreLocation,
    state: Mutex<ConnectionState>,
    writes: AtomicU64,
}

impl LocalStore {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location,
            state: Mutex::new(ConnectionState::Unopened),
            writes: AtomicU64::new(0),
        }
    }

    pub fn open(path: &Path) -> Self {
        Self::new(StoreLocation::File(path.to_path_buf()))
    }

    pub fn in_memory() -> Self {
        Self::new(StoreLocation::InMemory)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .is_ok_and(|state| matches!(*state, ConnectionState::Open(_)))
    }

    /// Number of durable writes issued through this store since it was created.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.with_connection(|conn| {
            Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
        })
    }

    // --- Connection handling ---

    fn lock(&self) -> Result<MutexGuard<'_, ConnectionState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::Error::from(StoreError::Poisoned))
    }

    fn ensure_open(&self) -> Result<()> {
        {
            let mut state = self.lock()?;
            match &*state {
                ConnectionState::Open(_) => return Ok(()),
                ConnectionState::Opening => return Err(StoreError::OpenInProgress.into()),
                ConnectionState::Unopened => {}
            }
            *state = ConnectionState::Opening;
        }

        let opened = self.establish();
        let mut state = self.lock()?;
        match opened {
            Ok(conn) => {
                debug!(location = %self.location, "local store opened");
                *state = ConnectionState::Open(conn);
                Ok(())
            }
            Err(err) => {
                *state = ConnectionState::Unopened;
                warn!(location = %self.location, "failed to open local store: {err:#}");
                if err.downcast_ref::<StoreError>().is_some() {
                    return Err(err);
                }
                Err(StoreError::Unavailable {
                    location: self.location.to_string(),
                    reason: format!("{err:#}"),
                }
                .into())
            }
        }
    }

    fn establish(&self) -> Result<Connection> {
        let conn = match &self.location {
            StoreLocation::File(path) => Connection::open(path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?,
            StoreLocation::InMemory => Connection::open_in_memory()?,
        };
        migrate_to(&conn, SCHEMA_VERSION)?;
        Ok(conn)
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.ensure_open()?;
        let state = self.lock()?;
        match &*state {
            ConnectionState::Open(conn) => f(conn),
            ConnectionState::Opening => Err(StoreError::OpenInProgress.into()),
            ConnectionState::Unopened => Err(StoreError::Unavailable {
                location: self.location.to_string(),
                reason: "connection closed".to_string(),
            }
            .into()),
        }
    }

    pub fn count(&self, collection: Collection) -> Result<i64> {
        self.with_connection(|conn| {
            Ok(conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", collection.table_name()),
                [],
                |row| row.get(0),
            )?)
        })
    }

    /// Put the store in the middle of an open, as a concurrent caller would.
    #[cfg(test)]
    pub(crate) fn mark_opening(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = ConnectionState::Opening;
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    // --- Row mapping helpers ---

    // Expects columns:
    // 0: id, 1: type, 2: food, 3: quantity, 4: energy_kj, 5: timestamp, 6: local_date
    fn log_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<LogEntry> {
        let kind: String = row.get(1)?;
        let kind = LogKind::parse(&kind)
            .ok_or_else(|| rusqlite::Error::InvalidColumnType(1, "type".into(), Type::Text))?;
        Ok(LogEntry {
            id: row.get(0)?,
            kind,
            food: row.get(2)?,
            quantity: row.get(3)?,
            energy_kj: row.get(4)?,
            timestamp: row.get(5)?,
            local_date: date_from_column(row, 6)?,
        })
    }

    fn weight_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightEntry> {
        Ok(WeightEntry {
            local_date: date_from_column(row, 0)?,
            weight: row.get(1)?,
        })
    }

    fn collect_log(
        conn: &Connection,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<LogEntry>> {
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map(args, Self::log_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // --- Log ---

    pub fn add_log_entry(&self, entry: &NewLogEntry) -> Result<LogEntry> {
        let id = self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO log (type, food, quantity, energy_kj, timestamp, local_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.kind.as_str(),
                    entry.food,
                    entry.quantity,
                    entry.energy_kj,
                    entry.timestamp,
                    date_key(entry.local_date),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        self.record_write();
        Ok(entry.clone().with_id(id))
    }

    pub fn get_log_entry(&self, id: i64) -> Result<Option<LogEntry>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, type, food, quantity, energy_kj, timestamp, local_date
                     FROM log WHERE id = ?1",
                    params![id],
                    Self::log_entry_from_row,
                )
                .optional()?)
        })
    }

    /// Entries with `timestamp` in `(lower, upper]`, or `(lower, ∞)` without an
    /// upper bound, in ascending timestamp order.
    pub fn query_log_range(&self, lower: i64, upper: Option<i64>) -> Result<Vec<LogEntry>> {
        self.with_connection(|conn| match upper {
            Some(upper) => Self::collect_log(
                conn,
                "SELECT id, type, food, quantity, energy_kj, timestamp, local_date
                 FROM log WHERE timestamp > ?1 AND timestamp <= ?2
                 ORDER BY timestamp, id",
                params![lower, upper],
            ),
            None => Self::collect_log(
                conn,
                "SELECT id, type, food, quantity, energy_kj, timestamp, local_date
                 FROM log WHERE timestamp > ?1
                 ORDER BY timestamp, id",
                params![lower],
            ),
        })
    }

    pub fn log_entries_for_date(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        self.with_connection(|conn| {
            Self::collect_log(
                conn,
                "SELECT id, type, food, quantity, energy_kj, timestamp, local_date
                 FROM log WHERE local_date = ?1
                 ORDER BY timestamp, id",
                params![date_key(date)],
            )
        })
    }

    pub fn all_log_entries(&self) -> Result<Vec<LogEntry>> {
        self.with_connection(|conn| {
            Self::collect_log(
                conn,
                "SELECT id, type, food, quantity, energy_kj, timestamp, local_date
                 FROM log ORDER BY id",
                [],
            )
        })
    }

    // --- Weight log ---

    pub fn put_weight(&self, entry: &WeightEntry) -> Result<WeightEntry> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO weight_log (local_date, weight) VALUES (?1, ?2)
                 ON CONFLICT(local_date) DO UPDATE SET weight = excluded.weight",
                params![date_key(entry.local_date), entry.weight],
            )?;
            Ok(())
        })?;
        self.record_write();
        Ok(entry.clone())
    }

    pub fn get_weight(&self, date: NaiveDate) -> Result<Option<WeightEntry>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT local_date, weight FROM weight_log WHERE local_date = ?1",
                    params![date_key(date)],
                    Self::weight_entry_from_row,
                )
                .optional()?)
        })
    }

    pub fn latest_weight(&self) -> Result<Option<WeightEntry>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT local_date, weight FROM weight_log
                     ORDER BY local_date DESC LIMIT 1",
                    [],
                    Self::weight_entry_from_row,
                )
                .optional()?)
        })
    }

    /// Most recent first; `limit` of `None` returns everything.
    pub fn weight_history(&self, limit: Option<i64>) -> Result<Vec<WeightEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT local_date, weight FROM weight_log
                 ORDER BY local_date DESC LIMIT ?1",
            )?;
            let entries = stmt
                .query_map(params![limit.unwrap_or(-1)], Self::weight_entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    // --- Settings ---

    pub fn put_setting_value(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO settings (name, value) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                params![name, encoded],
            )?;
            Ok(())
        })?;
        self.record_write();
        Ok(())
    }

    pub fn get_setting_value(&self, name: &str) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> = self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM settings WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        raw.map(|s| {
            serde_json::from_str::<serde_json::Value>(&s)
                .with_context(|| format!("Corrupt value for setting '{name}'"))
        })
        .transpose()
    }

    pub fn set_setting<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        self.put_setting_value(name, &serde_json::to_value(value)?)
    }

    pub fn get_setting<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.get_setting_value(name)?
            .map(|v| {
                serde_json::from_value(v)
                    .with_context(|| format!("Unexpected value type for setting '{name}'"))
            })
            .transpose()
    }

    pub fn delete_setting(&self, name: &str) -> Result<bool> {
        let rows = self.with_connection(|conn| {
            Ok(conn.execute("DELETE FROM settings WHERE name = ?1", params![name])?)
        })?;
        self.record_write();
        Ok(rows > 0)
    }

    pub fn all_settings(&self) -> Result<Vec<ExportSetting>> {
        let rows: Vec<(String, String)> = self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT name, value FROM settings ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        rows.into_iter()
            .map(|(name, raw)| {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Corrupt value for setting '{name}'"))?;
                Ok(ExportSetting { name, value })
            })
            .collect()
    }

    // --- Export / Import ---

    pub fn export_all(&self) -> Result<ExportData> {
        let log = self.all_log_entries()?;
        let weight_log = self.weight_history(None)?;
        let settings = self.all_settings()?;

        Ok(ExportData {
            version: SCHEMA_VERSION,
            exported_at: Local::now().to_rfc3339(),
            log,
            weight_log,
            settings,
        })
    }

    /// Merge a snapshot into the store. Log entries keep their ids (replacing
    /// any entry with the same id); weights and settings are upserted. Profile
    /// settings with the wrong shape reject the whole import.
    #[allow(clippy::cast_possible_wrap)]
    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        if data.version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: data.version,
                supported: SCHEMA_VERSION,
            }
            .into());
        }

        let mut encoded_settings = Vec::with_capacity(data.settings.len());
        for setting in &data.settings {
            let value = match SettingKey::from_name(&setting.name) {
                Some(key) => key.normalize_value(&setting.value).with_context(|| {
                    format!("Invalid value for setting '{}': {}", setting.name, setting.value)
                })?,
                None => setting.value.clone(),
            };
            encoded_settings.push((setting.name.as_str(), serde_json::to_string(&value)?));
        }

        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            for entry in &data.log {
                tx.execute(
                    "INSERT OR REPLACE INTO log (id, type, food, quantity, energy_kj, timestamp, local_date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        entry.id,
                        entry.kind.as_str(),
                        entry.food,
                        entry.quantity,
                        entry.energy_kj,
                        entry.timestamp,
                        date_key(entry.local_date),
                    ],
                )?;
            }
            for entry in &data.weight_log {
                tx.execute(
                    "INSERT INTO weight_log (local_date, weight) VALUES (?1, ?2)
                     ON CONFLICT(local_date) DO UPDATE SET weight = excluded.weight",
                    params![date_key(entry.local_date), entry.weight],
                )?;
            }
            for (name, value) in &encoded_settings {
                tx.execute(
                    "INSERT INTO settings (name, value) VALUES (?1, ?2)
                     ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                    params![name, value],
                )?;
            }
            tx.commit()?;
            Ok(())
        })?;
        self.record_write();

        Ok(ImportSummary {
            log_entries_imported: data.log.len() as i64,
            weight_entries_imported: data.weight_log.len() as i64,
            settings_imported: data.settings.len() as i64,
        })
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn date_from_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Bring the schema from its stored `user_version` up to `target`, applying
/// each step at most once.
pub fn migrate_to(conn: &Connection, target: i64) -> Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            supported: SCHEMA_VERSION,
        }
        .into());
    }
    if target > SCHEMA_VERSION {
        anyhow::bail!("Unknown schema version {target}");
    }

    if version < 1 && target >= 1 {
        debug!("migrating local store to version 1");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                food TEXT,
                quantity REAL,
                energy_kj REAL NOT NULL,
                timestamp INTEGER NOT NULL,
                local_date TEXT NOT NULL
            );

            PRAGMA user_version = 1;",
        )?;
    }

    if version < 2 && target >= 2 {
        debug!("migrating local store to version 2");
        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_log_timestamp ON log(timestamp);

            PRAGMA user_version = 2;",
        )?;
    }

    if version < 3 && target >= 3 {
        debug!("migrating local store to version 3");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS weight_log (
                local_date TEXT PRIMARY KEY NOT NULL,
                weight REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                name TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );

            PRAGMA user_version = 3;",
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_entry(timestamp: i64) -> NewLogEntry {
        NewLogEntry {
            kind: LogKind::Food,
            food: Some("Apple".to_string()),
            quantity: Some(150.0),
            energy_kj: 336.0,
            timestamp,
            local_date: day(2025, 1, 15),
        }
    }

    fn schema_objects(conn: &Connection) -> Vec<(String, String, Option<String>)> {
        let mut stmt = conn
            .prepare(
                "SELECT type, name, tbl_name FROM sqlite_master
                 WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name",
            )
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn user_version(conn: &Connection) -> i64 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_store_opens_lazily() {
        let store = LocalStore::in_memory();
        assert!(!store.is_open());
        assert!(store.latest_weight().unwrap().is_none());
        assert!(store.is_open());
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_file_store_created_on_first_access() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calor.db");
        let store = LocalStore::open(&path);
        assert!(!path.exists());

        store.add_log_entry(&sample_entry(1_000)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calor.db");
        {
            let store = LocalStore::open(&path);
            store.add_log_entry(&sample_entry(1_000)).unwrap();
            store
                .put_weight(&WeightEntry {
                    local_date: day(2025, 1, 15),
                    weight: 72.5,
                })
                .unwrap();
            store.set_setting("height", &180.0).unwrap();
        }

        let store = LocalStore::open(&path);
        assert_eq!(store.all_log_entries().unwrap().len(), 1);
        assert_eq!(store.latest_weight().unwrap().unwrap().weight, 72.5);
        assert_eq!(store.get_setting::<f64>("height").unwrap(), Some(180.0));
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_unavailable_store_reports_error_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("calor.db");
        let store = LocalStore::open(&path);

        let err = store.latest_weight().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Unavailable { .. })
        ));
        assert!(!store.is_open());

        // The next access tries again once the directory exists.
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        assert!(store.latest_weight().unwrap().is_none());
        assert!(store.is_open());
    }

    #[test]
    fn test_second_open_is_refused_while_opening() {
        let store = LocalStore::in_memory();
        *store.state.lock().unwrap() = ConnectionState::Opening;

        let err = store.latest_weight().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::OpenInProgress)
        ));
        assert!(store.add_log_entry(&sample_entry(1)).is_err());
        assert!(!store.is_open());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calor.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("PRAGMA user_version = 9;").unwrap();
        }

        let store = LocalStore::open(&path);
        let err = store.all_log_entries().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::UnsupportedVersion {
                found: 9,
                supported: SCHEMA_VERSION
            })
        ));
    }

    #[test]
    fn test_migration_direct_matches_incremental() {
        let direct = Connection::open_in_memory().unwrap();
        migrate_to(&direct, 3).unwrap();

        let stepped = Connection::open_in_memory().unwrap();
        for target in 1..=3 {
            migrate_to(&stepped, target).unwrap();
            assert_eq!(user_version(&stepped), target);
        }

        assert_eq!(user_version(&direct), 3);
        assert_eq!(schema_objects(&direct), schema_objects(&stepped));
    }

    #[test]
    fn test_migration_creates_expected_objects() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_to(&conn, SCHEMA_VERSION).unwrap();
        let names: Vec<String> = schema_objects(&conn)
            .into_iter()
            .map(|(_, name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec!["idx_log_timestamp", "log", "settings", "weight_log"]
        );
    }

    #[test]
    fn test_migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_to(&conn, 3).unwrap();
        let before = schema_objects(&conn);
        migrate_to(&conn, 3).unwrap();
        assert_eq!(schema_objects(&conn), before);
    }

    #[test]
    fn test_migration_from_v1_keeps_log_rows() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_to(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO log (type, food, quantity, energy_kj, timestamp, local_date)
             VALUES ('food', 'Toast', NULL, 420.0, 5, '2025-01-01')",
            [],
        )
        .unwrap();

        migrate_to(&conn, 3).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert!(
            schema_objects(&conn)
                .iter()
                .any(|(_, name, _)| name == "idx_log_timestamp")
        );
    }

    #[test]
    fn test_migration_unknown_target() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(migrate_to(&conn, SCHEMA_VERSION + 1).is_err());
    }

    #[test]
    fn test_add_log_entry_assigns_increasing_ids() {
        let store = LocalStore::in_memory();
        let first = store.add_log_entry(&sample_entry(100)).unwrap();
        let second = store.add_log_entry(&sample_entry(50)).unwrap();
        assert!(second.id > first.id);

        let fetched = store.get_log_entry(first.id).unwrap().unwrap();
        assert_eq!(fetched, first);
        assert!(store.get_log_entry(9999).unwrap().is_none());
    }

    #[test]
    fn test_log_entry_without_food_or_quantity() {
        let store = LocalStore::in_memory();
        let entry = store
            .add_log_entry(&NewLogEntry {
                food: None,
                quantity: None,
                ..sample_entry(10)
            })
            .unwrap();
        let fetched = store.get_log_entry(entry.id).unwrap().unwrap();
        assert!(fetched.food.is_none());
        assert!(fetched.quantity.is_none());
    }

    #[test]
    fn test_query_log_range_lower_bound_exclusive() {
        let store = LocalStore::in_memory();
        let t = 1_700_000_000_000;
        store.add_log_entry(&sample_entry(t)).unwrap();
        let later = store.add_log_entry(&sample_entry(t + 1)).unwrap();

        let entries = store.query_log_range(t, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, later.id);
    }

    #[test]
    fn test_query_log_range_upper_bound_inclusive() {
        let store = LocalStore::in_memory();
        for t in [10, 20, 30, 40] {
            store.add_log_entry(&sample_entry(t)).unwrap();
        }

        let stamps: Vec<i64> = store
            .query_log_range(10, Some(30))
            .unwrap()
            .iter()
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(stamps, vec![20, 30]);
    }

    #[test]
    fn test_query_log_range_sorted_by_timestamp() {
        let store = LocalStore::in_memory();
        for t in [30, 10, 20] {
            store.add_log_entry(&sample_entry(t)).unwrap();
        }

        let stamps: Vec<i64> = store
            .query_log_range(0, None)
            .unwrap()
            .iter()
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(stamps, vec![10, 20, 30]);
    }

    #[test]
    fn test_log_entries_for_date() {
        let store = LocalStore::in_memory();
        store.add_log_entry(&sample_entry(1)).unwrap();
        store
            .add_log_entry(&NewLogEntry {
                local_date: day(2025, 1, 16),
                ..sample_entry(2)
            })
            .unwrap();

        let entries = store.log_entries_for_date(day(2025, 1, 15)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].timestamp, 1);
        assert!(store.log_entries_for_date(day(2024, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_put_weight_upserts_by_date() {
        let store = LocalStore::in_memory();
        let date = day(2025, 1, 15);
        store
            .put_weight(&WeightEntry {
                local_date: date,
                weight: 80.5,
            })
            .unwrap();
        store
            .put_weight(&WeightEntry {
                local_date: date,
                weight: 79.8,
            })
            .unwrap();

        let history = store.weight_history(None).unwrap();
        assert_eq!(history.len(), 1);
        assert!((history[0].weight - 79.8).abs() < f64::EPSILON);
        assert_eq!(store.get_weight(date).unwrap().unwrap().weight, 79.8);
    }

    #[test]
    fn test_latest_weight_and_history_order() {
        let store = LocalStore::in_memory();
        for (d, w) in [(10, 81.0), (12, 80.0), (11, 80.5)] {
            store
                .put_weight(&WeightEntry {
                    local_date: day(2025, 1, d),
                    weight: w,
                })
                .unwrap();
        }

        let latest = store.latest_weight().unwrap().unwrap();
        assert_eq!(latest.local_date, day(2025, 1, 12));

        let history = store.weight_history(None).unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|e| e.local_date).collect();
        assert_eq!(dates, vec![day(2025, 1, 12), day(2025, 1, 11), day(2025, 1, 10)]);

        assert_eq!(store.weight_history(Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_settings_set_get_delete() {
        let store = LocalStore::in_memory();
        store.set_setting("height", &175.5).unwrap();
        store.set_setting("gender", "female").unwrap();
        store.set_setting("dob", &day(1990, 5, 1)).unwrap();

        assert_eq!(store.get_setting::<f64>("height").unwrap(), Some(175.5));
        assert_eq!(
            store.get_setting::<String>("gender").unwrap().as_deref(),
            Some("female")
        );
        assert_eq!(
            store.get_setting::<NaiveDate>("dob").unwrap(),
            Some(day(1990, 5, 1))
        );
        assert_eq!(
            store.get_setting_value("dob").unwrap(),
            Some(serde_json::json!("1990-05-01"))
        );

        assert!(store.delete_setting("height").unwrap());
        assert!(store.get_setting::<f64>("height").unwrap().is_none());
        assert!(!store.delete_setting("height").unwrap());
    }

    #[test]
    fn test_setting_upsert_overwrites() {
        let store = LocalStore::in_memory();
        store.set_setting("height", &170.0).unwrap();
        store.set_setting("height", &171.0).unwrap();
        assert_eq!(store.get_setting::<f64>("height").unwrap(), Some(171.0));
        assert_eq!(store.all_settings().unwrap().len(), 1);
    }

    #[test]
    fn test_setting_wrong_type_is_error() {
        let store = LocalStore::in_memory();
        store.set_setting("height", "tall").unwrap();
        assert!(store.get_setting::<f64>("height").is_err());
    }

    #[test]
    fn test_count_per_collection() {
        let store = LocalStore::in_memory();
        store.add_log_entry(&sample_entry(1)).unwrap();
        store.add_log_entry(&sample_entry(2)).unwrap();
        store.set_setting("height", &170.0).unwrap();

        assert_eq!(store.count(Collection::Log).unwrap(), 2);
        assert_eq!(store.count(Collection::WeightLog).unwrap(), 0);
        assert_eq!(store.count(Collection::Settings).unwrap(), 1);
    }

    #[test]
    fn test_write_count_tracks_durable_writes() {
        let store = LocalStore::in_memory();
        assert_eq!(store.write_count(), 0);
        store.add_log_entry(&sample_entry(1)).unwrap();
        store.set_setting("height", &170.0).unwrap();
        store.latest_weight().unwrap();
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let store = LocalStore::in_memory();
        store.add_log_entry(&sample_entry(10)).unwrap();
        store.add_log_entry(&sample_entry(20)).unwrap();
        store
            .put_weight(&WeightEntry {
                local_date: day(2025, 1, 15),
                weight: 70.0,
            })
            .unwrap();
        store.set_setting("gender", "male").unwrap();

        let exported = store.export_all().unwrap();
        assert_eq!(exported.version, SCHEMA_VERSION);
        assert_eq!(exported.log.len(), 2);

        let json = serde_json::to_string(&exported).unwrap();
        let parsed: ExportData = serde_json::from_str(&json).unwrap();

        let fresh = LocalStore::in_memory();
        let summary = fresh.import_all(&parsed).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                log_entries_imported: 2,
                weight_entries_imported: 1,
                settings_imported: 1,
            }
        );
        assert_eq!(fresh.all_log_entries().unwrap(), exported.log);
        assert_eq!(fresh.weight_history(None).unwrap(), exported.weight_log);
        assert_eq!(
            fresh.get_setting::<String>("gender").unwrap().as_deref(),
            Some("male")
        );

        // Ids keep increasing after an import with explicit ids.
        let next = fresh.add_log_entry(&sample_entry(30)).unwrap();
        assert!(next.id > exported.log.iter().map(|e| e.id).max().unwrap());
    }

    #[test]
    fn test_import_checks_profile_settings() {
        let store = LocalStore::in_memory();
        store.set_setting("height", &180.0).unwrap();
        let snapshot = |settings: Vec<ExportSetting>| ExportData {
            version: SCHEMA_VERSION,
            exported_at: "2025-01-01T00:00:00Z".to_string(),
            log: vec![sample_entry(5).with_id(1)],
            weight_log: vec![],
            settings,
        };

        let bad = snapshot(vec![ExportSetting {
            name: "height".to_string(),
            value: serde_json::json!("tall"),
        }]);
        assert!(store.import_all(&bad).is_err());
        assert_eq!(store.get_setting::<f64>("height").unwrap(), Some(180.0));
        assert_eq!(store.count(Collection::Log).unwrap(), 0);

        let good = snapshot(vec![
            ExportSetting {
                name: "gender".to_string(),
                value: serde_json::json!("  Female "),
            },
            ExportSetting {
                name: "theme".to_string(),
                value: serde_json::json!({"dark": true}),
            },
        ]);
        store.import_all(&good).unwrap();
        assert_eq!(
            store.get_setting::<String>("gender").unwrap().as_deref(),
            Some("female")
        );
        assert_eq!(
            store.get_setting_value("theme").unwrap(),
            Some(serde_json::json!({"dark": true}))
        );
    }

    #[test]
    fn test_import_rejects_newer_version() {
        let store = LocalStore::in_memory();
        let data = ExportData {
            version: SCHEMA_VERSION + 1,
            exported_at: "2030-01-01T00:00:00Z".to_string(),
            log: vec![],
            weight_log: vec![],
            settings: vec![],
        };
        assert!(store.import_all(&data).is_err());
    }
}
