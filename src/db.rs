mod entity;
mod error;

pub use entity::{insert_if_absent, AttendanceRecord, Entity, Inserted, Student};
pub use error::StoreError;

use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{named_params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "attendance.sqlite3";
pub const DEFAULT_WORKING_DAYS: i64 = 22;
const SETTING_WORKING_DAYS: &str = "working_days";

/// Handle to one workspace database. Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct Store {
    pool: Pool,
    path: PathBuf,
}

impl Store {
    /// Open (creating if needed) the database inside `workspace` and run [`Store::init`].
    pub async fn open(workspace: &Path) -> Result<Store, StoreError> {
        tokio::fs::create_dir_all(workspace).await.map_err(|e| {
            StoreError::Unavailable(format!("{}: {}", workspace.to_string_lossy(), e))
        })?;
        let path = workspace.join(DB_FILE);
        let pool = Config::new(path.clone())
            .create_pool(Runtime::Tokio1)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = Store { pool, path };
        store.init().await?;
        tracing::info!(path = %store.path().to_string_lossy(), "store opened");
        Ok(store)
    }

    /// Create tables and indexes if they are missing. Safe to call repeatedly.
    pub async fn init(&self) -> Result<(), StoreError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.interact(|conn| ensure_schema(conn))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop handing out connections. Used before the database file is replaced.
    pub fn close(&self) {
        self.pool.close();
    }

    pub async fn get<E: Entity>(&self, key: E::Key) -> Result<Option<E>, StoreError> {
        self.interact(move |conn| Ok(E::select_by_key(&key, conn)?))
            .await
    }

    pub async fn get_all<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        self.interact(|conn| Ok(E::select_all(conn)?)).await
    }

    pub async fn put<E: Entity>(&self, entity: E) -> Result<E::Key, StoreError> {
        let key = self.interact(move |conn| Ok(entity.upsert(conn)?)).await?;
        tracing::debug!(collection = E::COLLECTION, "put");
        Ok(key)
    }

    pub async fn attendance_on(&self, date: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let date = date.to_string();
        self.interact(move |conn| Ok(AttendanceRecord::select_by_date(&date, conn)?))
            .await
    }

    pub async fn attendance_for(&self, roll: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let roll = roll.to_string();
        self.interact(move |conn| Ok(AttendanceRecord::select_by_roll(&roll, conn)?))
            .await
    }

    /// Configured working days; falls back to [`DEFAULT_WORKING_DAYS`] when the
    /// setting is missing or not an integer.
    pub async fn working_days(&self) -> Result<i64, StoreError> {
        self.interact(|conn| {
            let raw = setting_get(conn, SETTING_WORKING_DAYS)?;
            Ok(raw
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(DEFAULT_WORKING_DAYS))
        })
        .await
    }

    pub async fn set_working_days(&self, days: i64) -> Result<(), StoreError> {
        self.interact(move |conn| Ok(setting_set(conn, SETTING_WORKING_DAYS, &days.to_string())?))
            .await
    }

    /// Run `f` inside one IMMEDIATE transaction. Dropping the transaction on an
    /// error rolls everything back.
    pub async fn write_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, StoreError> + Send + 'static,
    {
        self.interact(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
        .await
    }

    async fn interact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.pool.get().await?;
        conn.interact(f).await?
    }
}

fn ensure_schema(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            roll TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            class TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            roll TEXT NOT NULL,
            name TEXT NOT NULL,
            class TEXT NOT NULL,
            date TEXT NOT NULL,
            time TEXT NOT NULL
        )",
        [],
    )?;
    // One record per student per day is enforced here, not by callers.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_attendance_roll_date ON attendance(roll, date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn setting_get(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = :key",
        named_params! { ":key": key },
        |r| r.get(0),
    )
    .optional()
}

fn setting_set(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value)
         VALUES(:key, :value)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        named_params! { ":key": key, ":value": value },
    )?;
    Ok(())
}
