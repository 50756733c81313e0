use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};

/// Storage format of `employees.birthday`.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shared handle to the one SQLite connection of the process.
///
/// Built once by the host and handed to every repository; cloning only bumps
/// the reference count. Operations hold the lock for a single statement or
/// transaction, never across an `.await`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!(path = %path.display(), "opened SQLite database");
        Self::from_connection(conn)
    }

    /// Private in-memory database; used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Run a synchronous repository call on tokio's blocking pool so the
/// scheduler task never parks a runtime worker on the connection lock.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Initialise all tables. Safe to call on every startup: CREATE IF NOT
/// EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    // ON DELETE CASCADE: removing a user or an employee drops their
    // subscriptions and delivery records with them.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            email       TEXT    NOT NULL UNIQUE,
            created_at  TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS employees (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT    NOT NULL,
            birthday    TEXT    NOT NULL    -- YYYY-MM-DD, year ignored for matching
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            employee_id INTEGER NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
            UNIQUE(user_id, employee_id)
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_employee
            ON subscriptions (employee_id);

        -- One row per subscriber already told about a given year's birthday.
        CREATE TABLE IF NOT EXISTS notification_log (
            employee_id     INTEGER NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            occurrence_year INTEGER NOT NULL,
            notified_at     TEXT    NOT NULL,
            PRIMARY KEY (employee_id, user_id, occurrence_year)
        );
        ",
    )?;
    Ok(())
}

/// Read a `YYYY-MM-DD` text column as a date.
pub(crate) fn date_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'employees', 'subscriptions', 'notification_log')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn handle_enables_foreign_keys() {
        let db = Database::open_in_memory().unwrap();
        let fk: i64 = db
            .lock()
            .unwrap()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
