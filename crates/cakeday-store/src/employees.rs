use async_trait::async_trait;
use cakeday_core::{recurrence, Employee, NotificationWindow};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::capability::EventStore;
use crate::db::{blocking, date_column, Database, DATE_FORMAT};
use crate::error::{conflict_or_query, Result, StoreError};

const EMPLOYEE_SELECT_SQL: &str = "SELECT id, name, birthday FROM employees";

fn row_to_employee(row: &rusqlite::Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        birthday: date_column(row, 2)?,
    })
}

/// Employees and their birthdays.
#[derive(Clone)]
pub struct EmployeeRepository {
    db: Database,
}

impl EmployeeRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, name: &str, birthday: NaiveDate) -> Result<Employee> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO employees (name, birthday) VALUES (?1, ?2)",
            params![name, birthday.format(DATE_FORMAT).to_string()],
        )
        .map_err(|e| conflict_or_query(e, "employee"))?;
        let id = conn.last_insert_rowid();
        info!(employee_id = id, %name, "employee created");
        Ok(Employee {
            id,
            name: name.to_string(),
            birthday,
        })
    }

    /// Returns None instead of an error when absent so callers decide
    /// whether missing is exceptional in their context.
    pub fn get(&self, id: i64) -> Result<Option<Employee>> {
        let conn = self.db.lock()?;
        let employee = conn
            .query_row(
                &format!("{EMPLOYEE_SELECT_SQL} WHERE id = ?1"),
                [id],
                row_to_employee,
            )
            .optional()?;
        Ok(employee)
    }

    /// First employee with exactly this name, lowest id first.
    pub fn find_by_name(&self, name: &str) -> Result<Option<Employee>> {
        let conn = self.db.lock()?;
        let employee = conn
            .query_row(
                &format!("{EMPLOYEE_SELECT_SQL} WHERE name = ?1 ORDER BY id LIMIT 1"),
                [name],
                row_to_employee,
            )
            .optional()?;
        Ok(employee)
    }

    pub fn list(&self) -> Result<Vec<Employee>> {
        let conn = self.db.lock()?;
        list_all(&conn)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let n = conn.execute("DELETE FROM employees WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "employee",
                id,
            });
        }
        info!(employee_id = id, "employee deleted");
        Ok(())
    }

    /// Employees whose birthday recurs inside `window`, soonest first.
    ///
    /// Matching happens in Rust rather than SQL: the stored year must be
    /// ignored and the window may wrap past 31 December.
    pub fn upcoming(&self, window: NotificationWindow) -> Result<Vec<Employee>> {
        let all = {
            let conn = self.db.lock()?;
            list_all(&conn)?
        };
        let mut matched: Vec<(u32, Employee)> = all
            .into_iter()
            .filter(|e| window.contains(e.birthday))
            .map(|e| (recurrence::days_until(e.birthday, window.start), e))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        debug!(%window, matched = matched.len(), "upcoming birthdays computed");
        Ok(matched.into_iter().map(|(_, e)| e).collect())
    }
}

fn list_all(conn: &Connection) -> Result<Vec<Employee>> {
    let mut stmt = conn.prepare_cached(&format!("{EMPLOYEE_SELECT_SQL} ORDER BY id"))?;
    let employees = stmt
        .query_map([], row_to_employee)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(employees)
}

#[async_trait]
impl EventStore for EmployeeRepository {
    async fn upcoming_recurring(&self, window: NotificationWindow) -> Result<Vec<Employee>> {
        let repo = self.clone();
        blocking(move || repo.upcoming(window)).await
    }
}
