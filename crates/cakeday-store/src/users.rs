use cakeday_core::User;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::info;

use crate::db::Database;
use crate::error::{conflict_or_query, Result, StoreError};

const USER_SELECT_SQL: &str = "SELECT id, email, created_at FROM users";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Users that can subscribe to employees. Emails are unique.
#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, email: &str) -> Result<User> {
        let conn = self.db.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (email, created_at) VALUES (?1, ?2)",
            params![email, now],
        )
        .map_err(|e| conflict_or_query(e, &format!("user {email}")))?;
        let id = conn.last_insert_rowid();
        info!(user_id = id, %email, "user created");
        Ok(User {
            id,
            email: email.to_string(),
            created_at: now,
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.lock()?;
        let user = conn
            .query_row(&format!("{USER_SELECT_SQL} WHERE id = ?1"), [id], row_to_user)
            .optional()?;
        Ok(user)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.lock()?;
        let user = conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE email = ?1"),
                [email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list(&self) -> Result<Vec<User>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} ORDER BY id"))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Delete a user; their subscriptions go with them.
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound { entity: "user", id });
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_lookup() {
        let repo = UserRepository::new(Database::open_in_memory().unwrap());
        let user = repo.create("a@x.com").unwrap();
        assert_eq!(repo.get(user.id).unwrap().unwrap().email, "a@x.com");
        assert_eq!(repo.find_by_email("a@x.com").unwrap(), Some(user));
        assert_eq!(repo.find_by_email("b@x.com").unwrap(), None);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let repo = UserRepository::new(Database::open_in_memory().unwrap());
        repo.create("a@x.com").unwrap();
        let err = repo.create("a@x.com").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn delete_missing_user_is_not_found() {
        let repo = UserRepository::new(Database::open_in_memory().unwrap());
        assert!(matches!(
            repo.delete(42),
            Err(StoreError::NotFound { entity: "user", id: 42 })
        ));
    }
}
