use async_trait::async_trait;
use cakeday_core::{Subscriber, Subscription};
use rusqlite::params;
use tracing::info;

use crate::capability::SubscriptionResolver;
use crate::db::{blocking, Database};
use crate::error::{conflict_or_query, Result, StoreError};

/// Who follows whose birthday.
#[derive(Clone)]
pub struct SubscriptionRepository {
    db: Database,
}

impl SubscriptionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Subscribe `user_id` to `employee_id`. Both must exist and the pair must
    /// be new, otherwise the store reports a conflict.
    pub fn create(&self, user_id: i64, employee_id: i64) -> Result<Subscription> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO subscriptions (user_id, employee_id) VALUES (?1, ?2)",
            params![user_id, employee_id],
        )
        .map_err(|e| {
            conflict_or_query(
                e,
                &format!("subscription of user {user_id} to employee {employee_id}"),
            )
        })?;
        let id = conn.last_insert_rowid();
        info!(subscription_id = id, user_id, employee_id, "subscription created");
        Ok(Subscription {
            id,
            user_id,
            employee_id,
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let n = conn.execute("DELETE FROM subscriptions WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "subscription",
                id,
            });
        }
        info!(subscription_id = id, "subscription deleted");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Subscription>> {
        let conn = self.db.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, user_id, employee_id FROM subscriptions ORDER BY id")?;
        let subs = stmt
            .query_map([], |row| {
                Ok(Subscription {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    employee_id: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(subs)
    }

    /// Users subscribed to `employee_id`, ordered by user id.
    pub fn subscribers(&self, employee_id: i64) -> Result<Vec<Subscriber>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT u.id, u.email
             FROM users u
             JOIN subscriptions s ON u.id = s.user_id
             WHERE s.employee_id = ?1
             ORDER BY u.id",
        )?;
        let subscribers = stmt
            .query_map([employee_id], |row| {
                Ok(Subscriber {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(subscribers)
    }
}

#[async_trait]
impl SubscriptionResolver for SubscriptionRepository {
    async fn subscribers_of(&self, employee_id: i64) -> Result<Vec<Subscriber>> {
        let repo = self.clone();
        blocking(move || repo.subscribers(employee_id)).await
    }
}
