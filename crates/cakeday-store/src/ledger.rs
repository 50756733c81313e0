use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use tracing::debug;

use crate::capability::DeliveryLedger;
use crate::db::{blocking, Database};
use crate::error::Result;

/// SQLite-backed [`DeliveryLedger`] over the `notification_log` table.
#[derive(Clone)]
pub struct SqliteDeliveryLedger {
    db: Database,
}

impl SqliteDeliveryLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn notified_users(&self, employee_id: i64, occurrence_year: i32) -> Result<HashSet<i64>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT user_id FROM notification_log
             WHERE employee_id = ?1 AND occurrence_year = ?2",
        )?;
        let ids = stmt
            .query_map(params![employee_id, occurrence_year], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
        Ok(ids)
    }

    pub fn record_delivery(
        &self,
        employee_id: i64,
        occurrence_year: i32,
        user_ids: &[i64],
    ) -> Result<()> {
        let mut conn = self.db.lock()?;
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        {
            // OR IGNORE: re-recording an existing triple keeps the first timestamp.
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO notification_log
                 (employee_id, user_id, occurrence_year, notified_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for user_id in user_ids {
                stmt.execute(params![employee_id, user_id, occurrence_year, now])?;
            }
        }
        tx.commit()?;
        debug!(employee_id, occurrence_year, count = user_ids.len(), "deliveries recorded");
        Ok(())
    }
}

#[async_trait]
impl DeliveryLedger for SqliteDeliveryLedger {
    async fn notified(&self, employee_id: i64, occurrence_year: i32) -> Result<HashSet<i64>> {
        let ledger = self.clone();
        blocking(move || ledger.notified_users(employee_id, occurrence_year)).await
    }

    async fn record(&self, employee_id: i64, occurrence_year: i32, user_ids: &[i64]) -> Result<()> {
        let ledger = self.clone();
        let user_ids = user_ids.to_vec();
        blocking(move || ledger.record_delivery(employee_id, occurrence_year, &user_ids)).await
    }
}
