//! Activity Log Repository

use async_trait::async_trait;
use mockall::automock;
use sqlx::query;
use uuid::Uuid;

use crate::{
    database::{Db, StoreError},
    domain::activity::models::NewActivityEntry,
};

const CREATE_ACTIVITY_SQL: &str = include_str!("sql/create_activity.sql");

/// Append-only audit trail.
#[automock]
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, entry: NewActivityEntry) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgActivityLog {
    db: Db,
}

impl PgActivityLog {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityLog for PgActivityLog {
    async fn record(&self, entry: NewActivityEntry) -> Result<(), StoreError> {
        query(CREATE_ACTIVITY_SQL)
            .bind(Uuid::now_v7())
            .bind(entry.actor.map(Uuid::from))
            .bind(entry.action.as_str())
            .bind(entry.subject)
            .bind(entry.details)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}
