use sqlx::SqlitePool;
use uuid::Uuid;

use crate::AppResult;

use super::Counterpart;

/// Read-only view of account profiles, used to put names on counterparts.
#[derive(Clone)]
pub struct Directory {
    db_pool: SqlitePool,
}

impl Directory {
    pub fn new(db_pool: SqlitePool) -> Self {
        Directory { db_pool }
    }

    /// `None` when the account no longer exists.
    pub async fn resolve(&self, user_id: Uuid) -> AppResult<Option<Counterpart>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT name,email FROM profiles WHERE user_id=?")
                .bind(user_id.to_string())
                .fetch_optional(&self.db_pool)
                .await?;

        Ok(row.map(|(name, email)| Counterpart { id: user_id, name, email }))
    }
}
