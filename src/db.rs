use anyhow::Context;
use axum::{extract::State, http::StatusCode};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

// profiles belongs to the account system; messaging only reads it.
const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        user_id TEXT PRIMARY KEY,
        name    TEXT NOT NULL,
        email   TEXT NOT NULL,
        role    TEXT NOT NULL CHECK (role IN ('client', 'freelancer'))
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id          TEXT PRIMARY KEY,
        job_id      TEXT NOT NULL,
        sender_id   TEXT NOT NULL,
        receiver_id TEXT NOT NULL,
        body        TEXT NOT NULL CHECK (length(body) > 0),
        status      TEXT NOT NULL DEFAULT 'sent' CHECK (status IN ('sent', 'delivered', 'seen')),
        created_at  INTEGER NOT NULL,
        CHECK (sender_id <> receiver_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_messages_unseen ON messages(job_id, receiver_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id, created_at)",
];

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .with_context(|| format!("connect to sqlite via {database_url}"))
}

pub async fn migrate(db_pool: &SqlitePool) -> anyhow::Result<()> {
    for stmt in SCHEMA {
        sqlx::query(stmt)
            .execute(db_pool)
            .await
            .with_context(|| {
                let head = stmt.trim().lines().next().unwrap_or_default();
                format!("apply migration: {head}")
            })?;
    }
    Ok(())
}

pub async fn health(State(db_pool): State<SqlitePool>) -> StatusCode {
    match db_pool.acquire().await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "database unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
