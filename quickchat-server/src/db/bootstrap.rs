//! Database bootstrap.
//!
//! Applies the schema in staged order at startup. Every statement is
//! idempotent (`IF NOT EXISTS`), so re-running on an already-bootstrapped
//! database is harmless.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};

const STAGES: &[(&str, &[&str])] = &[
    (
        "schema",
        &[
            "CREATE TABLE IF NOT EXISTS users (\
                id UUID PRIMARY KEY,\
                display_name TEXT NOT NULL,\
                avatar_url TEXT,\
                bio TEXT\
            )",
            "CREATE TABLE IF NOT EXISTS messages (\
                id UUID PRIMARY KEY,\
                sender_id UUID NOT NULL,\
                receiver_id UUID NOT NULL,\
                text TEXT,\
                image_url TEXT,\
                seen BOOLEAN NOT NULL DEFAULT FALSE,\
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\
            )",
        ],
    ),
    (
        "indexes",
        &[
            // Serves the unseen-count aggregate and the bulk-seen update.
            "CREATE INDEX IF NOT EXISTS idx_messages_unseen \
             ON messages (receiver_id, sender_id) WHERE seen = FALSE",
            // Serves conversation history in either direction.
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation \
             ON messages (sender_id, receiver_id, created_at)",
        ],
    ),
];

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database error in bootstrap stage '{stage}': {source}")]
    Sql {
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Execute all bootstrap statements in stage order.
pub async fn run(pool: &PgPool) -> Result<(), BootstrapError> {
    for (stage, statements) in STAGES {
        info!(stage, count = statements.len(), "applying bootstrap stage");
        for statement in *statements {
            debug!(stage, statement, "executing bootstrap statement");
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|source| BootstrapError::Sql { stage, source })?;
        }
    }
    Ok(())
}

/// Simple liveness check used during startup.
pub async fn ensure_liveness(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Readiness probe: the messages table must exist.
pub async fn ensure_readiness(pool: &PgPool) -> Result<(), sqlx::Error> {
    let exists: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM information_schema.tables \
         WHERE table_name = 'messages' LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    exists.map(|_| ()).ok_or(sqlx::Error::RowNotFound)
}
