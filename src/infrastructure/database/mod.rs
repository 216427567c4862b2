//! Database Module
//!
//! PostgreSQL connection pool and schema bootstrap.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseSettings;
use crate::shared::ChatError;

/// Attempts made against the database during boot before giving up.
const CONNECT_ATTEMPTS: u32 = 10;

/// Pause between boot attempts.
const CONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// Create a PostgreSQL connection pool, retrying a bounded number of times.
///
/// The retry exists only for startup ordering (the database container may
/// still be coming up); nothing retries after boot.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let url = settings.connection_url();
    let mut attempt = 1;
    loop {
        let options = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout));
        match options.connect(&url).await {
            Ok(pool) => return Ok(pool),
            Err(err) if attempt < CONNECT_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "database not ready, retrying");
                tokio::time::sleep(CONNECT_BACKOFF).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Idempotently create the schema and its indexes.
pub async fn create_tables(pool: &PgPool) -> Result<(), ChatError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS rooms (
            id UUID PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL,
            display_name TEXT NOT NULL,
            description TEXT,
            logo_id UUID,
            admin_invite_only BOOLEAN NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            room_id UUID NOT NULL REFERENCES rooms(id),
            created_at TIMESTAMPTZ NOT NULL,
            token UUID NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            description TEXT,
            avatar_id UUID,
            role TEXT NOT NULL CHECK (role IN ('admin', 'participant'))
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            id UUID PRIMARY KEY,
            room_id UUID NOT NULL REFERENCES rooms(id),
            created_at TIMESTAMPTZ NOT NULL,
            display_name TEXT NOT NULL,
            description TEXT,
            is_private BOOLEAN NOT NULL,
            created_by UUID NOT NULL REFERENCES users(id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS private_channel_members (
            channel_id UUID NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
            user_id UUID NOT NULL REFERENCES users(id),
            PRIMARY KEY (channel_id, user_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            id UUID PRIMARY KEY,
            type TEXT NOT NULL CHECK (type IN ('image', 'video', 'file')),
            user_id UUID NOT NULL REFERENCES users(id),
            file_name TEXT NOT NULL,
            path TEXT NOT NULL,
            width INTEGER,
            height INTEGER,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id BIGSERIAL PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL,
            content JSONB NOT NULL,
            channel_id UUID REFERENCES channels(id),
            direct_message_user_id UUID REFERENCES users(id),
            edited BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_users_token ON users (token)",
        "CREATE INDEX IF NOT EXISTS idx_messages_channel_id ON messages (channel_id)",
        "CREATE INDEX IF NOT EXISTS idx_messages_user_id ON messages (user_id)",
        "CREATE INDEX IF NOT EXISTS idx_messages_direct_message_user_id \
         ON messages (direct_message_user_id)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await.map_err(|err| {
            tracing::error!(error = %err, "schema bootstrap failed");
            ChatError::CouldNotCreateTables
        })?;
    }

    Ok(())
}
