//! Database initialization
//!
//! Opens (or creates) the record store and makes sure the `users`, `recipes`
//! and `recipe_likes` tables exist. Safe to run on every startup.

use crate::config::DatabaseLocation;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open the database and create tables if needed
pub async fn init_database(location: &DatabaseLocation) -> Result<SqlitePool> {
    let pool = match location {
        DatabaseLocation::Memory => {
            // Every connection to :memory: is its own database, so the pool
            // must hold exactly one connection for its whole lifetime.
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?;
            info!("Initialized in-memory database");
            pool
        }
        DatabaseLocation::File(path) => {
            let newly_created = !path.exists();

            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(BUSY_TIMEOUT);

            let pool = SqlitePoolOptions::new()
                .max_connections(10)
                .connect_with(options)
                .await?;

            if newly_created {
                info!("Initialized new database: {}", path.display());
            } else {
                info!("Opened existing database: {}", path.display());
            }
            pool
        }
    };

    create_users_table(&pool).await?;
    create_recipes_table(&pool).await?;
    create_recipe_likes_table(&pool).await?;

    Ok(pool)
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recipes_table(pool: &SqlitePool) -> Result<()> {
    // ingredients and tags are JSON arrays of strings
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL CHECK (length(trim(title)) > 0),
            author_id TEXT NOT NULL REFERENCES users(id),
            ingredients TEXT NOT NULL DEFAULT '[]',
            instructions TEXT,
            image_url TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recipes_author ON recipes(author_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recipes_created_at ON recipes(created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recipes_updated_at ON recipes(updated_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_recipe_likes_table(pool: &SqlitePool) -> Result<()> {
    // The composite key is what keeps `likes` duplicate-free
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipe_likes (
            recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id),
            liked_at INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recipe_likes_user ON recipe_likes(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
