//! Database initialization
//!
//! Opens the SQLite pool, creates missing tables, seeds setting defaults,
//! and generates the stable per-device user id on first run.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Open (creating if missing) the engine database
pub async fn open_pool(db_path: &Path) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// Create tables if they do not exist
pub async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS viewed_artworks (
            artwork_id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            viewed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize settings table with default values
pub async fn init_settings_defaults(pool: &Pool<Sqlite>) -> Result<()> {
    let defaults = [
        ("has_viewed_onboarding", "false"),
        ("has_viewed_congrats", "false"),
    ];

    for (key, default_value) in defaults {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
                .bind(key)
                .fetch_one(pool)
                .await?;

        if !exists {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;
            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
    }

    Ok(())
}

/// Get the stable user id, generating it on first run
pub async fn ensure_user_id(pool: &Pool<Sqlite>) -> Result<Uuid> {
    match crate::db::settings::get_setting::<Uuid>(pool, "user_id").await? {
        Some(id) => Ok(id),
        None => {
            let id = Uuid::new_v4();
            crate::db::settings::set_setting(pool, "user_id", id).await?;
            info!("Generated user id {}", id);
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_defaults_seeded_once() {
        let pool = memory_pool().await;

        init_settings_defaults(&pool).await.unwrap();
        let onboarding = crate::db::settings::get_setting::<bool>(&pool, "has_viewed_onboarding")
            .await
            .unwrap();
        assert_eq!(onboarding, Some(false));

        // Re-running does not clobber an updated value
        crate::db::settings::set_setting(&pool, "has_viewed_onboarding", true)
            .await
            .unwrap();
        init_settings_defaults(&pool).await.unwrap();
        let onboarding = crate::db::settings::get_setting::<bool>(&pool, "has_viewed_onboarding")
            .await
            .unwrap();
        assert_eq!(onboarding, Some(true));
    }

    #[tokio::test]
    async fn test_user_id_stable_across_calls() {
        let pool = memory_pool().await;

        let first = ensure_user_id(&pool).await.unwrap();
        let second = ensure_user_id(&pool).await.unwrap();
        assert_eq!(first, second);
    }
}
