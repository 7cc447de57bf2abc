//! Settings database access
//!
//! Read/write settings from the settings table (key-value store). All
//! settings are device-global.

use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Has the user completed the onboarding carousel?
pub async fn get_has_viewed_onboarding(db: &Pool<Sqlite>) -> Result<bool> {
    Ok(get_setting::<bool>(db, "has_viewed_onboarding")
        .await?
        .unwrap_or(false))
}

pub async fn set_has_viewed_onboarding(db: &Pool<Sqlite>, viewed: bool) -> Result<()> {
    set_setting(db, "has_viewed_onboarding", viewed).await
}

/// Has the congratulations flow been shown?
pub async fn get_has_viewed_congrats(db: &Pool<Sqlite>) -> Result<bool> {
    Ok(get_setting::<bool>(db, "has_viewed_congrats")
        .await?
        .unwrap_or(false))
}

pub async fn set_has_viewed_congrats(db: &Pool<Sqlite>, viewed: bool) -> Result<()> {
    set_setting(db, "has_viewed_congrats", viewed).await
}

/// Generic setting getter
///
/// Returns None if the setting doesn't exist. Parse failures are an error,
/// not a silent default.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}
