//! Viewed-artwork persistence
//!
//! The viewed set is append-only in normal operation and ordered by the
//! position it was appended at, so the collection screen can show artworks
//! in the order the user found them.

use crate::error::Result;
use sqlx::{Pool, Sqlite};

/// Load the ordered viewed set
pub async fn load_viewed(db: &Pool<Sqlite>) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT artwork_id FROM viewed_artworks ORDER BY position")
            .fetch_all(db)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Append an artwork to the viewed set if absent
pub async fn append_viewed(db: &Pool<Sqlite>, artwork_id: &str, position: usize) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO viewed_artworks (artwork_id, position)
        VALUES (?, ?)
        ON CONFLICT(artwork_id) DO NOTHING
        "#,
    )
    .bind(artwork_id)
    .bind(position as i64)
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_append_and_load_preserves_order() {
        let db = setup_test_db().await;

        append_viewed(&db, "murmuration", 0).await.unwrap();
        append_viewed(&db, "harbor-lights", 1).await.unwrap();
        append_viewed(&db, "xmas-tree", 2).await.unwrap();

        let viewed = load_viewed(&db).await.unwrap();
        assert_eq!(viewed, ["murmuration", "harbor-lights", "xmas-tree"]);
    }

    #[tokio::test]
    async fn test_duplicate_append_is_ignored() {
        let db = setup_test_db().await;

        append_viewed(&db, "xmas-tree", 0).await.unwrap();
        append_viewed(&db, "xmas-tree", 1).await.unwrap();

        let viewed = load_viewed(&db).await.unwrap();
        assert_eq!(viewed, ["xmas-tree"]);
    }
}
