//! Per-identity "on my mind" song sets.
//!
//! The `wishlist` table's `(user_id, song_id)` primary key makes the set
//! semantics a property of the store: `INSERT OR IGNORE` is the atomic
//! set-add and `DELETE` the set-remove, so concurrent calls for the same pair
//! can never produce duplicates or a half-applied mutation. Song ids are
//! opaque here and never looked up.

use sqlx::SqlitePool;

use crate::db::models::SongSummary;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct WishlistManager {
    pool: SqlitePool,
}

impl WishlistManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Adds `song_id` to the user's wishlist. Returns true if the set changed,
    /// false if the song was already there.
    ///
    /// A single autocommit statement, so concurrent writers queue on SQLite's
    /// write lock instead of failing a read-to-write lock upgrade.
    pub async fn add(&self, user_id: &str, song_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO wishlist (user_id, song_id, added_at)
            SELECT ?1, ?2, ?3
            WHERE EXISTS (SELECT 1 FROM users WHERE id = ?1)
            "#,
        )
        .bind(user_id)
        .bind(song_id)
        .bind(chrono::Utc::now().timestamp_micros())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.ensure_identity(user_id).await?;
        Ok(false)
    }

    /// Removes `song_id` from the user's wishlist. Removing a song that is not
    /// there is a no-op; returns whether the set changed.
    pub async fn remove(&self, user_id: &str, song_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = ? AND song_id = ?")
            .bind(user_id)
            .bind(song_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.ensure_identity(user_id).await?;
        Ok(false)
    }

    pub async fn is_member(&self, user_id: &str, song_id: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM wishlist WHERE user_id = ? AND song_id = ?")
                .bind(user_id)
                .bind(song_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Song ids in insertion order.
    pub async fn list_members(&self, user_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT song_id FROM wishlist WHERE user_id = ? ORDER BY added_at, rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Wishlisted songs that resolve to a discography entry, in insertion
    /// order. References to songs no longer in the discography are skipped.
    pub async fn list_songs(&self, user_id: &str) -> Result<Vec<SongSummary>> {
        let songs = sqlx::query_as::<_, SongSummary>(
            r#"
            SELECT s.id AS id, s.track_name AS track_name, s.album_name AS album_name,
                   s.track_number AS track_number, s.duration AS duration
            FROM wishlist w
            JOIN songs s ON s.id = w.song_id
            WHERE w.user_id = ?
            ORDER BY w.added_at, w.rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(songs)
    }

    async fn ensure_identity(&self, user_id: &str) -> Result<()> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(_) => Ok(()),
            None => Err(AppError::IdentityNotFound(user_id.to_string())),
        }
    }
}
