use sqlx::SqlitePool;
use std::path::Path;

use crate::db::models::{Comment, Song, SongSummary};

pub async fn create_song_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            album_name TEXT,
            ep TEXT,
            album_release TEXT,
            track_number INTEGER,
            track_name TEXT,
            artist TEXT,
            featuring TEXT,
            bonus_track TEXT,
            promotional_release TEXT,
            single_release TEXT,
            track_release TEXT,
            duration TEXT,
            lyric TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            song_id TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            username TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts the song unless one with the same id already exists.
/// Returns true if a row was written.
pub async fn insert_song(pool: &SqlitePool, song: &Song) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO songs (
            id, album_name, ep, album_release, track_number, track_name, artist,
            featuring, bonus_track, promotional_release, single_release,
            track_release, duration, lyric
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&song.id)
    .bind(&song.album_name)
    .bind(&song.ep)
    .bind(&song.album_release)
    .bind(song.track_number)
    .bind(&song.track_name)
    .bind(&song.artist)
    .bind(&song.featuring)
    .bind(&song.bonus_track)
    .bind(&song.promotional_release)
    .bind(&song.single_release)
    .bind(&song.track_release)
    .bind(&song.duration)
    .bind(&song.lyric)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Loads a JSON array of songs into the discography. Songs without an id get
/// a fresh one; songs whose id already exists are left alone.
pub async fn seed_from_file(pool: &SqlitePool, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read(path).await?;
    let songs: Vec<Song> = serde_json::from_slice(&raw)?;
    seed(pool, songs).await.map_err(Into::into)
}

pub async fn seed(pool: &SqlitePool, songs: Vec<Song>) -> Result<usize, sqlx::Error> {
    let mut inserted = 0;
    for mut song in songs {
        if song.id.is_empty() {
            song.id = uuid::Uuid::new_v4().to_string();
        }
        if insert_song(pool, &song).await? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

pub async fn get_song(pool: &SqlitePool, id: &str) -> Result<Option<Song>, sqlx::Error> {
    sqlx::query_as::<_, Song>("SELECT * FROM songs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn song_exists(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM songs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

/// Lists songs by album, then track number.
///
/// `query` matches case-insensitively anywhere in the track name, album name
/// or lyric. `album` is an exact album name filter.
pub async fn search_songs(
    pool: &SqlitePool,
    query: Option<&str>,
    album: Option<&str>,
) -> Result<Vec<SongSummary>, sqlx::Error> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(&q.to_lowercase())));

    sqlx::query_as::<_, SongSummary>(
        r#"
        SELECT id, track_name, album_name, track_number, duration
        FROM songs
        WHERE (?1 IS NULL
               OR lower(coalesce(track_name, '')) LIKE ?1 ESCAPE '\'
               OR lower(coalesce(album_name, '')) LIKE ?1 ESCAPE '\'
               OR lower(coalesce(lyric, '')) LIKE ?1 ESCAPE '\')
          AND (?2 IS NULL OR album_name = ?2)
        ORDER BY album_name, track_number, track_name
        "#,
    )
    .bind(pattern)
    .bind(album)
    .fetch_all(pool)
    .await
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub async fn insert_comment(pool: &SqlitePool, comment: &Comment) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO comments (id, song_id, username, text, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&comment.id)
    .bind(&comment.song_id)
    .bind(&comment.username)
    .bind(&comment.text)
    .bind(comment.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Oldest first.
pub async fn comments_for_song(pool: &SqlitePool, song_id: &str) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        "SELECT * FROM comments WHERE song_id = ? ORDER BY created_at, rowid",
    )
    .bind(song_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn song(id: &str, album: &str, track: i64, name: &str, lyric: &str) -> Song {
        Song {
            id: id.to_string(),
            album_name: Some(album.to_string()),
            track_number: Some(track),
            track_name: Some(name.to_string()),
            lyric: Some(lyric.to_string()),
            ..Default::default()
        }
    }

    async fn seeded() -> SqlitePool {
        let pool = test_pool().await;
        for s in [
            song("s2", "Lover", 2, "Cruel Summer", "Fever dream high in the quiet of the night"),
            song("s1", "Lover", 1, "I Forgot That You Existed", "How many days did I spend"),
            song("s3", "Folklore", 1, "the 1", "I'm doing good, I'm on some new shit"),
        ] {
            insert_song(&pool, &s).await.unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_insert_song_is_idempotent() {
        let pool = seeded().await;
        assert!(!insert_song(&pool, &song("s1", "x", 9, "x", "x")).await.unwrap());
        let stored = get_song(&pool, "s1").await.unwrap().unwrap();
        assert_eq!(stored.album_name.as_deref(), Some("Lover"));
    }

    #[tokio::test]
    async fn test_seed_assigns_missing_ids() {
        let pool = test_pool().await;
        let songs: Vec<Song> = serde_json::from_str(
            r#"[
                {"track_name": "Enchanted", "album_name": "Speak Now", "track_number": 9},
                {"id": "fixed", "track_name": "Mine", "album_name": "Speak Now", "track_number": 1}
            ]"#,
        )
        .unwrap();

        assert_eq!(seed(&pool, songs.clone()).await.unwrap(), 2);
        assert_eq!(search_songs(&pool, None, None).await.unwrap().len(), 2);
        assert!(song_exists(&pool, "fixed").await.unwrap());

        // re-seeding only re-inserts the songs that had no stable id
        assert_eq!(seed(&pool, songs).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_orders_by_album_then_track() {
        let pool = seeded().await;
        let all = search_songs(&pool, None, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s3", "s1", "s2"]);
    }

    #[tokio::test]
    async fn test_search_matches_name_album_and_lyric() {
        let pool = seeded().await;

        let by_name = search_songs(&pool, Some("cruel"), None).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "s2");

        let by_lyric = search_songs(&pool, Some("QUIET OF THE NIGHT"), None).await.unwrap();
        assert_eq!(by_lyric[0].id, "s2");

        let by_album = search_songs(&pool, Some("folk"), None).await.unwrap();
        assert_eq!(by_album.len(), 1);

        let filtered = search_songs(&pool, None, Some("Lover")).await.unwrap();
        assert_eq!(filtered.len(), 2);

        assert!(search_songs(&pool, Some("100%"), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_are_listed_oldest_first() {
        let pool = seeded().await;
        let start = chrono::Utc::now();
        for (i, text) in ["first", "second"].into_iter().enumerate() {
            insert_comment(
                &pool,
                &Comment {
                    id: format!("c{i}"),
                    song_id: "s1".to_string(),
                    username: "ava1".to_string(),
                    text: text.to_string(),
                    created_at: start + chrono::Duration::seconds(i as i64),
                },
            )
            .await
            .unwrap();
        }

        let comments = comments_for_song(&pool, "s1").await.unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert!(comments_for_song(&pool, "s2").await.unwrap().is_empty());
    }
}
