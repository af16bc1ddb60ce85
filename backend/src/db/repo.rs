use sqlx::SqlitePool;

use crate::db::models::{SessionRecord, User};

pub async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            bio TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_user(pool: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Fails with a unique violation when the username already exists.
pub async fn insert_user(pool: &SqlitePool, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, username, password_hash, bio, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(user.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns false when no such user exists.
pub async fn update_profile(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    bio: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET name = ?, bio = ? WHERE id = ?")
        .bind(name)
        .bind(bio)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns false when no such user exists.
pub async fn update_password_hash(
    pool: &SqlitePool,
    id: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn insert_session(pool: &SqlitePool, session: &SessionRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_session(pool: &SqlitePool, id: &str) -> Result<Option<SessionRecord>, sqlx::Error> {
    sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_session(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_sessions_for_user(pool: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_expired_sessions(
    pool: &SqlitePool,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::Utc;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            name: "Ava".to_string(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            bio: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_user() {
        let pool = test_pool().await;
        insert_user(&pool, &user("u1", "ava1")).await.unwrap();

        let by_name = get_user(&pool, "ava1").await.unwrap().unwrap();
        assert_eq!(by_name.id, "u1");
        let by_id = get_user_by_id(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(by_id.username, "ava1");
        assert!(get_user(&pool, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let pool = test_pool().await;
        insert_user(&pool, &user("u1", "ava1")).await.unwrap();

        let err = insert_user(&pool, &user("u2", "ava1")).await.unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_profile_reports_missing_user() {
        let pool = test_pool().await;
        insert_user(&pool, &user("u1", "ava1")).await.unwrap();

        assert!(update_profile(&pool, "u1", "Ava L", "hi").await.unwrap());
        assert!(!update_profile(&pool, "ghost", "x", "").await.unwrap());

        let stored = get_user_by_id(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Ava L");
        assert_eq!(stored.bio, "hi");
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged() {
        let pool = test_pool().await;
        insert_user(&pool, &user("u1", "ava1")).await.unwrap();

        let now = Utc::now();
        for (id, offset) in [("old", -1), ("fresh", 1)] {
            insert_session(
                &pool,
                &SessionRecord {
                    id: id.to_string(),
                    user_id: "u1".to_string(),
                    created_at: now,
                    expires_at: now + chrono::Duration::hours(offset),
                },
            )
            .await
            .unwrap();
        }

        assert_eq!(delete_expired_sessions(&pool, now).await.unwrap(), 1);
        assert!(get_session(&pool, "old").await.unwrap().is_none());
        assert!(get_session(&pool, "fresh").await.unwrap().is_some());
    }
}
