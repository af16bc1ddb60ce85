//! Server-held sessions with signed tokens.
//!
//! A session is a row in `sessions`; the token handed to the client is an
//! HS256 JWT naming that row. A token only resolves while its signature,
//! its `exp`, the row and the user behind the row are all valid.

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{
    models::{SessionRecord, User},
    repo,
};
use crate::error::{AppError, Result};

pub const SESSION_COOKIE: &str = "stf_session";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sid: String,
    sub: String,
    iat: i64,
    exp: i64,
}

/// A request's resolved identity.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session_id: String,
}

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure_cookies: bool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool, secret: &[u8], ttl: Duration, secure_cookies: bool) -> Self {
        Self {
            pool,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            secure_cookies,
        }
    }

    /// Opens a session for `user` and returns its token.
    pub async fn serialize(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        repo::insert_session(&self.pool, &record).await?;

        let claims = Claims {
            sid: record.id,
            sub: record.user_id,
            iat: now.timestamp(),
            exp: record.expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Resolves a token. Every failure, including a store error, is `None`.
    pub async fn deserialize(&self, token: &str) -> Option<Authenticated> {
        let claims = match decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!("rejected session token: {e}");
                return None;
            }
        };

        match self.lookup(&claims).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("session lookup failed, treating request as anonymous: {e}");
                None
            }
        }
    }

    async fn lookup(&self, claims: &Claims) -> std::result::Result<Option<Authenticated>, sqlx::Error> {
        let Some(session) = repo::get_session(&self.pool, &claims.sid).await? else {
            return Ok(None);
        };
        if session.user_id != claims.sub {
            return Ok(None);
        }
        if session.expires_at <= Utc::now() {
            repo::delete_session(&self.pool, &session.id).await?;
            return Ok(None);
        }

        let user = repo::get_user_by_id(&self.pool, &session.user_id).await?;
        Ok(user.map(|user| Authenticated {
            user,
            session_id: session.id,
        }))
    }

    pub async fn destroy(&self, session_id: &str) -> Result<()> {
        repo::delete_session(&self.pool, session_id).await?;
        Ok(())
    }

    /// Ends every session of a user, e.g. after a password change.
    pub async fn destroy_all_for(&self, user_id: &str) -> Result<u64> {
        Ok(repo::delete_sessions_for_user(&self.pool, user_id).await?)
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        Ok(repo::delete_expired_sessions(&self.pool, Utc::now()).await?)
    }

    pub fn cookie(&self, token: &str) -> HeaderValue {
        self.cookie_header(token, self.ttl.num_seconds())
    }

    pub fn clear_cookie(&self) -> HeaderValue {
        self.cookie_header("", 0)
    }

    fn cookie_header(&self, value: &str, max_age: i64) -> HeaderValue {
        let secure = if self.secure_cookies { "; Secure" } else { "" };
        let cookie = format!(
            "{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}"
        );
        HeaderValue::from_str(&cookie).unwrap_or_else(|e| {
            tracing::warn!("session cookie is not a valid header value, sending it empty: {e}");
            HeaderValue::from_static("")
        })
    }
}

/// Pulls the session token from `Authorization: Bearer` or the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn setup(ttl: Duration) -> (SessionStore, User, SqlitePool) {
        let pool = test_pool().await;
        let user = User {
            id: "ava".to_string(),
            name: "Ava".to_string(),
            username: "ava1".to_string(),
            password_hash: "hash".to_string(),
            bio: String::new(),
            created_at: Utc::now(),
        };
        repo::insert_user(&pool, &user).await.unwrap();
        let store = SessionStore::new(pool.clone(), b"test-secret", ttl, false);
        (store, user, pool)
    }

    #[tokio::test]
    async fn test_serialize_then_deserialize() {
        let (store, user, _) = setup(Duration::hours(1)).await;

        let token = store.serialize(&user).await.unwrap();
        let resolved = store.deserialize(&token).await.unwrap();
        assert_eq!(resolved.user.id, "ava");
    }

    #[tokio::test]
    async fn test_destroyed_session_no_longer_resolves() {
        let (store, user, _) = setup(Duration::hours(1)).await;

        let token = store.serialize(&user).await.unwrap();
        let resolved = store.deserialize(&token).await.unwrap();
        store.destroy(&resolved.session_id).await.unwrap();

        assert!(store.deserialize(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_tampered_or_foreign_tokens_are_anonymous() {
        let (store, user, pool) = setup(Duration::hours(1)).await;
        let token = store.serialize(&user).await.unwrap();

        assert!(store.deserialize("garbage").await.is_none());
        assert!(store.deserialize(&format!("{token}x")).await.is_none());

        let other = SessionStore::new(pool, b"another-secret", Duration::hours(1), false);
        assert!(other.deserialize(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous() {
        let (store, user, _) = setup(Duration::seconds(-120)).await;
        let token = store.serialize(&user).await.unwrap();
        assert!(store.deserialize(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_row_is_anonymous_and_removed() {
        let (store, user, pool) = setup(Duration::hours(1)).await;
        let token = store.serialize(&user).await.unwrap();
        let session_id = store.deserialize(&token).await.unwrap().session_id;

        // token still carries a valid `exp`; only the server-held row has lapsed
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(Utc::now() - Duration::minutes(5))
            .bind(&session_id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(store.deserialize(&token).await.is_none());
        assert!(repo::get_session(&pool, &session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_of_deleted_user_is_anonymous() {
        let (store, user, pool) = setup(Duration::hours(1)).await;
        let token = store.serialize(&user).await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind("ava")
            .execute(&pool)
            .await
            .unwrap();

        assert!(store.deserialize(&token).await.is_none());
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(token_from_headers(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; stf_session=abc.def"));
        assert_eq!(token_from_headers(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers), Some("xyz"));
    }

    #[tokio::test]
    async fn test_cookie_attributes() {
        let store = SessionStore::new(
            test_pool().await,
            b"k",
            Duration::hours(2),
            true,
        );
        let cookie = store.cookie("tok");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("stf_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(cookie.ends_with("; Secure"));

        assert!(store.clear_cookie().to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_unencodable_cookie_is_sent_empty() {
        let store = SessionStore::new(test_pool().await, b"k", Duration::hours(1), false);
        assert!(store.cookie("bad\nvalue").is_empty());
    }
}
