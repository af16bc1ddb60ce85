use anyhow::Context;
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api::{auth, profile, songs, wishlist};
use crate::auth::{SessionStore, password::PasswordHasher};
use crate::config::Config;
use crate::db;
use crate::wishlist::WishlistManager;

pub struct AppState {
    pub db: SqlitePool,
    pub sessions: SessionStore,
    pub passwords: PasswordHasher,
    pub wishlist: WishlistManager,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &Config) -> crate::error::Result<Self> {
        let secret = match &config.session_secret {
            Some(secret) => secret.clone().into_bytes(),
            None => {
                tracing::warn!("SESSION_SECRET not set, sessions will not survive a restart");
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
                    .into_bytes()
            }
        };

        let sessions = SessionStore::new(
            db.clone(),
            &secret,
            chrono::Duration::hours(config.session_ttl_hours),
            config.secure_cookies,
        );

        Ok(Self {
            wishlist: WishlistManager::new(db.clone()),
            passwords: PasswordHasher::new()?,
            sessions,
            db,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(auth::home))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/add-to-wishlist", post(wishlist::add))
        .route("/remove-from-wishlist", post(wishlist::remove))
        .route("/on-my-mind", get(wishlist::on_my_mind))
        .route("/songs", get(songs::list))
        .route("/songs/{id}", get(songs::detail))
        .route("/songs/{id}/comments", post(songs::add_comment))
        .route("/profile", get(profile::show).post(profile::update))
        .route("/profile/password", post(profile::change_password))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    if let Some(path) = &config.songs_file {
        let inserted = db::songs::seed_from_file(&pool, path)
            .await
            .with_context(|| format!("failed to load songs from {}", path.display()))?;
        tracing::info!("loaded {inserted} songs from {}", path.display());
    }

    let state = Arc::new(AppState::new(pool, &config)?);
    let purged = state.sessions.purge_expired().await?;
    if purged > 0 {
        tracing::info!("purged {purged} expired sessions");
    }

    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!("server running on http://{addr}");

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
