use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::server::AppState;
use crate::api::views::View;
use crate::auth::{CurrentUser, Viewer};
use crate::db::{
    models::{Comment, SongSummary},
    songs,
};
use crate::error::{AppError, Result};

const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct SongQuery {
    pub q: Option<String>,
    pub album: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SongListEntry {
    #[serde(flatten)]
    pub song: SongSummary,
    pub in_wishlist: bool,
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub text: String,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Query(query): Query<SongQuery>,
) -> Result<View> {
    let found = songs::search_songs(&state.db, query.q.as_deref(), query.album.as_deref()).await?;

    let members: HashSet<String> = match viewer.user() {
        Some(user) => state.wishlist.list_members(&user.id).await?.into_iter().collect(),
        None => HashSet::new(),
    };

    let entries: Vec<SongListEntry> = found
        .into_iter()
        .map(|song| SongListEntry {
            in_wishlist: members.contains(&song.id),
            song,
        })
        .collect();

    Ok(View::new(
        "songs",
        json!({
            "user": viewer.user(),
            "query": query.q,
            "album": query.album,
            "songs": entries,
        }),
    ))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<View> {
    let song = songs::get_song(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::SongNotFound(id.clone()))?;
    let comments = songs::comments_for_song(&state.db, &id).await?;

    let in_wishlist = match viewer.user() {
        Some(user) => state.wishlist.is_member(&user.id, &id).await?,
        None => false,
    };

    Ok(View::new(
        "song",
        json!({
            "user": viewer.user(),
            "song": song,
            "comments": comments,
            "in_wishlist": in_wishlist,
        }),
    ))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    Form(payload): Form<CommentPayload>,
) -> Result<Redirect> {
    let text = payload.text.trim();
    let length = text.chars().count();
    if length == 0 || length > MAX_COMMENT_CHARS {
        return Err(AppError::invalid(
            "text",
            format!("Comments must be between 1 and {MAX_COMMENT_CHARS} characters."),
        ));
    }

    if !songs::song_exists(&state.db, &id).await? {
        return Err(AppError::SongNotFound(id));
    }

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        song_id: id.clone(),
        username: current.user().username.clone(),
        text: text.to_string(),
        created_at: Utc::now(),
    };
    songs::insert_comment(&state.db, &comment).await?;
    tracing::debug!(song_id = %id, user_id = %current.user().id, "comment posted");

    Ok(Redirect::to(&format!("/songs/{id}")))
}
