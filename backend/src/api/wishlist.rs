use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::api::server::AppState;
use crate::api::views::View;
use crate::auth::CurrentUser;
use crate::error::{AppError, Result};

/// Body sent by the heart toggle.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistPayload {
    pub song_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistResponse {
    pub song_id: String,
    pub in_wishlist: bool,
}

fn song_id(payload: WishlistPayload) -> Result<String> {
    let id = payload.song_id.trim();
    if id.is_empty() {
        return Err(AppError::invalid("songId", "A song id is required."));
    }
    Ok(id.to_string())
}

pub async fn add(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(payload): Json<WishlistPayload>,
) -> Result<Json<WishlistResponse>> {
    let song_id = song_id(payload)?;
    let user = current.user();

    if state.wishlist.add(&user.id, &song_id).await? {
        tracing::debug!(user_id = %user.id, %song_id, "added to wishlist");
    }

    Ok(Json(WishlistResponse {
        song_id,
        in_wishlist: true,
    }))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(payload): Json<WishlistPayload>,
) -> Result<Json<WishlistResponse>> {
    let song_id = song_id(payload)?;
    let user = current.user();

    if state.wishlist.remove(&user.id, &song_id).await? {
        tracing::debug!(user_id = %user.id, %song_id, "removed from wishlist");
    }

    Ok(Json(WishlistResponse {
        song_id,
        in_wishlist: false,
    }))
}

pub async fn on_my_mind(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<View> {
    let user = current.user();
    let song_ids = state.wishlist.list_members(&user.id).await?;
    let songs = state.wishlist.list_songs(&user.id).await?;

    Ok(View::new(
        "on-my-mind",
        json!({
            "user": user,
            "songIds": song_ids,
            "songs": songs,
        }),
    ))
}
