use axum::{
    Form,
    extract::State,
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::server::AppState;
use crate::api::views::View;
use crate::auth::CurrentUser;
use crate::auth::credentials::{self, validate_name};
use crate::db::repo;
use crate::error::{AppError, FieldErrors, Result};

const MAX_BIO_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ProfilePayload {
    pub name: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Deserialize)]
pub struct PasswordPayload {
    pub current_password: String,
    pub new_password: String,
}

pub async fn show(State(state): State<Arc<AppState>>, current: CurrentUser) -> Result<View> {
    let user = current.user();
    let wishlist = state.wishlist.list_members(&user.id).await?;

    Ok(View::new(
        "profile",
        json!({ "user": user, "wishlist_count": wishlist.len() }),
    ))
}

fn validate_profile(payload: &ProfilePayload) -> Result<()> {
    let mut fields = FieldErrors::new();
    if let Some(msg) = validate_name(&payload.name) {
        fields.insert("name", msg.to_string());
    }
    if payload.bio.chars().count() > MAX_BIO_CHARS {
        fields.insert("bio", format!("Bio must be at most {MAX_BIO_CHARS} characters."));
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(fields))
    }
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Form(payload): Form<ProfilePayload>,
) -> Result<Response> {
    let user = current.user();
    if let Err(err) = validate_profile(&payload) {
        let echo = json!({ "user": user, "name": payload.name, "bio": payload.bio });
        return Ok(View::form_error("profile", &err, echo).into_response());
    }

    let name = payload.name.trim();
    if !repo::update_profile(&state.db, &user.id, name, &payload.bio).await? {
        return Err(AppError::IdentityNotFound(user.id.clone()));
    }

    tracing::debug!(user_id = %user.id, "profile updated");
    Ok(Redirect::to("/profile").into_response())
}

/// Changing the password ends every session of the user and opens a fresh
/// one for the current client.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Form(payload): Form<PasswordPayload>,
) -> Result<Response> {
    let user = current.user();
    let result = credentials::change_password(
        &state.db,
        &state.passwords,
        user,
        &payload.current_password,
        &payload.new_password,
    )
    .await;

    match result {
        Ok(()) => {}
        Err(err @ (AppError::AuthenticationFailed | AppError::Validation(_))) => {
            return Ok(View::form_error("profile", &err, json!({ "user": user })).into_response());
        }
        Err(err) => return Err(err),
    }

    state.sessions.destroy_all_for(&user.id).await?;
    let token = state.sessions.serialize(user).await?;

    Ok((
        [(header::SET_COOKIE, state.sessions.cookie(&token))],
        Redirect::to("/profile"),
    )
        .into_response())
}
