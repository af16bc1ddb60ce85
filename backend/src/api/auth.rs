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
use crate::auth::credentials::{self, Registration};
use crate::auth::{CurrentUser, Viewer};
use crate::error::AppError;

#[derive(Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

pub async fn home(viewer: Viewer) -> View {
    View::new("home", json!({ "user": viewer.user() }))
}

pub async fn register_page() -> View {
    View::new("register", json!({}))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<Registration>,
) -> Response {
    let echo = json!({ "name": payload.name, "username": payload.username });

    match credentials::register(&state.db, &state.passwords, payload).await {
        Ok(_) => Redirect::to("/login").into_response(),
        Err(err @ (AppError::UsernameTaken(_) | AppError::Validation(_))) => {
            View::form_error("register", &err, echo).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn login_page() -> View {
    View::new("login", json!({}))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<LoginPayload>,
) -> Response {
    let result = credentials::authenticate(
        &state.db,
        &state.passwords,
        &payload.username,
        &payload.password,
    )
    .await;

    let user = match result {
        Ok(user) => user,
        Err(err @ AppError::AuthenticationFailed) => {
            tracing::info!("failed login attempt");
            return View::form_error("login", &err, json!({ "username": payload.username }))
                .into_response();
        }
        Err(err) => return err.into_response(),
    };

    match state.sessions.serialize(&user).await {
        Ok(token) => {
            tracing::info!(user_id = %user.id, "user logged in");
            (
                [(header::SET_COOKIE, state.sessions.cookie(&token))],
                Redirect::to("/"),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    state.sessions.destroy(&current.0.session_id).await?;
    tracing::info!(user_id = %current.user().id, "user logged out");

    Ok((
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/login"),
    )
        .into_response())
}
