//! Request extractors that resolve who is calling.
//!
//! Extractors run before the handler body and before any body extractor, so
//! a rejected `CurrentUser` means the handler never starts.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::server::AppState;
use crate::auth::session::{Authenticated, token_from_headers};
use crate::db::models::User;
use crate::error::AppError;

/// Whoever is making the request. Never rejects.
#[derive(Debug, Clone)]
pub enum Viewer {
    Anonymous,
    Identity(Authenticated),
}

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Identity(auth) => Some(&auth.user),
        }
    }
}

pub async fn resolve(parts: &Parts, state: &AppState) -> Viewer {
    let Some(token) = token_from_headers(&parts.headers) else {
        return Viewer::Anonymous;
    };

    match state.sessions.deserialize(token).await {
        Some(auth) => Viewer::Identity(auth),
        None => Viewer::Anonymous,
    }
}

impl FromRequestParts<Arc<AppState>> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(resolve(parts, state).await)
    }
}

/// A resolved identity, required. Anonymous requests are redirected to the
/// login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Authenticated);

impl CurrentUser {
    pub fn user(&self) -> &User {
        &self.0.user
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await {
            Viewer::Identity(auth) => Ok(CurrentUser(auth)),
            Viewer::Anonymous => {
                tracing::debug!(path = %parts.uri.path(), "anonymous request to protected route");
                Err(AppError::Unauthenticated)
            }
        }
    }
}
