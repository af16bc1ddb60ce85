//! The boundary to the template renderer.
//!
//! Handlers only produce a view name and a plain data bag; turning that into
//! markup (and escaping it) is the renderer's job. Until one is attached the
//! bag is served as JSON.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::error::AppError;

#[derive(Debug)]
pub struct View {
    pub name: &'static str,
    pub status: StatusCode,
    pub data: Value,
}

impl View {
    pub fn new(name: &'static str, data: Value) -> Self {
        Self {
            name,
            status: StatusCode::OK,
            data,
        }
    }

    /// Re-renders a form after a user-correctable error. `data` carries the
    /// submitted values worth echoing back (never passwords).
    pub fn form_error(name: &'static str, err: &AppError, mut data: Value) -> Self {
        data["error"] = json!(err.public_message());
        if let AppError::Validation(fields) = err {
            data["fields"] = json!(fields);
        }
        Self {
            name,
            status: err.status(),
            data,
        }
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        let body = json!({ "view": self.name, "data": self.data });
        (self.status, Json(body)).into_response()
    }
}
