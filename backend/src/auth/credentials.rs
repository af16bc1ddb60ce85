use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::db::{models::User, repo};
use crate::error::{AppError, FieldErrors, Result};

#[derive(Deserialize)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub password: String,
}

pub fn validate_name(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
        return Some("Name must contain only letters and spaces.");
    }
    None
}

pub fn validate_username(username: &str) -> Option<&'static str> {
    if username.len() < 3 || !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some("Username must be at least 3 characters and alphanumeric.");
    }
    None
}

pub fn validate_password(password: &str) -> Option<&'static str> {
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if password.chars().count() < 8 || !has_letter || !has_digit {
        return Some("Password must be at least 8 characters and include letters and numbers.");
    }
    None
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        let mut fields = FieldErrors::new();
        if let Some(msg) = validate_name(&self.name) {
            fields.insert("name", msg.to_string());
        }
        if let Some(msg) = validate_username(&self.username) {
            fields.insert("username", msg.to_string());
        }
        if let Some(msg) = validate_password(&self.password) {
            fields.insert("password", msg.to_string());
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(fields))
        }
    }
}

pub async fn register(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    registration: Registration,
) -> Result<User> {
    registration.validate()?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: registration.name.trim().to_string(),
        username: registration.username,
        password_hash: hasher.hash(&registration.password).await?,
        bio: String::new(),
        created_at: Utc::now(),
    };

    match repo::insert_user(pool, &user).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, username = %user.username, "registered user");
            Ok(user)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(AppError::UsernameTaken(user.username))
        }
        Err(e) => Err(e.into()),
    }
}

/// Any mismatch, whether the user is unknown or the password is wrong, comes
/// back as `AuthenticationFailed` after one Argon2 verification.
pub async fn authenticate(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<User> {
    let Some(user) = repo::get_user(pool, username).await? else {
        hasher.verify_dummy(password).await?;
        return Err(AppError::AuthenticationFailed);
    };

    if hasher.verify(password, &user.password_hash).await? {
        Ok(user)
    } else {
        Err(AppError::AuthenticationFailed)
    }
}

pub async fn change_password(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    user: &User,
    current: &str,
    new: &str,
) -> Result<()> {
    if !hasher.verify(current, &user.password_hash).await? {
        return Err(AppError::AuthenticationFailed);
    }
    if let Some(msg) = validate_password(new) {
        return Err(AppError::invalid("new_password", msg));
    }

    let hash = hasher.hash(new).await?;
    if !repo::update_password_hash(pool, &user.id, &hash).await? {
        return Err(AppError::IdentityNotFound(user.id.clone()));
    }

    tracing::info!(user_id = %user.id, "password changed");
    Ok(())
}
