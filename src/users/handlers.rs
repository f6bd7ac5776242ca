use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::extractors::{ActiveUser, Superuser};
use crate::dto::Pagination;
use crate::errors::AppError;
use crate::state::AppState;
use crate::users::dto::{AdminUserUpdate, UserCreate, UserUpdate};
use crate::users::repo::{User, UserRepo};

pub fn open_routes() -> Router<AppState> {
    Router::new().route("/users/open", post(register_open))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(read_me).put(update_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(read_user).put(update_user).delete(delete_user),
        )
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_create(payload: &mut UserCreate) -> Result<(), AppError> {
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::BadRequest("Password too short".into()));
    }
    Ok(())
}

/// Partial-update validation shared by the self-service and admin paths:
/// a present email is normalized and checked, a present password must meet
/// the same minimum as registration.
fn validate_update(email: &mut Option<String>, password: Option<&str>) -> Result<(), AppError> {
    if let Some(e) = email {
        let normalized = e.trim().to_lowercase();
        if !is_valid_email(&normalized) {
            return Err(AppError::BadRequest("Invalid email".into()));
        }
        *e = normalized;
    }
    if let Some(p) = password {
        if p.len() < 8 {
            return Err(AppError::BadRequest("Password too short".into()));
        }
    }
    Ok(())
}

/// Open registration, no token required.
#[instrument(skip(state, payload))]
pub async fn register_open(
    State(state): State<AppState>,
    Json(mut payload): Json<UserCreate>,
) -> Result<Json<User>, AppError> {
    validate_create(&mut payload)?;

    let repo = UserRepo::new();
    if repo.get_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    // A concurrent registration slipping past the check above still loses at
    // the unique index and maps to Conflict.
    let user = repo.create(&state.db, &payload).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(user))
}

#[instrument(skip(user))]
pub async fn read_me(ActiveUser(user): ActiveUser) -> Result<Json<User>, AppError> {
    Ok(Json(user))
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(mut payload): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    validate_update(&mut payload.email, payload.password.as_deref())?;

    let updated = UserRepo::new().update(&state.db, &user, &payload).await?;
    info!(user_id = %updated.id, "user updated self");
    Ok(Json(updated))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Json(mut payload): Json<UserCreate>,
) -> Result<Json<User>, AppError> {
    validate_create(&mut payload)?;

    let repo = UserRepo::new();
    if repo.get_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let user = repo.create(&state.db, &payload).await?;
    info!(user_id = %user.id, email = %user.email, "user created by admin");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = UserRepo::new().list(&state.db, p.skip(), p.limit()).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn read_user(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Path(id): Path<i32>,
) -> Result<Json<User>, AppError> {
    let user = UserRepo::new()
        .get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Path(id): Path<i32>,
    Json(mut payload): Json<AdminUserUpdate>,
) -> Result<Json<User>, AppError> {
    validate_update(&mut payload.email, payload.password.as_deref())?;

    let repo = UserRepo::new();
    let existing = repo
        .get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let updated = repo.update_admin(&state.db, &existing, &payload).await?;
    info!(user_id = %updated.id, "user updated by admin");
    Ok(Json(updated))
}

#[instrument(skip(state, acting))]
pub async fn delete_user(
    State(state): State<AppState>,
    Superuser(acting): Superuser,
    Path(id): Path<i32>,
) -> Result<Json<User>, AppError> {
    if acting.id == id {
        return Err(AppError::BadRequest("Users can't delete themselves".into()));
    }
    let removed = UserRepo::new().remove(&state.db, id).await?;
    info!(user_id = %removed.id, "user deleted by admin");
    Ok(Json(removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn create_validation_normalizes_email() {
        let mut payload = UserCreate {
            email: "  A@B.Com ".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password: "long-enough".into(),
        };
        validate_create(&mut payload).unwrap();
        assert_eq!(payload.email, "a@b.com");
    }

    #[test]
    fn create_validation_rejects_short_password() {
        let mut payload = UserCreate {
            email: "a@b.com".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password: "short".into(),
        };
        let err = validate_create(&mut payload).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn update_validation_rejects_short_password() {
        let mut email = None;
        let err = validate_update(&mut email, Some("short")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn update_validation_normalizes_present_email() {
        let mut email = Some("  A@B.Com ".to_string());
        validate_update(&mut email, None).unwrap();
        assert_eq!(email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn update_validation_accepts_absent_fields() {
        let mut email = None;
        validate_update(&mut email, None).unwrap();
        assert!(email.is_none());
    }
}
