use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::auth::extractors::Superuser;
use crate::catalog::dto::{CategoryCreate, CategoryUpdate, ExerciseCreate, ExerciseUpdate};
use crate::dto::Pagination;
use crate::catalog::repo::{
    get_exercise_with_category, Category, Exercise, ExerciseDetails, CATEGORIES, EXERCISES,
};
use crate::errors::AppError;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/:id", get(read_category))
        .route("/exercises", get(list_exercises))
        .route("/exercises/:id", get(read_exercise))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create_category))
        .route(
            "/categories/:id",
            axum::routing::put(update_category).delete(delete_category),
        )
        .route("/exercises", post(create_exercise))
        .route(
            "/exercises/:id",
            axum::routing::put(update_exercise).delete(delete_exercise),
        )
}

// --- categories ---

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Json(payload): Json<CategoryCreate>,
) -> Result<Json<Category>, AppError> {
    let category = CATEGORIES.create(&state.db, &payload).await?;
    info!(category_id = %category.id, name = %category.name, "category created");
    Ok(Json(category))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = CATEGORIES.list(&state.db, p.skip(), p.limit()).await?;
    Ok(Json(categories))
}

#[instrument(skip(state))]
pub async fn read_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>, AppError> {
    let category = CATEGORIES
        .get(&state.db, &[("id", id.into())])
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;
    Ok(Json(category))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<Category>, AppError> {
    let existing = CATEGORIES
        .get(&state.db, &[("id", id.into())])
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;
    let updated = CATEGORIES.update(&state.db, &existing, &payload).await?;
    Ok(Json(updated))
}

/// Deleting a category still referenced by exercises is rejected; the
/// foreign key surfaces as Conflict.
#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Path(id): Path<i32>,
) -> Result<Json<Category>, AppError> {
    let removed = CATEGORIES.remove(&state.db, &[("id", id.into())]).await?;
    info!(category_id = %removed.id, "category deleted");
    Ok(Json(removed))
}

// --- exercises ---

#[instrument(skip(state, payload))]
pub async fn create_exercise(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Json(payload): Json<ExerciseCreate>,
) -> Result<Json<Exercise>, AppError> {
    let exercise = EXERCISES.create(&state.db, &payload).await?;
    info!(exercise_id = %exercise.id, name = %exercise.name, "exercise created");
    Ok(Json(exercise))
}

#[instrument(skip(state))]
pub async fn list_exercises(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Exercise>>, AppError> {
    let exercises = EXERCISES.list(&state.db, p.skip(), p.limit()).await?;
    Ok(Json(exercises))
}

#[instrument(skip(state))]
pub async fn read_exercise(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ExerciseDetails>, AppError> {
    let exercise = get_exercise_with_category(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exercise not found".into()))?;
    Ok(Json(exercise))
}

#[instrument(skip(state, payload))]
pub async fn update_exercise(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Path(id): Path<i32>,
    Json(payload): Json<ExerciseUpdate>,
) -> Result<Json<Exercise>, AppError> {
    let existing = EXERCISES
        .get(&state.db, &[("id", id.into())])
        .await?
        .ok_or_else(|| AppError::NotFound("Exercise not found".into()))?;
    let updated = EXERCISES.update(&state.db, &existing, &payload).await?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_exercise(
    State(state): State<AppState>,
    Superuser(_): Superuser,
    Path(id): Path<i32>,
) -> Result<Json<Exercise>, AppError> {
    let removed = EXERCISES.remove(&state.db, &[("id", id.into())]).await?;
    info!(exercise_id = %removed.id, "exercise deleted");
    Ok(Json(removed))
}
