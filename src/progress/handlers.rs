use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    progress::{dto::WeightRequest, model::ProgressEntry, projector::GoalProjection, services},
    state::AppState,
};

pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/progress",
            get(list_progress).put(log_weight).post(record_weight),
        )
        .route("/progress/projection", get(goal_projection))
        .route("/progress/:id", delete(delete_progress))
}

fn today() -> time::Date {
    OffsetDateTime::now_utc().date()
}

#[instrument(skip(state))]
pub async fn list_progress(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ProgressEntry>>, AppError> {
    Ok(Json(services::list_progress(&state, user_id).await?))
}

/// PUT /progress: upsert for the day.
#[instrument(skip(state, payload))]
pub async fn log_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<WeightRequest>,
) -> Result<Json<ProgressEntry>, AppError> {
    Ok(Json(
        services::log_weight(&state, user_id, payload, today()).await?,
    ))
}

/// POST /progress: 409 when the day already has a reading.
#[instrument(skip(state, payload))]
pub async fn record_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<WeightRequest>,
) -> Result<(StatusCode, Json<ProgressEntry>), AppError> {
    let entry = services::record_weight(&state, user_id, payload, today()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state))]
pub async fn delete_progress(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_progress(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn goal_projection(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<GoalProjection>, AppError> {
    Ok(Json(
        services::goal_projection(&state, user_id, today()).await?,
    ))
}
