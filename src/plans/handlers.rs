use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    plans::{
        adherence::ConsumptionUpdate,
        dto::{GeneratePlanRequest, ManualPlanInput, PlanListQuery, UpdatePlanRequest},
        model::Plan,
        services,
        summary::PlanNutrition,
    },
    state::AppState,
};

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_manual_plan))
        .route("/plans/generate", post(generate_plan))
        .route(
            "/plans/:id",
            get(get_plan).patch(update_plan).delete(delete_plan),
        )
        .route("/plans/:id/consume", post(mark_consumed))
        .route("/plans/:id/nutrition", get(plan_nutrition))
}

#[instrument(skip(state, payload))]
pub async fn generate_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<GeneratePlanRequest>,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    let mut rng = StdRng::from_entropy();
    let today = OffsetDateTime::now_utc().date();
    let plan = services::generate_plan(&state, user_id, payload, today, &mut rng).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

#[instrument(skip(state, payload))]
pub async fn create_manual_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ManualPlanInput>,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    let plan = services::create_manual_plan(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<PlanListQuery>,
) -> Result<Json<Vec<Plan>>, AppError> {
    Ok(Json(services::list_plans(&state, user_id, q.status).await?))
}

#[instrument(skip(state))]
pub async fn get_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>, AppError> {
    Ok(Json(services::get_plan(&state, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanRequest>,
) -> Result<Json<Plan>, AppError> {
    Ok(Json(services::update_plan(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_plan(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn mark_consumed(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConsumptionUpdate>,
) -> Result<Json<Plan>, AppError> {
    Ok(Json(services::mark_consumed(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn plan_nutrition(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanNutrition>, AppError> {
    Ok(Json(services::plan_nutrition(&state, user_id, id).await?))
}
