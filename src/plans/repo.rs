use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    plans::{
        model::{Plan, PlanStatus},
        repo_types::PlanRow,
    },
};

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn insert(&self, plan: &Plan) -> Result<(), AppError>;

    /// Plan owned by `user_id`; another user's plan is reported as absent.
    async fn find(&self, user_id: Uuid, plan_id: Uuid) -> Result<Option<Plan>, AppError>;

    /// Newest first.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<PlanStatus>,
    ) -> Result<Vec<Plan>, AppError>;

    /// Writes `plan` only if the stored version is still `expected_version`.
    /// Returns `false` when another writer got there first.
    async fn save(&self, plan: &Plan, expected_version: i64) -> Result<bool, AppError>;

    async fn delete(&self, user_id: Uuid, plan_id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgPlanRepository {
    db: PgPool,
}

impl PgPlanRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const PLAN_COLUMNS: &str = "id, user_id, name, start_date, duration, days, target_nutrition, \
     total_meals, consumed_meals, adherence_percentage, status, version, created_at, updated_at";

fn into_plans(rows: Vec<PlanRow>) -> Result<Vec<Plan>, AppError> {
    rows.into_iter()
        .map(|r| Plan::try_from(r).map_err(AppError::from))
        .collect()
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn insert(&self, plan: &Plan) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO meal_plans (id, user_id, name, start_date, duration, days, target_nutrition,
                                    total_meals, consumed_meals, adherence_percentage, status,
                                    version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(&plan.name)
        .bind(plan.start_date)
        .bind(plan.duration as i32)
        .bind(Json(&plan.days))
        .bind(Json(&plan.target_nutrition))
        .bind(plan.adherence.total_meals as i32)
        .bind(plan.adherence.consumed_meals as i32)
        .bind(plan.adherence.adherence_percentage as i32)
        .bind(plan.status.as_str())
        .bind(plan.version)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find(&self, user_id: Uuid, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM meal_plans WHERE id = $1 AND user_id = $2"
        ))
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Plan::try_from).transpose().map_err(AppError::from)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<PlanStatus>,
    ) -> Result<Vec<Plan>, AppError> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM meal_plans \
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;
        into_plans(rows)
    }

    async fn save(&self, plan: &Plan, expected_version: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE meal_plans
               SET name = $3, days = $4, consumed_meals = $5, adherence_percentage = $6,
                   status = $7, version = $8, updated_at = $9
             WHERE id = $1 AND user_id = $2 AND version = $10
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(&plan.name)
        .bind(Json(&plan.days))
        .bind(plan.adherence.consumed_meals as i32)
        .bind(plan.adherence.adherence_percentage as i32)
        .bind(plan.status.as_str())
        .bind(plan.version)
        .bind(plan.updated_at)
        .bind(expected_version)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, user_id: Uuid, plan_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM meal_plans WHERE id = $1 AND user_id = $2")
            .bind(plan_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
