use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    meals::model::{Allergen, DietaryTag},
    users::model::{HealthGoal, UserProfile},
};

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError>;
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: Uuid,
    dietary_preferences: Vec<String>,
    allergies: Vec<String>,
    daily_calorie_target: Option<f64>,
    health_goal: String,
    current_weight: Option<f64>,
    target_weight: Option<f64>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = anyhow::Error;

    fn try_from(r: ProfileRow) -> Result<Self, Self::Error> {
        let health_goal = match r.health_goal.as_str() {
            "lose" => HealthGoal::Lose,
            "gain" => HealthGoal::Gain,
            "maintain" => HealthGoal::Maintain,
            other => return Err(anyhow!("user {}: unknown health goal {other:?}", r.user_id)),
        };
        let dietary_preferences = r
            .dietary_preferences
            .iter()
            .map(|t| t.parse::<DietaryTag>().map_err(|e| anyhow!("user {}: {e}", r.user_id)))
            .collect::<anyhow::Result<_>>()?;
        let allergies = r
            .allergies
            .iter()
            .map(|a| a.parse::<Allergen>().map_err(|e| anyhow!("user {}: {e}", r.user_id)))
            .collect::<anyhow::Result<_>>()?;
        Ok(Self {
            user_id: r.user_id,
            dietary_preferences,
            allergies,
            daily_calorie_target: r.daily_calorie_target,
            health_goal,
            current_weight: r.current_weight,
            target_weight: r.target_weight,
        })
    }
}

#[derive(Clone)]
pub struct PgProfileRepository {
    db: PgPool,
}

impl PgProfileRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, dietary_preferences, allergies, daily_calorie_target,
                   health_goal, current_weight, target_weight
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(UserProfile::try_from)
            .transpose()
            .map_err(AppError::from)
    }
}
