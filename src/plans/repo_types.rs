use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    nutrition::MacroTargets,
    plans::model::{Adherence, Day, Plan, PlanStatus},
};

#[derive(Debug, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub start_date: Date,
    pub duration: i32,
    pub days: Json<Vec<Day>>,
    pub target_nutrition: Json<MacroTargets>,
    pub total_meals: i32,
    pub consumed_meals: i32,
    pub adherence_percentage: i32,
    pub status: String,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<PlanRow> for Plan {
    type Error = anyhow::Error;

    fn try_from(r: PlanRow) -> Result<Self, Self::Error> {
        let status = r
            .status
            .parse::<PlanStatus>()
            .map_err(|e| anyhow::anyhow!("plan {}: {e}", r.id))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            start_date: r.start_date,
            duration: u32::try_from(r.duration)?,
            days: r.days.0,
            target_nutrition: r.target_nutrition.0,
            adherence: Adherence {
                total_meals: u32::try_from(r.total_meals)?,
                consumed_meals: u32::try_from(r.consumed_meals)?,
                adherence_percentage: u32::try_from(r.adherence_percentage)?,
            },
            status,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
