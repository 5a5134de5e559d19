use serde::Deserialize;
use time::Date;

use crate::plans::model::PlanStatus;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    /// Defaults to today (UTC).
    pub start_date: Option<Date>,
    pub duration: Option<u32>,
    pub name: Option<String>,
}

/// Caller-authored plan. Everything is optional at the wire level so that
/// missing pieces surface as validation errors naming the day and slot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPlanInput {
    pub name: Option<String>,
    #[serde(default)]
    pub days: Vec<ManualDayInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualDayInput {
    pub date: Option<String>,
    pub breakfast: Option<ManualSlotInput>,
    pub lunch: Option<ManualSlotInput>,
    pub dinner: Option<ManualSlotInput>,
    #[serde(default)]
    pub snacks: Vec<ManualSlotInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSlotInput {
    pub meal_id: Option<String>,
    pub servings: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub status: Option<PlanStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanListQuery {
    pub status: Option<PlanStatus>,
}
