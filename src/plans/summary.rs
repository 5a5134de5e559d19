use std::collections::HashMap;

use serde::Serialize;
use time::Date;
use uuid::Uuid;

use crate::{
    meals::model::Meal,
    nutrition::{aggregate, average, MacroTargets, Nutrition},
    plans::model::Plan,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyNutrition {
    pub date: Date,
    pub nutrition: Nutrition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNutrition {
    pub daily_nutrition: Vec<DailyNutrition>,
    pub averages: Option<Nutrition>,
    pub target: MacroTargets,
}

/// Planned intake per day at the servings recorded on each slot. Slots whose
/// meal is no longer in `meals` contribute nothing.
pub fn compute_plan_nutrition(plan: &Plan, meals: &HashMap<Uuid, Meal>) -> PlanNutrition {
    let daily_nutrition: Vec<DailyNutrition> = plan
        .days
        .iter()
        .map(|day| DailyNutrition {
            date: day.date,
            nutrition: aggregate(
                day.slots()
                    .map(|s| (meals.get(&s.meal_id).map(|m| &m.nutrition), s.servings)),
            ),
        })
        .collect();
    let per_day: Vec<Nutrition> = daily_nutrition.iter().map(|d| d.nutrition).collect();

    PlanNutrition {
        averages: average(&per_day),
        daily_nutrition,
        target: plan.target_nutrition,
    }
}
