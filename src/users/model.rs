use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meals::model::{Allergen, DietaryTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthGoal {
    Lose,
    Gain,
    #[default]
    Maintain,
}

/// Planning-relevant part of a user's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    #[serde(default)]
    pub dietary_preferences: Vec<DietaryTag>,
    #[serde(default)]
    pub allergies: Vec<Allergen>,
    pub daily_calorie_target: Option<f64>,
    #[serde(default)]
    pub health_goal: HealthGoal,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
}
