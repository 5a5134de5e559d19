use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{error::AppError, nutrition::MacroTargets};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for PlanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            other => Err(AppError::validation(format!("unknown plan status {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSlot {
    pub meal_id: Uuid,
    pub servings: f64,
    pub consumed: bool,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub consumed_at: Option<OffsetDateTime>,
}

impl MealSlot {
    pub fn new(meal_id: Uuid, servings: f64) -> Self {
        Self {
            meal_id,
            servings,
            consumed: false,
            consumed_at: None,
        }
    }

    /// Idempotent: re-marking a consumed slot keeps its original timestamp.
    pub fn set_consumed(&mut self, consumed: bool, now: OffsetDateTime) {
        match (self.consumed, consumed) {
            (false, true) => {
                self.consumed = true;
                self.consumed_at = Some(now);
            }
            (true, false) => {
                self.consumed = false;
                self.consumed_at = None;
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub date: Date,
    pub breakfast: MealSlot,
    pub lunch: MealSlot,
    pub dinner: MealSlot,
    #[serde(default)]
    pub snacks: Vec<MealSlot>,
}

impl Day {
    pub fn slots(&self) -> impl Iterator<Item = &MealSlot> {
        [&self.breakfast, &self.lunch, &self.dinner]
            .into_iter()
            .chain(self.snacks.iter())
    }

    pub fn slot_count(&self) -> usize {
        3 + self.snacks.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adherence {
    pub total_meals: u32,
    pub consumed_meals: u32,
    pub adherence_percentage: u32,
}

impl Adherence {
    pub fn new(total_meals: u32) -> Self {
        Self {
            total_meals,
            consumed_meals: 0,
            adherence_percentage: 0,
        }
    }
}

/// Plan fields fixed by the generator or the manual builder, before storage
/// assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub user_id: Uuid,
    pub name: String,
    pub start_date: Date,
    pub days: Vec<Day>,
    pub target_nutrition: MacroTargets,
    pub adherence: Adherence,
}

impl NewPlan {
    pub fn duration(&self) -> u32 {
        self.days.len() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub start_date: Date,
    pub duration: u32,
    pub days: Vec<Day>,
    pub target_nutrition: MacroTargets,
    pub adherence: Adherence,
    pub status: PlanStatus,
    /// Bumped on every successful save; writers must present the version they read.
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Plan {
    pub fn from_new(new: NewPlan, now: OffsetDateTime) -> Self {
        let duration = new.duration();
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name,
            start_date: new.start_date,
            duration,
            days: new.days,
            target_nutrition: new.target_nutrition,
            adherence: new.adherence,
            status: PlanStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn meal_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .days
            .iter()
            .flat_map(|d| d.slots().map(|s| s.meal_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// `3·days + Σ snacks`.
pub fn total_meal_count(days: &[Day]) -> u32 {
    days.iter().map(Day::slot_count).sum::<usize>() as u32
}
