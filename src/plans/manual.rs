//! Normalizes caller-authored plans into the canonical day/slot shape.

use std::collections::HashSet;

use time::{macros::format_description, Date};
use uuid::Uuid;

use crate::{
    config::PlannerConfig,
    error::AppError,
    nutrition::macro_targets,
    plans::{
        dto::{ManualDayInput, ManualPlanInput, ManualSlotInput},
        model::{total_meal_count, Adherence, Day, MealSlot, NewPlan},
    },
    users::model::UserProfile,
};

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| AppError::validation(format!("invalid date {raw:?}: {e}")))
}

/// Every meal id in the input that parses as a UUID. Unparseable ones are
/// reported later by [`normalize`].
pub fn referenced_meal_ids(input: &ManualPlanInput) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = input
        .days
        .iter()
        .flat_map(|d| {
            [&d.breakfast, &d.lunch, &d.dinner]
                .into_iter()
                .flatten()
                .chain(d.snacks.iter())
        })
        .filter_map(|s| s.meal_id.as_deref().and_then(|id| Uuid::parse_str(id).ok()))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Builds a plan from caller data. `known_meals` holds the ids that exist in
/// the catalog; any other reference fails validation.
pub fn normalize(
    profile: &UserProfile,
    input: &ManualPlanInput,
    known_meals: &HashSet<Uuid>,
    cfg: &PlannerConfig,
) -> Result<NewPlan, AppError> {
    let count = input.days.len();
    let bounds = cfg.min_duration_days as usize..=cfg.max_duration_days as usize;
    if !bounds.contains(&count) {
        return Err(AppError::validation(format!(
            "a plan needs between {} and {} days, got {count}",
            bounds.start(),
            bounds.end()
        )));
    }

    let days = input
        .days
        .iter()
        .enumerate()
        .map(|(i, day)| normalize_day(i, day, known_meals, cfg))
        .collect::<Result<Vec<_>, _>>()?;

    let start_date = days[0].date;
    let daily_calories = profile
        .daily_calorie_target
        .filter(|kcal| *kcal > 0.0)
        .unwrap_or(cfg.default_daily_calories);

    Ok(NewPlan {
        user_id: profile.user_id,
        name: input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("Custom plan from {start_date}"), str::to_string),
        start_date,
        adherence: Adherence::new(total_meal_count(&days)),
        days,
        target_nutrition: macro_targets(daily_calories, &cfg.macro_split),
    })
}

fn normalize_day(
    index: usize,
    day: &ManualDayInput,
    known_meals: &HashSet<Uuid>,
    cfg: &PlannerConfig,
) -> Result<Day, AppError> {
    let date = day
        .date
        .as_deref()
        .ok_or_else(|| AppError::validation(format!("day {index} has no date")))
        .and_then(parse_date)?;

    let mandatory = |slot: &Option<ManualSlotInput>, name: &str| -> Result<MealSlot, AppError> {
        let slot = slot
            .as_ref()
            .ok_or_else(|| AppError::validation(format!("day {index} has no {name}")))?;
        normalize_slot(slot, known_meals, cfg)
            .map_err(|e| AppError::validation(format!("day {index} {name}: {e}")))
    };

    Ok(Day {
        date,
        breakfast: mandatory(&day.breakfast, "breakfast")?,
        lunch: mandatory(&day.lunch, "lunch")?,
        dinner: mandatory(&day.dinner, "dinner")?,
        snacks: day
            .snacks
            .iter()
            .enumerate()
            .map(|(j, s)| {
                normalize_slot(s, known_meals, cfg)
                    .map_err(|e| AppError::validation(format!("day {index} snack {j}: {e}")))
            })
            .collect::<Result<_, _>>()?,
    })
}

fn normalize_slot(
    slot: &ManualSlotInput,
    known_meals: &HashSet<Uuid>,
    cfg: &PlannerConfig,
) -> Result<MealSlot, String> {
    let raw = slot.meal_id.as_deref().ok_or("missing meal reference")?;
    let meal_id = Uuid::parse_str(raw).map_err(|_| format!("meal reference {raw:?} is not an id"))?;
    if !known_meals.contains(&meal_id) {
        return Err(format!("meal {meal_id} does not exist"));
    }

    let servings = slot.servings.unwrap_or(1.0);
    if !(cfg.min_servings..=cfg.max_servings).contains(&servings) {
        return Err(format!(
            "servings must be between {} and {}, got {servings}",
            cfg.min_servings, cfg.max_servings
        ));
    }
    Ok(MealSlot::new(meal_id, servings))
}
