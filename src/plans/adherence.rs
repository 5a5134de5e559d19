use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    error::AppError,
    meals::model::MealType,
    plans::model::{Adherence, MealSlot, Plan},
};

fn default_consumed() -> bool {
    true
}

/// One consumption toggle on a plan slot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionUpdate {
    pub day_index: i64,
    pub slot_type: String,
    #[serde(default)]
    pub snack_index: Option<i64>,
    #[serde(default = "default_consumed")]
    pub consumed: bool,
}

/// Sets or clears the consumed flag of one slot and recounts adherence.
///
/// `total_meals` is never touched; `consumed_meals` is rebuilt from a full
/// scan so repeated calls cannot double count.
pub fn mark_consumed(
    plan: &mut Plan,
    update: &ConsumptionUpdate,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    let slot = locate_slot(plan, update)?;
    slot.set_consumed(update.consumed, now);
    plan.adherence = recount(plan);
    Ok(())
}

fn locate_slot<'p>(plan: &'p mut Plan, update: &ConsumptionUpdate) -> Result<&'p mut MealSlot, AppError> {
    let day_count = plan.days.len();
    let day = usize::try_from(update.day_index)
        .ok()
        .and_then(|i| plan.days.get_mut(i))
        .ok_or_else(|| {
            AppError::invalid_index(format!(
                "day {} outside plan of {day_count} days",
                update.day_index
            ))
        })?;

    let slot_type: MealType = update.slot_type.parse()?;
    match slot_type {
        MealType::Breakfast => Ok(&mut day.breakfast),
        MealType::Lunch => Ok(&mut day.lunch),
        MealType::Dinner => Ok(&mut day.dinner),
        MealType::Snack => {
            let raw = update
                .snack_index
                .ok_or_else(|| AppError::invalid_index("snack index required"))?;
            let snack_count = day.snacks.len();
            usize::try_from(raw)
                .ok()
                .and_then(|i| day.snacks.get_mut(i))
                .ok_or_else(|| {
                    AppError::invalid_index(format!(
                        "snack {raw} outside day with {snack_count} snacks"
                    ))
                })
        }
    }
}

pub fn recount(plan: &Plan) -> Adherence {
    let consumed = plan
        .days
        .iter()
        .flat_map(|d| d.slots())
        .filter(|s| s.consumed)
        .count() as u32;
    let total = plan.adherence.total_meals;
    let percentage = if total == 0 {
        0
    } else {
        (100.0 * f64::from(consumed) / f64::from(total)).round() as u32
    };
    Adherence {
        total_meals: total,
        consumed_meals: consumed,
        adherence_percentage: percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        nutrition::MacroTargets,
        plans::model::{total_meal_count, Day, NewPlan},
    };
    use time::macros::{date, datetime};
    use uuid::Uuid;

    fn plan(snacks_per_day: &[usize]) -> Plan {
        let slot = MealSlot::new(Uuid::new_v4(), 1.0);
        let days: Vec<Day> = snacks_per_day
            .iter()
            .map(|n| Day {
                date: date!(2024 - 06 - 01),
                breakfast: slot.clone(),
                lunch: slot.clone(),
                dinner: slot.clone(),
                snacks: vec![slot.clone(); *n],
            })
            .collect();
        let new = NewPlan {
            user_id: Uuid::new_v4(),
            name: "test".into(),
            start_date: date!(2024 - 06 - 01),
            adherence: Adherence::new(total_meal_count(&days)),
            days,
            target_nutrition: MacroTargets {
                daily_calories: 2000.0,
                protein: 150.0,
                carbohydrates: 225.0,
                fats: 56.0,
            },
        };
        Plan::from_new(new, datetime!(2024-06-01 00:00 UTC))
    }

    fn update(day: i64, slot: &str, snack: Option<i64>, consumed: bool) -> ConsumptionUpdate {
        ConsumptionUpdate {
            day_index: day,
            slot_type: slot.into(),
            snack_index: snack,
            consumed,
        }
    }

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    #[test]
    fn marking_updates_counts_and_percentage() {
        let mut p = plan(&[1, 2]);
        assert_eq!(p.adherence.total_meals, 9);

        mark_consumed(&mut p, &update(0, "breakfast", None, true), NOW).unwrap();
        mark_consumed(&mut p, &update(1, "snack", Some(1), true), NOW).unwrap();
        assert_eq!(p.adherence.consumed_meals, 2);
        assert_eq!(p.adherence.adherence_percentage, 22);
        assert_eq!(p.days[1].snacks[1].consumed_at, Some(NOW));
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let base = plan(&[1]);
        let later = datetime!(2024-06-01 13:00 UTC);

        let mut once = base.clone();
        mark_consumed(&mut once, &update(0, "lunch", None, true), NOW).unwrap();

        let mut twice = base;
        mark_consumed(&mut twice, &update(0, "lunch", None, true), NOW).unwrap();
        mark_consumed(&mut twice, &update(0, "lunch", None, true), later).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.adherence.consumed_meals, 1);
    }

    #[test]
    fn unmarking_clears_timestamp() {
        let mut p = plan(&[0]);
        mark_consumed(&mut p, &update(0, "dinner", None, true), NOW).unwrap();
        mark_consumed(&mut p, &update(0, "dinner", None, false), NOW).unwrap();
        assert!(!p.days[0].dinner.consumed);
        assert_eq!(p.days[0].dinner.consumed_at, None);
        assert_eq!(p.adherence.consumed_meals, 0);
        assert_eq!(p.adherence.adherence_percentage, 0);
    }

    #[test]
    fn bad_indices_are_rejected_without_side_effects() {
        let mut p = plan(&[1]);
        let before = p.clone();
        for u in [
            update(1, "breakfast", None, true),
            update(-1, "breakfast", None, true),
            update(0, "snack", None, true),
            update(0, "snack", Some(1), true),
            update(0, "snack", Some(-2), true),
        ] {
            let err = mark_consumed(&mut p, &u, NOW).unwrap_err();
            assert_eq!(err.kind(), "invalid_index", "{u:?}");
        }
        assert_eq!(p, before);
    }

    #[test]
    fn unknown_slot_type_is_a_validation_error() {
        let mut p = plan(&[1]);
        let err = mark_consumed(&mut p, &update(0, "brunch", None, true), NOW).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn invariants_hold_over_a_sequence() {
        let mut p = plan(&[2, 1, 0]);
        let total = p.adherence.total_meals;
        let script = [
            update(0, "breakfast", None, true),
            update(0, "snack", Some(0), true),
            update(0, "snack", Some(1), true),
            update(1, "dinner", None, true),
            update(0, "snack", Some(0), false),
            update(2, "lunch", None, true),
            update(2, "lunch", None, true),
        ];
        for u in &script {
            mark_consumed(&mut p, u, NOW).unwrap();
            let a = p.adherence;
            assert_eq!(a.total_meals, total);
            assert!(a.consumed_meals <= a.total_meals);
            let expected = (100.0 * f64::from(a.consumed_meals) / f64::from(total)).round() as u32;
            assert_eq!(a.adherence_percentage, expected);
        }
        assert_eq!(p.adherence.consumed_meals, 4);
    }
}
