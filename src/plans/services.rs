use std::collections::{HashMap, HashSet};

use rand::Rng;
use time::{Date, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    plans::{
        adherence::{self, ConsumptionUpdate},
        dto::{GeneratePlanRequest, ManualPlanInput, UpdatePlanRequest},
        generator::PlanGenerator,
        manual,
        model::{Plan, PlanStatus},
        summary::{compute_plan_nutrition, PlanNutrition},
    },
    state::AppState,
    users::model::UserProfile,
};

pub async fn load_profile(st: &AppState, user_id: Uuid) -> Result<UserProfile, AppError> {
    st.profiles
        .find_profile(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("profile for user {user_id}")))
}

pub async fn get_plan(st: &AppState, user_id: Uuid, plan_id: Uuid) -> Result<Plan, AppError> {
    st.plans
        .find(user_id, plan_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("plan {plan_id}")))
}

#[instrument(skip(st, req, rng))]
pub async fn generate_plan<R>(
    st: &AppState,
    user_id: Uuid,
    req: GeneratePlanRequest,
    today: Date,
    rng: &mut R,
) -> Result<Plan, AppError>
where
    R: Rng + Send + ?Sized,
{
    let profile = load_profile(st, user_id).await?;
    let cfg = &st.config.planner;
    let duration = req.duration.unwrap_or(cfg.default_duration_days);
    let start_date = req.start_date.unwrap_or(today);

    let mut new_plan = PlanGenerator::new(&*st.meals, cfg)
        .generate(&profile, start_date, duration, rng)
        .await?;
    if let Some(name) = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        new_plan.name = name;
    }

    let plan = Plan::from_new(new_plan, OffsetDateTime::now_utc());
    st.plans.insert(&plan).await?;
    info!(plan_id = %plan.id, total_meals = plan.adherence.total_meals, "plan created");
    Ok(plan)
}

#[instrument(skip(st, input), fields(days = input.days.len()))]
pub async fn create_manual_plan(
    st: &AppState,
    user_id: Uuid,
    input: ManualPlanInput,
) -> Result<Plan, AppError> {
    let profile = load_profile(st, user_id).await?;
    let referenced = manual::referenced_meal_ids(&input);
    let known: HashSet<Uuid> = st
        .meals
        .find_by_ids(&referenced)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();

    let new_plan = manual::normalize(&profile, &input, &known, &st.config.planner)?;
    let plan = Plan::from_new(new_plan, OffsetDateTime::now_utc());
    st.plans.insert(&plan).await?;
    info!(plan_id = %plan.id, total_meals = plan.adherence.total_meals, "manual plan created");
    Ok(plan)
}

pub async fn list_plans(
    st: &AppState,
    user_id: Uuid,
    status: Option<PlanStatus>,
) -> Result<Vec<Plan>, AppError> {
    st.plans.list_by_user(user_id, status).await
}

/// Saves `plan` against the version it was loaded with.
async fn save_versioned(st: &AppState, plan: &mut Plan) -> Result<(), AppError> {
    let expected = plan.version;
    plan.version += 1;
    plan.updated_at = OffsetDateTime::now_utc();
    if st.plans.save(plan, expected).await? {
        Ok(())
    } else {
        warn!(plan_id = %plan.id, expected, "concurrent plan update lost the race");
        Err(AppError::conflict(format!(
            "plan {} was modified concurrently; reload and retry",
            plan.id
        )))
    }
}

#[instrument(skip(st, req))]
pub async fn update_plan(
    st: &AppState,
    user_id: Uuid,
    plan_id: Uuid,
    req: UpdatePlanRequest,
) -> Result<Plan, AppError> {
    let mut plan = get_plan(st, user_id, plan_id).await?;
    if let Some(name) = req.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("plan name must not be blank"));
        }
        plan.name = name.to_string();
    }
    if let Some(status) = req.status {
        plan.status = status;
    }
    save_versioned(st, &mut plan).await?;
    Ok(plan)
}

pub async fn delete_plan(st: &AppState, user_id: Uuid, plan_id: Uuid) -> Result<(), AppError> {
    if st.plans.delete(user_id, plan_id).await? {
        info!(%plan_id, "plan deleted");
        Ok(())
    } else {
        Err(AppError::not_found(format!("plan {plan_id}")))
    }
}

/// Read-modify-write guarded by the plan version: a concurrent writer turns
/// into [`AppError::Conflict`] instead of a silently lost update.
#[instrument(skip(st))]
pub async fn mark_consumed(
    st: &AppState,
    user_id: Uuid,
    plan_id: Uuid,
    update: ConsumptionUpdate,
) -> Result<Plan, AppError> {
    let mut plan = get_plan(st, user_id, plan_id).await?;
    adherence::mark_consumed(&mut plan, &update, OffsetDateTime::now_utc())?;
    save_versioned(st, &mut plan).await?;
    Ok(plan)
}

pub async fn plan_nutrition(
    st: &AppState,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<PlanNutrition, AppError> {
    let plan = get_plan(st, user_id, plan_id).await?;
    let meals: HashMap<_, _> = st
        .meals
        .find_by_ids(&plan.meal_ids())
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();
    Ok(compute_plan_nutrition(&plan, &meals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        meals::model::{Meal, MealType},
        nutrition::Nutrition,
        plans::{
            dto::{ManualDayInput, ManualSlotInput},
            repo::PlanRepository,
        },
        store::memory::MemoryStore,
        users::model::HealthGoal,
    };
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;
    use time::macros::date;

    fn meal(meal_type: MealType, calories: f64) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: meal_type.to_string(),
            meal_type,
            nutrition: Nutrition {
                calories,
                protein: calories / 20.0,
                ..Nutrition::default()
            },
            dietary_tags: vec![],
            allergens: vec![],
            is_active: true,
        }
    }

    async fn setup() -> (AppState, Arc<MemoryStore>, Uuid, Vec<Meal>) {
        let store = Arc::new(MemoryStore::default());
        let catalog = vec![
            meal(MealType::Breakfast, 500.0),
            meal(MealType::Lunch, 700.0),
            meal(MealType::Dinner, 700.0),
            meal(MealType::Snack, 100.0),
            meal(MealType::Snack, 120.0),
        ];
        store.add_meals(catalog.clone()).await;
        let user_id = Uuid::new_v4();
        store
            .put_profile(UserProfile {
                user_id,
                dietary_preferences: vec![],
                allergies: vec![],
                daily_calorie_target: Some(2000.0),
                health_goal: HealthGoal::Lose,
                current_weight: Some(85.0),
                target_weight: Some(75.0),
            })
            .await;
        (AppState::with_store(store.clone()), store, user_id, catalog)
    }

    #[tokio::test]
    async fn generated_plan_is_persisted_with_defaults() {
        let (st, _, user_id, _) = setup().await;
        let mut rng = StdRng::seed_from_u64(1);
        let plan = generate_plan(
            &st,
            user_id,
            GeneratePlanRequest::default(),
            date!(2024 - 09 - 02),
            &mut rng,
        )
        .await
        .unwrap();

        assert_eq!(plan.duration, 7);
        assert_eq!(plan.start_date, date!(2024 - 09 - 02));
        assert_eq!(plan.status, PlanStatus::Active);
        let stored = get_plan(&st, user_id, plan.id).await.unwrap();
        assert_eq!(stored, plan);
    }

    #[tokio::test]
    async fn unknown_user_has_no_profile() {
        let (st, ..) = setup().await;
        let err = generate_plan(
            &st,
            Uuid::new_v4(),
            GeneratePlanRequest::default(),
            date!(2024 - 09 - 02),
            &mut StdRng::seed_from_u64(1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn consumption_is_saved_and_total_never_changes() {
        let (st, _, user_id, _) = setup().await;
        let plan = generate_plan(
            &st,
            user_id,
            GeneratePlanRequest {
                duration: Some(3),
                ..Default::default()
            },
            date!(2024 - 09 - 02),
            &mut StdRng::seed_from_u64(2),
        )
        .await
        .unwrap();
        let total = plan.adherence.total_meals;

        let update = ConsumptionUpdate {
            day_index: 2,
            slot_type: "dinner".into(),
            snack_index: None,
            consumed: true,
        };
        mark_consumed(&st, user_id, plan.id, update.clone()).await.unwrap();
        let after = mark_consumed(&st, user_id, plan.id, update).await.unwrap();

        assert_eq!(after.adherence.total_meals, total);
        assert_eq!(after.adherence.consumed_meals, 1);
        assert_eq!(after.version, plan.version + 2);
        let stored = get_plan(&st, user_id, plan.id).await.unwrap();
        assert!(stored.days[2].dinner.consumed);
    }

    #[tokio::test]
    async fn stale_writer_gets_conflict() {
        let (st, store, user_id, _) = setup().await;
        let plan = generate_plan(
            &st,
            user_id,
            GeneratePlanRequest::default(),
            date!(2024 - 09 - 02),
            &mut StdRng::seed_from_u64(3),
        )
        .await
        .unwrap();

        let mut stale = plan.clone();
        mark_consumed(
            &st,
            user_id,
            plan.id,
            ConsumptionUpdate {
                day_index: 0,
                slot_type: "breakfast".into(),
                snack_index: None,
                consumed: true,
            },
        )
        .await
        .unwrap();

        stale.name = "renamed from a stale copy".into();
        let err = save_versioned(&st, &mut stale).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
        let stored = get_plan(&st, user_id, plan.id).await.unwrap();
        assert_eq!(stored.name, plan.name);
        assert!(!store.save(&plan, plan.version).await.unwrap());
    }

    #[tokio::test]
    async fn plans_of_other_users_are_invisible() {
        let (st, _, user_id, _) = setup().await;
        let plan = generate_plan(
            &st,
            user_id,
            GeneratePlanRequest::default(),
            date!(2024 - 09 - 02),
            &mut StdRng::seed_from_u64(4),
        )
        .await
        .unwrap();

        let stranger = Uuid::new_v4();
        assert_eq!(get_plan(&st, stranger, plan.id).await.unwrap_err().kind(), "not_found");
        assert_eq!(delete_plan(&st, stranger, plan.id).await.unwrap_err().kind(), "not_found");
        delete_plan(&st, user_id, plan.id).await.unwrap();
        assert!(list_plans(&st, user_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_changes_status_and_name() {
        let (st, _, user_id, _) = setup().await;
        let plan = generate_plan(
            &st,
            user_id,
            GeneratePlanRequest::default(),
            date!(2024 - 09 - 02),
            &mut StdRng::seed_from_u64(5),
        )
        .await
        .unwrap();

        let updated = update_plan(
            &st,
            user_id,
            plan.id,
            UpdatePlanRequest {
                name: Some("  Cut week ".into()),
                status: Some(PlanStatus::Completed),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Cut week");
        assert_eq!(updated.adherence, plan.adherence);

        let active = list_plans(&st, user_id, Some(PlanStatus::Active)).await.unwrap();
        assert!(active.is_empty());
        let done = list_plans(&st, user_id, Some(PlanStatus::Completed)).await.unwrap();
        assert_eq!(done.len(), 1);
    }

    #[tokio::test]
    async fn manual_plan_nutrition_summary() {
        let (st, _, user_id, catalog) = setup().await;
        let slot = |m: &Meal, servings: Option<f64>| {
            Some(ManualSlotInput {
                meal_id: Some(m.id.to_string()),
                servings,
            })
        };
        let input = ManualPlanInput {
            name: Some("Hand made".into()),
            days: vec![ManualDayInput {
                date: Some("2024-09-10".into()),
                breakfast: slot(&catalog[0], Some(2.0)),
                lunch: slot(&catalog[1], None),
                dinner: slot(&catalog[2], None),
                snacks: slot(&catalog[3], None).into_iter().collect(),
            }],
        };
        let plan = create_manual_plan(&st, user_id, input).await.unwrap();
        assert_eq!(plan.adherence.total_meals, 4);

        let summary = plan_nutrition(&st, user_id, plan.id).await.unwrap();
        assert_eq!(summary.daily_nutrition.len(), 1);
        assert_eq!(summary.daily_nutrition[0].nutrition.calories, 2500.0);
        assert_eq!(summary.averages.unwrap().calories, 2500.0);
        assert_eq!(summary.target.protein, 150.0);
    }

    #[tokio::test]
    async fn manual_plan_with_unknown_meal_fails_validation() {
        let (st, _, user_id, catalog) = setup().await;
        let known = Some(ManualSlotInput {
            meal_id: Some(catalog[0].id.to_string()),
            servings: None,
        });
        let input = ManualPlanInput {
            name: None,
            days: vec![ManualDayInput {
                date: Some("2024-09-10".into()),
                breakfast: known.clone(),
                lunch: known,
                dinner: Some(ManualSlotInput {
                    meal_id: Some(Uuid::new_v4().to_string()),
                    servings: None,
                }),
                snacks: vec![],
            }],
        };
        let err = create_manual_plan(&st, user_id, input).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
