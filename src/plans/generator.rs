use rand::{seq::SliceRandom, Rng};
use time::{Date, Duration};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::PlannerConfig,
    error::{AppError, PoolSizes},
    meals::{
        model::{Meal, MealType},
        repo::MealRepository,
        selector::{MealSelector, SelectionTier},
    },
    nutrition::macro_targets,
    plans::model::{total_meal_count, Adherence, Day, MealSlot, NewPlan},
    users::model::UserProfile,
};

/// Per-slot calorie budget for one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotBudgets {
    pub breakfast: f64,
    pub lunch: f64,
    pub dinner: f64,
    pub snack: f64,
}

impl SlotBudgets {
    pub fn split(daily_calories: f64, cfg: &PlannerConfig) -> Self {
        Self {
            breakfast: daily_calories * cfg.breakfast_share,
            lunch: daily_calories * cfg.lunch_share,
            dinner: daily_calories * cfg.dinner_share,
            snack: daily_calories * cfg.snack_share,
        }
    }

    fn for_type(&self, meal_type: MealType) -> f64 {
        match meal_type {
            MealType::Breakfast => self.breakfast,
            MealType::Lunch => self.lunch,
            MealType::Dinner => self.dinner,
            MealType::Snack => self.snack,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MealPools {
    pub breakfast: Vec<Meal>,
    pub lunch: Vec<Meal>,
    pub dinner: Vec<Meal>,
    pub snack: Vec<Meal>,
    /// Types whose pool came from a tier weaker than [`SelectionTier::Strict`].
    pub relaxed: Vec<(MealType, SelectionTier)>,
}

impl MealPools {
    fn pool(&self, meal_type: MealType) -> &[Meal] {
        match meal_type {
            MealType::Breakfast => &self.breakfast,
            MealType::Lunch => &self.lunch,
            MealType::Dinner => &self.dinner,
            MealType::Snack => &self.snack,
        }
    }

    fn pool_mut(&mut self, meal_type: MealType) -> &mut Vec<Meal> {
        match meal_type {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
            MealType::Snack => &mut self.snack,
        }
    }

    pub fn missing_mandatory(&self) -> Vec<MealType> {
        MealType::MANDATORY
            .into_iter()
            .filter(|t| self.pool(*t).is_empty())
            .collect()
    }

    pub fn sizes(&self) -> PoolSizes {
        PoolSizes {
            breakfast: self.breakfast.len(),
            lunch: self.lunch.len(),
            dinner: self.dinner.len(),
            snack: self.snack.len(),
        }
    }
}

pub struct PlanGenerator<'a> {
    meals: &'a dyn MealRepository,
    config: &'a PlannerConfig,
}

impl<'a> PlanGenerator<'a> {
    pub fn new(meals: &'a dyn MealRepository, config: &'a PlannerConfig) -> Self {
        Self { meals, config }
    }

    pub fn daily_calories(&self, profile: &UserProfile) -> f64 {
        profile
            .daily_calorie_target
            .filter(|kcal| *kcal > 0.0)
            .unwrap_or(self.config.default_daily_calories)
    }

    /// Builds a plan of `duration` days starting at `start_date`.
    ///
    /// Fails with [`AppError::InsufficientMeals`] when breakfast, lunch or
    /// dinner has no candidate even after the calorie constraint is dropped
    /// plan-wide. An empty snack pool just yields snack-free days.
    #[instrument(skip(self, profile, rng), fields(user_id = %profile.user_id))]
    pub async fn generate<R>(
        &self,
        profile: &UserProfile,
        start_date: Date,
        duration: u32,
        rng: &mut R,
    ) -> Result<NewPlan, AppError>
    where
        R: Rng + Send + ?Sized,
    {
        let cfg = self.config;
        if !(cfg.min_duration_days..=cfg.max_duration_days).contains(&duration) {
            return Err(AppError::validation(format!(
                "duration must be between {} and {} days, got {duration}",
                cfg.min_duration_days, cfg.max_duration_days
            )));
        }

        let daily_calories = self.daily_calories(profile);
        let budgets = SlotBudgets::split(daily_calories, cfg);

        let mut pools = self.fetch_pools(profile, Some(&budgets)).await?;
        if !pools.missing_mandatory().is_empty() {
            warn!(
                missing = ?pools.missing_mandatory(),
                "mandatory pool empty under calorie budgets; retrying without calorie targets"
            );
            pools = self.fetch_pools(profile, None).await?;
        }
        let missing = pools.missing_mandatory();
        if !missing.is_empty() {
            return Err(AppError::InsufficientMeals {
                missing,
                pool_sizes: pools.sizes(),
            });
        }

        let days = self.assemble_days(&pools, start_date, duration, rng)?;
        let adherence = Adherence::new(total_meal_count(&days));
        info!(
            duration,
            daily_calories,
            total_meals = adherence.total_meals,
            pools = ?pools.sizes(),
            relaxed = ?pools.relaxed,
            "plan generated"
        );

        Ok(NewPlan {
            user_id: profile.user_id,
            name: format!("Meal plan from {start_date}"),
            start_date,
            days,
            target_nutrition: macro_targets(daily_calories, &cfg.macro_split),
            adherence,
        })
    }

    async fn fetch_pools(
        &self,
        profile: &UserProfile,
        budgets: Option<&SlotBudgets>,
    ) -> Result<MealPools, AppError> {
        let selector = MealSelector::new(self.meals, self.config.calorie_tolerance);
        let mut pools = MealPools::default();
        for meal_type in MealType::ALL.iter().copied() {
            let target = budgets.map(|b| b.for_type(meal_type));
            let selection = selector.select(profile, meal_type, target).await?;
            match selection.tier {
                _ if selection.is_empty() => debug!(%meal_type, "no candidates at any tier"),
                Some(tier) if tier != SelectionTier::Strict => {
                    pools.relaxed.push((meal_type, tier));
                }
                _ => {}
            }
            *pools.pool_mut(meal_type) = selection.meals;
        }
        Ok(pools)
    }

    fn assemble_days<R>(
        &self,
        pools: &MealPools,
        start_date: Date,
        duration: u32,
        rng: &mut R,
    ) -> Result<Vec<Day>, AppError>
    where
        R: Rng + ?Sized,
    {
        (0..duration)
            .map(|offset| {
                let date = start_date
                    .checked_add(Duration::days(i64::from(offset)))
                    .ok_or_else(|| AppError::validation("plan runs past the supported calendar"))?;
                Ok(Day {
                    date,
                    breakfast: draw_slot(&pools.breakfast, rng)?,
                    lunch: draw_slot(&pools.lunch, rng)?,
                    dinner: draw_slot(&pools.dinner, rng)?,
                    snacks: self.draw_snacks(&pools.snack, rng),
                })
            })
            .collect()
    }

    fn draw_snacks<R>(&self, pool: &[Meal], rng: &mut R) -> Vec<MealSlot>
    where
        R: Rng + ?Sized,
    {
        if pool.is_empty() {
            return Vec::new();
        }
        let count = if rng.gen_bool(self.config.extra_snack_probability) {
            self.config.max_snacks_per_day
        } else {
            self.config.min_snacks_per_day
        };
        pool.choose_multiple(rng, count)
            .map(|m| MealSlot::new(m.id, 1.0))
            .collect()
    }
}

fn draw_slot<R>(pool: &[Meal], rng: &mut R) -> Result<MealSlot, AppError>
where
    R: Rng + ?Sized,
{
    pool.choose(rng)
        .map(|m| MealSlot::new(m.id, 1.0))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("drew from an empty mandatory pool")))
}
