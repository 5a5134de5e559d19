use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    meals::{
        model::{Allergen, DietaryTag, Meal, MealType},
        repo_types::MealRow,
    },
};

/// Inclusive calorie window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalorieRange {
    pub min: f64,
    pub max: f64,
}

impl CalorieRange {
    /// `target ± target·tolerance`.
    pub fn around(target: f64, tolerance: f64) -> Self {
        let spread = target * tolerance;
        Self {
            min: target - spread,
            max: target + spread,
        }
    }

    pub fn contains(&self, calories: f64) -> bool {
        calories >= self.min && calories <= self.max
    }
}

/// Catalog query. `None` on an optional constraint means "do not filter on it".
#[derive(Debug, Clone, PartialEq)]
pub struct MealFilter {
    pub meal_type: MealType,
    pub active_only: bool,
    /// Meal must carry at least one of these tags.
    pub dietary_tags: Option<Vec<DietaryTag>>,
    /// Meal must carry none of these allergens.
    pub excluded_allergens: Option<Vec<Allergen>>,
    pub calorie_range: Option<CalorieRange>,
}

impl MealFilter {
    pub fn new(meal_type: MealType) -> Self {
        Self {
            meal_type,
            active_only: true,
            dietary_tags: None,
            excluded_allergens: None,
            calorie_range: None,
        }
    }

    pub fn matches(&self, meal: &Meal) -> bool {
        if meal.meal_type != self.meal_type || (self.active_only && !meal.is_active) {
            return false;
        }
        if let Some(tags) = &self.dietary_tags {
            if !meal.dietary_tags.iter().any(|t| tags.contains(t)) {
                return false;
            }
        }
        if let Some(excluded) = &self.excluded_allergens {
            if meal.allergens.iter().any(|a| excluded.contains(a)) {
                return false;
            }
        }
        self.calorie_range
            .map_or(true, |range| range.contains(meal.nutrition.calories))
    }
}

#[async_trait]
pub trait MealRepository: Send + Sync {
    async fn find_by_filter(&self, filter: &MealFilter) -> Result<Vec<Meal>, AppError>;

    /// Meals with the given ids, active or not. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Meal>, AppError>;
}

#[derive(Clone)]
pub struct PgMealRepository {
    db: PgPool,
}

impl PgMealRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const MEAL_COLUMNS: &str = "id, name, meal_type, calories, protein_g, carbs_g, fat_g, \
     fiber_g, sugar_g, sodium_mg, dietary_tags, allergens, is_active";

fn labels<T: Copy>(items: &[T], label: impl Fn(&T) -> &'static str) -> Vec<String> {
    items.iter().map(|i| label(i).to_string()).collect()
}

fn into_meals(rows: Vec<MealRow>) -> Result<Vec<Meal>, AppError> {
    rows.into_iter()
        .map(|r| Meal::try_from(r).map_err(AppError::from))
        .collect()
}

/// Catalog query for `filter`, ordered by `id` like the memory store.
fn filter_query(filter: &MealFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    qb.push(MEAL_COLUMNS)
        .push(" FROM meals WHERE meal_type = ")
        .push_bind(filter.meal_type.as_str());
    if filter.active_only {
        qb.push(" AND is_active");
    }
    if let Some(tags) = &filter.dietary_tags {
        qb.push(" AND dietary_tags && ")
            .push_bind(labels(tags, DietaryTag::as_str));
    }
    if let Some(excluded) = &filter.excluded_allergens {
        qb.push(" AND NOT (allergens && ")
            .push_bind(labels(excluded, Allergen::as_str))
            .push(")");
    }
    if let Some(range) = filter.calorie_range {
        qb.push(" AND calories BETWEEN ")
            .push_bind(range.min)
            .push(" AND ")
            .push_bind(range.max);
    }
    qb.push(" ORDER BY id");
    qb
}

#[async_trait]
impl MealRepository for PgMealRepository {
    async fn find_by_filter(&self, filter: &MealFilter) -> Result<Vec<Meal>, AppError> {
        let mut qb = filter_query(filter);
        let rows = qb.build_query_as::<MealRow>().fetch_all(&self.db).await?;
        into_meals(rows)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Meal>, AppError> {
        let rows = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        into_meals(rows)
    }
}
