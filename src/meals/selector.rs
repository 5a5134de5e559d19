//! Tiered meal selection.
//!
//! Candidate pools are looked up under progressively weaker constraints. The
//! first tier that yields at least one meal wins. The last two tiers drop the
//! allergen exclusion: a complete plan is preferred over an empty one.

use tracing::{debug, instrument, warn};

use crate::{
    error::AppError,
    meals::{
        model::{Meal, MealType},
        repo::{CalorieRange, MealFilter, MealRepository},
    },
    users::model::UserProfile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    /// Diet, allergens and calorie window.
    Strict,
    /// Diet and allergens.
    AnyCalories,
    /// Allergens only.
    AllergenSafe,
    /// Any active meal, breakfast/lunch/dinner only.
    MandatoryAnyMeal,
    /// Any active meal of the type.
    LastResort,
}

impl SelectionTier {
    pub const ALL: [SelectionTier; 5] = [
        SelectionTier::Strict,
        SelectionTier::AnyCalories,
        SelectionTier::AllergenSafe,
        SelectionTier::MandatoryAnyMeal,
        SelectionTier::LastResort,
    ];

    pub fn ignores_allergies(&self) -> bool {
        matches!(self, Self::MandatoryAnyMeal | Self::LastResort)
    }

    /// Catalog filter for this tier, or `None` when the tier does not apply.
    pub fn filter(
        &self,
        profile: &UserProfile,
        meal_type: MealType,
        calorie_range: Option<CalorieRange>,
    ) -> Option<MealFilter> {
        let mut filter = MealFilter::new(meal_type);
        let preferences = (!profile.dietary_preferences.is_empty())
            .then(|| profile.dietary_preferences.clone());
        let allergies = (!profile.allergies.is_empty()).then(|| profile.allergies.clone());

        match self {
            Self::Strict => {
                filter.dietary_tags = preferences;
                filter.excluded_allergens = allergies;
                filter.calorie_range = calorie_range;
            }
            Self::AnyCalories => {
                filter.dietary_tags = preferences;
                filter.excluded_allergens = allergies;
            }
            Self::AllergenSafe => {
                filter.excluded_allergens = allergies;
            }
            Self::MandatoryAnyMeal => {
                if !meal_type.is_mandatory() {
                    return None;
                }
            }
            Self::LastResort => {}
        }
        Some(filter)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Tier that produced the pool; `None` when every tier came back empty.
    pub tier: Option<SelectionTier>,
    pub meals: Vec<Meal>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }
}

pub struct MealSelector<'a> {
    repo: &'a dyn MealRepository,
    calorie_tolerance: f64,
}

impl<'a> MealSelector<'a> {
    pub fn new(repo: &'a dyn MealRepository, calorie_tolerance: f64) -> Self {
        Self {
            repo,
            calorie_tolerance,
        }
    }

    /// Returns the first non-empty pool. An empty selection is not an error;
    /// only storage failures are.
    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    pub async fn select(
        &self,
        profile: &UserProfile,
        meal_type: MealType,
        target_calories: Option<f64>,
    ) -> Result<Selection, AppError> {
        let range = target_calories.map(|t| CalorieRange::around(t, self.calorie_tolerance));

        for tier in SelectionTier::ALL {
            let Some(filter) = tier.filter(profile, meal_type, range) else {
                continue;
            };
            let meals = self.repo.find_by_filter(&filter).await?;
            if meals.is_empty() {
                debug!(?tier, %meal_type, "tier empty, relaxing");
                continue;
            }
            if tier.ignores_allergies() && !profile.allergies.is_empty() {
                warn!(
                    ?tier,
                    %meal_type,
                    allergies = ?profile.allergies,
                    "no allergen-safe meal available; allergy exclusion dropped"
                );
            }
            debug!(?tier, %meal_type, pool = meals.len(), "pool selected");
            return Ok(Selection {
                tier: Some(tier),
                meals,
            });
        }

        debug!(%meal_type, "catalog has no active meal of this type");
        Ok(Selection::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        meals::model::{Allergen, DietaryTag},
        nutrition::Nutrition,
        store::memory::MemoryStore,
        users::model::HealthGoal,
    };
    use uuid::Uuid;

    fn profile(prefs: Vec<DietaryTag>, allergies: Vec<Allergen>) -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            dietary_preferences: prefs,
            allergies,
            daily_calorie_target: None,
            health_goal: HealthGoal::Maintain,
            current_weight: None,
            target_weight: None,
        }
    }

    fn meal(
        meal_type: MealType,
        calories: f64,
        tags: Vec<DietaryTag>,
        allergens: Vec<Allergen>,
    ) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            name: format!("{meal_type} {calories}"),
            meal_type,
            nutrition: Nutrition {
                calories,
                ..Nutrition::default()
            },
            dietary_tags: tags,
            allergens,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn nut_allergy_breakfast_only_found_at_mandatory_tier() {
        let store = MemoryStore::default();
        store
            .add_meals([
                meal(MealType::Breakfast, 400.0, vec![DietaryTag::Vegan], vec![Allergen::Nuts]),
                meal(MealType::Breakfast, 550.0, vec![], vec![Allergen::Nuts, Allergen::Dairy]),
            ])
            .await;
        let p = profile(vec![DietaryTag::Vegan], vec![Allergen::Nuts]);
        let range = Some(CalorieRange::around(500.0, 0.35));

        for tier in &SelectionTier::ALL[..3] {
            let filter = tier.filter(&p, MealType::Breakfast, range).unwrap();
            let pool = store.find_by_filter(&filter).await.unwrap();
            assert!(pool.is_empty(), "{tier:?} should be empty");
        }

        let selector = MealSelector::new(&store, 0.35);
        let selection = selector
            .select(&p, MealType::Breakfast, Some(500.0))
            .await
            .unwrap();
        assert_eq!(selection.tier, Some(SelectionTier::MandatoryAnyMeal));
        assert_eq!(selection.meals.len(), 2);
    }

    #[tokio::test]
    async fn strict_tier_respects_calorie_window() {
        let store = MemoryStore::default();
        store
            .add_meals([
                meal(MealType::Lunch, 700.0, vec![], vec![]),
                meal(MealType::Lunch, 1500.0, vec![], vec![]),
            ])
            .await;
        let selector = MealSelector::new(&store, 0.35);
        let selection = selector
            .select(&profile(vec![], vec![]), MealType::Lunch, Some(700.0))
            .await
            .unwrap();
        assert_eq!(selection.tier, Some(SelectionTier::Strict));
        assert_eq!(selection.meals.len(), 1);
        assert_eq!(selection.meals[0].nutrition.calories, 700.0);
    }

    #[tokio::test]
    async fn calorie_window_dropped_before_diet() {
        let store = MemoryStore::default();
        store
            .add_meals([
                meal(MealType::Dinner, 1200.0, vec![DietaryTag::Keto], vec![]),
                meal(MealType::Dinner, 700.0, vec![DietaryTag::Vegan], vec![]),
            ])
            .await;
        let selector = MealSelector::new(&store, 0.35);
        let selection = selector
            .select(&profile(vec![DietaryTag::Keto], vec![]), MealType::Dinner, Some(700.0))
            .await
            .unwrap();
        assert_eq!(selection.tier, Some(SelectionTier::AnyCalories));
        assert_eq!(selection.meals[0].dietary_tags, vec![DietaryTag::Keto]);
    }

    #[tokio::test]
    async fn diet_dropped_before_allergen_safety() {
        let store = MemoryStore::default();
        store
            .add_meals([
                meal(MealType::Lunch, 600.0, vec![DietaryTag::Vegan], vec![Allergen::Soy]),
                meal(MealType::Lunch, 600.0, vec![], vec![]),
            ])
            .await;
        let selector = MealSelector::new(&store, 0.35);
        let selection = selector
            .select(
                &profile(vec![DietaryTag::Vegan], vec![Allergen::Soy]),
                MealType::Lunch,
                None,
            )
            .await
            .unwrap();
        assert_eq!(selection.tier, Some(SelectionTier::AllergenSafe));
        assert!(selection.meals[0].allergens.is_empty());
    }

    #[tokio::test]
    async fn snacks_skip_mandatory_tier_but_reach_last_resort() {
        let store = MemoryStore::default();
        store
            .add_meals([meal(MealType::Snack, 100.0, vec![], vec![Allergen::Peanuts])])
            .await;
        let p = profile(vec![], vec![Allergen::Peanuts]);
        assert!(SelectionTier::MandatoryAnyMeal
            .filter(&p, MealType::Snack, None)
            .is_none());

        let selector = MealSelector::new(&store, 0.35);
        let selection = selector.select(&p, MealType::Snack, Some(100.0)).await.unwrap();
        assert_eq!(selection.tier, Some(SelectionTier::LastResort));
        assert_eq!(selection.meals.len(), 1);
    }

    #[tokio::test]
    async fn inactive_meals_are_never_selected() {
        let store = MemoryStore::default();
        let mut hidden = meal(MealType::Breakfast, 400.0, vec![], vec![]);
        hidden.is_active = false;
        store.add_meals([hidden]).await;

        let selector = MealSelector::new(&store, 0.35);
        let selection = selector
            .select(&profile(vec![], vec![]), MealType::Breakfast, None)
            .await
            .unwrap();
        assert!(selection.is_empty());
        assert_eq!(selection.tier, None);
    }
}
