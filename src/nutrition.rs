//! Serving scaling, aggregation and macro targets.

use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::config::MacroSplit;

/// Nutrition facts of one serving, or a sum of servings.
///
/// Calories are kcal; protein, carbohydrates, fats, fiber and sugar are grams;
/// sodium is milligrams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fats: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub sodium: f64,
}

impl Nutrition {
    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            calories: f(self.calories),
            protein: f(self.protein),
            carbohydrates: f(self.carbohydrates),
            fats: f(self.fats),
            fiber: f(self.fiber),
            sugar: f(self.sugar),
            sodium: f(self.sodium),
        }
    }

    pub fn is_non_negative(&self) -> bool {
        [
            self.calories,
            self.protein,
            self.carbohydrates,
            self.fats,
            self.fiber,
            self.sugar,
            self.sodium,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
    }
}

impl Add for Nutrition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbohydrates: self.carbohydrates + rhs.carbohydrates,
            fats: self.fats + rhs.fats,
            fiber: self.fiber + rhs.fiber,
            sugar: self.sugar + rhs.sugar,
            sodium: self.sodium + rhs.sodium,
        }
    }
}

/// Daily targets derived from a calorie budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroTargets {
    pub daily_calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fats: f64,
}

pub fn scale(nutrition: &Nutrition, servings: f64) -> Nutrition {
    nutrition.map(|v| v * servings)
}

/// Sums the scaled nutrition of every item. Items without a resolved meal add nothing.
pub fn aggregate<'a, I>(items: I) -> Nutrition
where
    I: IntoIterator<Item = (Option<&'a Nutrition>, f64)>,
{
    items
        .into_iter()
        .filter_map(|(nutrition, servings)| nutrition.map(|n| scale(n, servings)))
        .fold(Nutrition::default(), Add::add)
}

/// Elementwise mean rounded to whole numbers; `None` for an empty input.
pub fn average(days: &[Nutrition]) -> Option<Nutrition> {
    if days.is_empty() {
        return None;
    }
    let count = days.len() as f64;
    let total = days.iter().copied().fold(Nutrition::default(), Add::add);
    Some(total.map(|v| (v / count).round()))
}

pub fn macro_targets(daily_calories: f64, split: &MacroSplit) -> MacroTargets {
    MacroTargets {
        daily_calories,
        protein: (daily_calories * split.protein_ratio / split.kcal_per_gram_protein).round(),
        carbohydrates: (daily_calories * split.carbohydrate_ratio
            / split.kcal_per_gram_carbohydrate)
            .round(),
        fats: (daily_calories * split.fat_ratio / split.kcal_per_gram_fat).round(),
    }
}
