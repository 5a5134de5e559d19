use std::str::FromStr;

use anyhow::anyhow;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::AppError,
    meals::model::{Meal, MealType},
    nutrition::Nutrition,
};

#[derive(Debug, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub name: String,
    pub meal_type: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub dietary_tags: Vec<String>,
    pub allergens: Vec<String>,
    pub is_active: bool,
}

// A stored label we no longer recognise is a catalog defect, not a caller error.
fn parse_stored<T: FromStr<Err = AppError>>(meal_id: Uuid, raw: &str) -> anyhow::Result<T> {
    raw.parse()
        .map_err(|e: AppError| anyhow!("meal {meal_id}: {e}"))
}

impl TryFrom<MealRow> for Meal {
    type Error = anyhow::Error;

    fn try_from(r: MealRow) -> Result<Self, Self::Error> {
        let meal_type: MealType = parse_stored(r.id, &r.meal_type)?;
        let dietary_tags = r
            .dietary_tags
            .iter()
            .map(|t| parse_stored(r.id, t))
            .collect::<anyhow::Result<_>>()?;
        let allergens = r
            .allergens
            .iter()
            .map(|a| parse_stored(r.id, a))
            .collect::<anyhow::Result<_>>()?;
        let nutrition = Nutrition {
            calories: r.calories,
            protein: r.protein_g,
            carbohydrates: r.carbs_g,
            fats: r.fat_g,
            fiber: r.fiber_g.unwrap_or_default(),
            sugar: r.sugar_g.unwrap_or_default(),
            sodium: r.sodium_mg.unwrap_or_default(),
        };
        if !nutrition.is_non_negative() {
            return Err(anyhow!("meal {}: negative nutrition values", r.id));
        }
        Ok(Self {
            id: r.id,
            name: r.name,
            meal_type,
            nutrition,
            dietary_tags,
            allergens,
            is_active: r.is_active,
        })
    }
}
