use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, nutrition::Nutrition};

/// Declares a snake_case label enum with `as_str`, `Display` and `FromStr`.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(AppError::validation(format!(
                        concat!("unknown ", stringify!($name), " {:?}"),
                        other
                    ))),
                }
            }
        }
    };
}

label_enum!(MealType {
    Breakfast => "breakfast",
    Lunch => "lunch",
    Dinner => "dinner",
    Snack => "snack",
});

label_enum!(DietaryTag {
    Vegetarian => "vegetarian",
    Vegan => "vegan",
    Pescatarian => "pescatarian",
    GlutenFree => "gluten_free",
    DairyFree => "dairy_free",
    Keto => "keto",
    Paleo => "paleo",
    LowCarb => "low_carb",
    HighProtein => "high_protein",
    Halal => "halal",
    Kosher => "kosher",
});

label_enum!(Allergen {
    Nuts => "nuts",
    Peanuts => "peanuts",
    Dairy => "dairy",
    Eggs => "eggs",
    Soy => "soy",
    Gluten => "gluten",
    Fish => "fish",
    Shellfish => "shellfish",
    Sesame => "sesame",
});

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    /// Breakfast, lunch and dinner: exactly one of each per plan day.
    pub const MANDATORY: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    pub fn is_mandatory(&self) -> bool {
        !matches!(self, MealType::Snack)
    }
}

/// Catalog meal. Read-only from the planner's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub meal_type: MealType,
    pub nutrition: Nutrition,
    #[serde(default)]
    pub dietary_tags: Vec<DietaryTag>,
    #[serde(default)]
    pub allergens: Vec<Allergen>,
    pub is_active: bool,
}
