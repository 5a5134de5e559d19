use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Calorie split, macro ratios and bounds used when assembling plans.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    pub default_daily_calories: f64,
    pub breakfast_share: f64,
    pub lunch_share: f64,
    pub dinner_share: f64,
    pub snack_share: f64,
    /// Relative half-width of the calorie window used by the first selection tier.
    pub calorie_tolerance: f64,
    pub macro_split: MacroSplit,
    pub min_snacks_per_day: usize,
    pub max_snacks_per_day: usize,
    /// Probability of drawing `max_snacks_per_day` instead of the minimum.
    pub extra_snack_probability: f64,
    pub default_duration_days: u32,
    pub min_duration_days: u32,
    pub max_duration_days: u32,
    pub min_servings: f64,
    pub max_servings: f64,
}

pub const DEFAULT_DAILY_CALORIES: f64 = 2000.0;
pub const BREAKFAST_SHARE: f64 = 0.25;
pub const LUNCH_SHARE: f64 = 0.35;
pub const DINNER_SHARE: f64 = 0.35;
pub const SNACK_SHARE: f64 = 0.05;
pub const CALORIE_TOLERANCE: f64 = 0.35;
pub const EXTRA_SNACK_PROBABILITY: f64 = 0.5;

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_daily_calories: DEFAULT_DAILY_CALORIES,
            breakfast_share: BREAKFAST_SHARE,
            lunch_share: LUNCH_SHARE,
            dinner_share: DINNER_SHARE,
            snack_share: SNACK_SHARE,
            calorie_tolerance: CALORIE_TOLERANCE,
            macro_split: MacroSplit::default(),
            min_snacks_per_day: 1,
            max_snacks_per_day: 2,
            extra_snack_probability: EXTRA_SNACK_PROBABILITY,
            default_duration_days: 7,
            min_duration_days: 1,
            max_duration_days: 30,
            min_servings: 0.5,
            max_servings: 5.0,
        }
    }
}

/// Energy split between macronutrients and their energy density (kcal per gram).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MacroSplit {
    pub protein_ratio: f64,
    pub carbohydrate_ratio: f64,
    pub fat_ratio: f64,
    pub kcal_per_gram_protein: f64,
    pub kcal_per_gram_carbohydrate: f64,
    pub kcal_per_gram_fat: f64,
}

impl Default for MacroSplit {
    fn default() -> Self {
        Self {
            protein_ratio: 0.30,
            carbohydrate_ratio: 0.45,
            fat_ratio: 0.25,
            kcal_per_gram_protein: 4.0,
            kcal_per_gram_carbohydrate: 4.0,
            kcal_per_gram_fat: 9.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionConfig {
    /// Consecutive samples closer than this contribute no weekly rate.
    pub min_pair_gap_days: i64,
    /// Below this absolute weekly change the trend is treated as flat.
    pub min_weekly_change: f64,
    pub optimistic_sample: usize,
    /// Plateau damping applied to the realistic rate.
    pub conservative_damping: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            min_pair_gap_days: 7,
            min_weekly_change: 0.05,
            optimistic_sample: 3,
            conservative_damping: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    /// JSON file with `meals` and `profiles` loaded by the memory backend.
    pub seed_file: Option<String>,
    pub jwt: JwtConfig,
    pub planner: PlannerConfig,
    pub projection: ProjectionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = match std::env::var("STORAGE_BACKEND").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("postgres") | Err(_) => StorageBackend::Postgres,
            Ok(other) => anyhow::bail!("unknown STORAGE_BACKEND {other:?}"),
        };
        let database_url = match storage {
            StorageBackend::Postgres => Some(std::env::var("DATABASE_URL")?),
            StorageBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };
        let seed_file = std::env::var("SEED_FILE").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "meal-planner".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "meal-planner-users".into()),
        };

        let mut planner = PlannerConfig::default();
        if let Some(kcal) = std::env::var("PLAN_DEFAULT_DAILY_CALORIES")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| *v > 0.0)
        {
            planner.default_daily_calories = kcal;
        }

        Ok(Self {
            storage,
            database_url,
            seed_file,
            jwt,
            planner,
            projection: ProjectionConfig::default(),
        })
    }
}
