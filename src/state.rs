use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    config::{AppConfig, StorageBackend},
    meals::repo::{MealRepository, PgMealRepository},
    plans::repo::{PgPlanRepository, PlanRepository},
    progress::repo::{PgProgressRepository, ProgressRepository},
    store::memory::{MemoryStore, Seed},
    users::repo::{PgProfileRepository, ProfileRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub meals: Arc<dyn MealRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.storage {
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres backend")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Ok(Self::postgres(config, db))
            }
            StorageBackend::Memory => {
                info!("using in-memory storage; data is lost on restart");
                let store = Arc::new(MemoryStore::default());
                match config.seed_file.as_deref() {
                    Some(path) => store.load_seed(Seed::from_file(path).await?).await,
                    None => warn!("SEED_FILE not set; meal catalog and profiles are empty"),
                }
                Ok(Self::in_memory(config, store))
            }
        }
    }

    pub fn postgres(config: Arc<AppConfig>, db: PgPool) -> Self {
        Self {
            config,
            meals: Arc::new(PgMealRepository::new(db.clone())),
            plans: Arc::new(PgPlanRepository::new(db.clone())),
            progress: Arc::new(PgProgressRepository::new(db.clone())),
            profiles: Arc::new(PgProfileRepository::new(db)),
        }
    }

    pub fn in_memory(config: Arc<AppConfig>, store: Arc<MemoryStore>) -> Self {
        Self {
            config,
            meals: store.clone(),
            plans: store.clone(),
            progress: store.clone(),
            profiles: store,
        }
    }

    /// Default planner settings over `store`, for tests.
    #[cfg(test)]
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        use crate::config::{JwtConfig, PlannerConfig, ProjectionConfig};

        let config = Arc::new(AppConfig {
            storage: StorageBackend::Memory,
            database_url: None,
            seed_file: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
            },
            planner: PlannerConfig::default(),
            projection: ProjectionConfig::default(),
        });
        Self::in_memory(config, store)
    }
}
