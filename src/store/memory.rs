use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    meals::{
        model::Meal,
        repo::{MealFilter, MealRepository},
    },
    plans::{
        model::{Plan, PlanStatus},
        repo::PlanRepository,
    },
    progress::{model::ProgressEntry, repo::ProgressRepository},
    users::{model::UserProfile, repo::ProfileRepository},
};

/// Process-local storage behind every repository trait. Backs
/// `STORAGE_BACKEND=memory` and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    meals: RwLock<HashMap<Uuid, Meal>>,
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
    plans: RwLock<HashMap<Uuid, Plan>>,
    progress: RwLock<HashMap<Uuid, ProgressEntry>>,
}

/// Catalog and profiles loaded into the memory backend at startup.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub profiles: Vec<UserProfile>,
}

impl Seed {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let seed: Seed = serde_json::from_str(raw).context("parse seed json")?;
        if let Some(bad) = seed.meals.iter().find(|m| !m.nutrition.is_non_negative()) {
            anyhow::bail!("seed meal {} has negative nutrition", bad.id);
        }
        Ok(seed)
    }

    pub async fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read seed file {path}"))?;
        Self::from_json(&raw).with_context(|| format!("load seed file {path}"))
    }
}

impl MemoryStore {
    pub async fn load_seed(&self, seed: Seed) {
        let (meals, profiles) = (seed.meals.len(), seed.profiles.len());
        self.add_meals(seed.meals).await;
        for profile in seed.profiles {
            self.put_profile(profile).await;
        }
        info!(meals, profiles, "memory store seeded");
    }

    pub async fn add_meals(&self, meals: impl IntoIterator<Item = Meal>) {
        let mut map = self.meals.write().await;
        for meal in meals {
            map.insert(meal.id, meal);
        }
    }

    pub async fn put_profile(&self, profile: UserProfile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }
}

#[async_trait]
impl MealRepository for MemoryStore {
    async fn find_by_filter(&self, filter: &MealFilter) -> Result<Vec<Meal>, AppError> {
        let mut found: Vec<Meal> = self
            .meals
            .read()
            .await
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        // HashMap order would make seeded draws irreproducible
        found.sort_by_key(|m| m.id);
        Ok(found)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Meal>, AppError> {
        let meals = self.meals.read().await;
        Ok(ids.iter().filter_map(|id| meals.get(id).cloned()).collect())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }
}

#[async_trait]
impl PlanRepository for MemoryStore {
    async fn insert(&self, plan: &Plan) -> Result<(), AppError> {
        let mut plans = self.plans.write().await;
        if plans.contains_key(&plan.id) {
            return Err(AppError::conflict(format!("plan {} already exists", plan.id)));
        }
        plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn find(&self, user_id: Uuid, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        Ok(self
            .plans
            .read()
            .await
            .get(&plan_id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<PlanStatus>,
    ) -> Result<Vec<Plan>, AppError> {
        let mut plans: Vec<Plan> = self
            .plans
            .read()
            .await
            .values()
            .filter(|p| p.user_id == user_id && status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(plans)
    }

    async fn save(&self, plan: &Plan, expected_version: i64) -> Result<bool, AppError> {
        let mut plans = self.plans.write().await;
        match plans.get_mut(&plan.id) {
            Some(stored) if stored.user_id == plan.user_id && stored.version == expected_version => {
                *stored = plan.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid, plan_id: Uuid) -> Result<bool, AppError> {
        let mut plans = self.plans.write().await;
        if plans.get(&plan_id).is_some_and(|p| p.user_id == user_id) {
            plans.remove(&plan_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn upsert(&self, entry: &ProgressEntry) -> Result<ProgressEntry, AppError> {
        let mut entries = self.progress.write().await;
        let existing = entries
            .values_mut()
            .find(|e| e.user_id == entry.user_id && e.date == entry.date);
        let stored = match existing {
            Some(e) => {
                e.weight = entry.weight;
                e.notes = entry.notes.clone();
                e.clone()
            }
            None => {
                entries.insert(entry.id, entry.clone());
                entry.clone()
            }
        };
        Ok(stored)
    }

    async fn insert(&self, entry: &ProgressEntry) -> Result<bool, AppError> {
        let mut entries = self.progress.write().await;
        if entries
            .values()
            .any(|e| e.user_id == entry.user_id && e.date == entry.date)
        {
            return Ok(false);
        }
        entries.insert(entry.id, entry.clone());
        Ok(true)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ProgressEntry>, AppError> {
        let mut list: Vec<ProgressEntry> = self
            .progress
            .read()
            .await
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|e| e.date);
        Ok(list)
    }

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, AppError> {
        let mut entries = self.progress.write().await;
        if entries.get(&entry_id).is_some_and(|e| e.user_id == user_id) {
            entries.remove(&entry_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
