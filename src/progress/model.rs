use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One weight measurement. At most one entry exists per user and calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub weight: f64,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ProgressEntry {
    pub fn new(user_id: Uuid, date: Date, weight: f64, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            weight,
            notes,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub date: Date,
    pub weight: f64,
}

impl From<&ProgressEntry> for WeightSample {
    fn from(e: &ProgressEntry) -> Self {
        Self {
            date: e.date,
            weight: e.weight,
        }
    }
}
