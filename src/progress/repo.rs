use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{error::AppError, progress::model::ProgressEntry};

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Inserts `entry`, or replaces weight and notes of the entry already
    /// logged for the same user and day. Returns the stored row.
    async fn upsert(&self, entry: &ProgressEntry) -> Result<ProgressEntry, AppError>;

    /// Inserts `entry`; `false` when the user already has an entry that day.
    async fn insert(&self, entry: &ProgressEntry) -> Result<bool, AppError>;

    /// Oldest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ProgressEntry>, AppError>;

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, AppError>;
}

#[derive(Debug, FromRow)]
struct ProgressRow {
    id: Uuid,
    user_id: Uuid,
    date: Date,
    weight: f64,
    notes: Option<String>,
    created_at: OffsetDateTime,
}

impl From<ProgressRow> for ProgressEntry {
    fn from(r: ProgressRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            date: r.date,
            weight: r.weight,
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgProgressRepository {
    db: PgPool,
}

impl PgProgressRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn upsert(&self, entry: &ProgressEntry) -> Result<ProgressEntry, AppError> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            INSERT INTO progress_entries (id, user_id, date, weight, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, date)
            DO UPDATE SET weight = EXCLUDED.weight, notes = EXCLUDED.notes
            RETURNING id, user_id, date, weight, notes, created_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.date)
        .bind(entry.weight)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn insert(&self, entry: &ProgressEntry) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO progress_entries (id, user_id, date, weight, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, date) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.date)
        .bind(entry.weight)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ProgressEntry>, AppError> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT id, user_id, date, weight, notes, created_at
            FROM progress_entries
            WHERE user_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(ProgressEntry::from).collect())
    }

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM progress_entries WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
