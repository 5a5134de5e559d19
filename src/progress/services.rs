use time::Date;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::AppError,
    plans::services::load_profile,
    progress::{
        dto::WeightRequest,
        model::{ProgressEntry, WeightSample},
        projector::{GoalProjection, GoalProjector, ProjectionInput},
    },
    state::AppState,
};

fn new_entry(user_id: Uuid, req: WeightRequest, today: Date) -> Result<ProgressEntry, AppError> {
    if !(req.weight.is_finite() && req.weight > 0.0) {
        return Err(AppError::validation("weight must be a positive number"));
    }
    let notes = req
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    Ok(ProgressEntry::new(
        user_id,
        req.date.unwrap_or(today),
        req.weight,
        notes,
    ))
}

/// Records the weight for a day, replacing an earlier reading of that day.
#[instrument(skip(st, req))]
pub async fn log_weight(
    st: &AppState,
    user_id: Uuid,
    req: WeightRequest,
    today: Date,
) -> Result<ProgressEntry, AppError> {
    let entry = new_entry(user_id, req, today)?;
    let stored = st.progress.upsert(&entry).await?;
    info!(entry_id = %stored.id, date = %stored.date, "weight logged");
    Ok(stored)
}

/// Like [`log_weight`] but refuses to overwrite an existing reading.
#[instrument(skip(st, req))]
pub async fn record_weight(
    st: &AppState,
    user_id: Uuid,
    req: WeightRequest,
    today: Date,
) -> Result<ProgressEntry, AppError> {
    let entry = new_entry(user_id, req, today)?;
    if !st.progress.insert(&entry).await? {
        return Err(AppError::conflict(format!(
            "weight for {} already recorded",
            entry.date
        )));
    }
    info!(entry_id = %entry.id, date = %entry.date, "weight recorded");
    Ok(entry)
}

pub async fn list_progress(st: &AppState, user_id: Uuid) -> Result<Vec<ProgressEntry>, AppError> {
    st.progress.list_by_user(user_id).await
}

pub async fn delete_progress(st: &AppState, user_id: Uuid, entry_id: Uuid) -> Result<(), AppError> {
    if st.progress.delete(user_id, entry_id).await? {
        Ok(())
    } else {
        Err(AppError::not_found(format!("progress entry {entry_id}")))
    }
}

#[instrument(skip(st))]
pub async fn goal_projection(
    st: &AppState,
    user_id: Uuid,
    today: Date,
) -> Result<GoalProjection, AppError> {
    let profile = load_profile(st, user_id).await?;
    let entries = st.progress.list_by_user(user_id).await?;
    let samples: Vec<WeightSample> = entries.iter().map(WeightSample::from).collect();

    let input = ProjectionInput {
        samples: &samples,
        start_weight: entries.first().map(|e| e.weight).or(profile.current_weight),
        current_weight: entries.last().map(|e| e.weight).or(profile.current_weight),
        target_weight: profile.target_weight,
        health_goal: profile.health_goal,
    };
    let projection = GoalProjector::new(&st.config.projection).project(&input, today);
    info!(
        has_goal = projection.has_goal,
        samples = samples.len(),
        "goal projection computed"
    );
    Ok(projection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::memory::MemoryStore,
        users::model::{HealthGoal, UserProfile},
    };
    use std::sync::Arc;
    use time::macros::date;

    async fn setup(target: Option<f64>) -> (AppState, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let user_id = Uuid::new_v4();
        store
            .put_profile(UserProfile {
                user_id,
                dietary_preferences: vec![],
                allergies: vec![],
                daily_calorie_target: None,
                health_goal: HealthGoal::Lose,
                current_weight: Some(92.0),
                target_weight: target,
            })
            .await;
        (AppState::with_store(store), user_id)
    }

    fn weigh(date: Date, weight: f64) -> WeightRequest {
        WeightRequest {
            date: Some(date),
            weight,
            notes: None,
        }
    }

    #[tokio::test]
    async fn same_day_log_replaces_weight() {
        let (st, user_id) = setup(Some(80.0)).await;
        let day = date!(2024 - 05 - 01);
        let first = log_weight(&st, user_id, weigh(day, 90.0), day).await.unwrap();
        let second = log_weight(&st, user_id, weigh(day, 89.4), day).await.unwrap();

        assert_eq!(first.id, second.id);
        let entries = list_progress(&st, user_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].weight, 89.4);
    }

    #[tokio::test]
    async fn strict_record_rejects_duplicate_day() {
        let (st, user_id) = setup(Some(80.0)).await;
        let day = date!(2024 - 05 - 01);
        record_weight(&st, user_id, weigh(day, 90.0), day).await.unwrap();
        let err = record_weight(&st, user_id, weigh(day, 89.0), day).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn non_positive_weight_is_rejected() {
        let (st, user_id) = setup(Some(80.0)).await;
        let day = date!(2024 - 05 - 01);
        for weight in [0.0, -3.0, f64::NAN] {
            let err = log_weight(&st, user_id, weigh(day, weight), day).await.unwrap_err();
            assert_eq!(err.kind(), "validation_error");
        }
    }

    #[tokio::test]
    async fn date_defaults_to_today_and_list_is_ordered() {
        let (st, user_id) = setup(Some(80.0)).await;
        let today = date!(2024 - 05 - 20);
        log_weight(
            &st,
            user_id,
            WeightRequest {
                date: None,
                weight: 88.0,
                notes: Some("  after run ".into()),
            },
            today,
        )
        .await
        .unwrap();
        log_weight(&st, user_id, weigh(date!(2024 - 05 - 01), 90.0), today)
            .await
            .unwrap();

        let entries = list_progress(&st, user_id).await.unwrap();
        assert_eq!(entries[0].date, date!(2024 - 05 - 01));
        assert_eq!(entries[1].date, today);
        assert_eq!(entries[1].notes.as_deref(), Some("after run"));
    }

    #[tokio::test]
    async fn delete_only_own_entries() {
        let (st, user_id) = setup(Some(80.0)).await;
        let day = date!(2024 - 05 - 01);
        let entry = log_weight(&st, user_id, weigh(day, 90.0), day).await.unwrap();

        let err = delete_progress(&st, Uuid::new_v4(), entry.id).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        delete_progress(&st, user_id, entry.id).await.unwrap();
        assert!(list_progress(&st, user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn projection_starts_from_earliest_entry() {
        let (st, user_id) = setup(Some(75.0)).await;
        for (date, weight) in [
            (date!(2024 - 04 - 01), 90.0),
            (date!(2024 - 04 - 15), 88.0),
            (date!(2024 - 05 - 06), 85.0),
        ] {
            log_weight(&st, user_id, weigh(date, weight), date).await.unwrap();
        }

        let p = goal_projection(&st, user_id, date!(2024 - 06 - 01)).await.unwrap();
        let trend = p.trend.unwrap();
        assert_eq!(trend.start_weight, 90.0);
        assert_eq!(trend.current_weight, 85.0);
        let realistic = trend.projections.unwrap().realistic.unwrap();
        assert_eq!(realistic.weeks_to_goal, 10.0);
    }

    #[tokio::test]
    async fn projection_without_entries_reports_no_data() {
        let (st, user_id) = setup(Some(75.0)).await;
        let p = goal_projection(&st, user_id, date!(2024 - 06 - 01)).await.unwrap();
        assert!(p.has_goal);
        assert_eq!(p.has_data, Some(false));
    }

    #[tokio::test]
    async fn projection_without_target_has_no_goal() {
        let (st, user_id) = setup(None).await;
        let p = goal_projection(&st, user_id, date!(2024 - 06 - 01)).await.unwrap();
        assert!(!p.has_goal);
    }
}
