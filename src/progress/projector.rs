//! Weight-trend analysis and goal completion scenarios.
//!
//! Weekly rates come from consecutive samples at least
//! [`ProjectionConfig::min_pair_gap_days`] apart; closer pairs are skipped
//! rather than merged. The realistic scenario follows the mean rate, the
//! optimistic one the mean of the most favourable rates and the conservative
//! one the damped mean.

use serde::Serialize;
use time::{Date, Duration};

use crate::{config::ProjectionConfig, progress::model::WeightSample, users::model::HealthGoal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub weeks_to_goal: f64,
    pub estimated_date: Date,
    pub weekly_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Scenarios {
    pub optimistic: Option<Scenario>,
    pub realistic: Option<Scenario>,
    pub conservative: Option<Scenario>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub health_goal: HealthGoal,
    pub start_weight: f64,
    pub current_weight: f64,
    pub target_weight: f64,
    pub total_change: f64,
    pub target_change: f64,
    pub remaining_change: f64,
    pub progress_percentage: f64,
    pub avg_weekly_change: f64,
    pub is_progressing: bool,
    /// Present only while the trend moves toward the goal faster than the
    /// flat-trend threshold.
    pub projections: Option<Scenarios>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProjection {
    pub has_goal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_data: Option<bool>,
    #[serde(flatten)]
    pub trend: Option<Trend>,
}

impl GoalProjection {
    fn no_goal() -> Self {
        Self {
            has_goal: false,
            has_data: None,
            trend: None,
        }
    }

    fn no_data() -> Self {
        Self {
            has_goal: true,
            has_data: Some(false),
            trend: None,
        }
    }
}

/// Goal fields resolved by the caller. Missing start/current weights fall back
/// to the first/last sample.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInput<'a> {
    pub samples: &'a [WeightSample],
    pub start_weight: Option<f64>,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub health_goal: HealthGoal,
}

pub struct GoalProjector<'a> {
    config: &'a ProjectionConfig,
}

impl<'a> GoalProjector<'a> {
    pub fn new(config: &'a ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn project(&self, input: &ProjectionInput<'_>, today: Date) -> GoalProjection {
        let Some(target) = input.target_weight else {
            return GoalProjection::no_goal();
        };
        let mut samples = input.samples.to_vec();
        samples.sort_by_key(|s| s.date);
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return GoalProjection::no_data();
        };

        let start = input.start_weight.unwrap_or(first.weight);
        let current = input.current_weight.unwrap_or(last.weight);
        let goal = input.health_goal;

        let total_change = current - start;
        let target_change = target - start;
        let remaining_change = target - current;
        let progress_percentage = if target_change == 0.0 {
            0.0
        } else {
            round_to(
                (total_change / target_change * 100.0).clamp(0.0, 100.0),
                1,
            )
        };

        let rates = self.weekly_rates(&samples);
        let avg = mean(&rates).unwrap_or(0.0);
        let is_progressing = match goal {
            HealthGoal::Lose => avg < 0.0,
            HealthGoal::Gain => avg > 0.0,
            HealthGoal::Maintain => false,
        };

        let projections = (is_progressing && avg.abs() > self.config.min_weekly_change).then(|| {
            let optimistic = mean(&most_favourable(
                &rates,
                goal,
                self.config.optimistic_sample,
            ));
            Scenarios {
                optimistic: optimistic.and_then(|r| scenario(remaining_change, r, today)),
                realistic: scenario(remaining_change, avg, today),
                conservative: scenario(
                    remaining_change,
                    avg * self.config.conservative_damping,
                    today,
                ),
            }
        });

        GoalProjection {
            has_goal: true,
            has_data: Some(true),
            trend: Some(Trend {
                health_goal: goal,
                start_weight: start,
                current_weight: current,
                target_weight: target,
                total_change: round_to(total_change, 1),
                target_change: round_to(target_change, 1),
                remaining_change: round_to(remaining_change, 1),
                progress_percentage,
                avg_weekly_change: round_to(avg, 2),
                is_progressing,
                projections,
            }),
        }
    }

    /// Change per week for each consecutive pair far enough apart.
    fn weekly_rates(&self, sorted: &[WeightSample]) -> Vec<f64> {
        sorted
            .windows(2)
            .filter_map(|pair| {
                let days = (pair[1].date - pair[0].date).whole_days();
                (days >= self.config.min_pair_gap_days)
                    .then(|| (pair[1].weight - pair[0].weight) * 7.0 / days as f64)
            })
            .collect()
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn most_favourable(rates: &[f64], goal: HealthGoal, n: usize) -> Vec<f64> {
    let mut sorted = rates.to_vec();
    match goal {
        HealthGoal::Gain => sorted.sort_by(|a, b| b.total_cmp(a)),
        _ => sorted.sort_by(|a, b| a.total_cmp(b)),
    }
    sorted.truncate(n);
    sorted
}

fn scenario(remaining: f64, rate: f64, today: Date) -> Option<Scenario> {
    if rate == 0.0 {
        return None;
    }
    let weeks = (remaining / rate).abs();
    let days = (weeks * 7.0).ceil() as i64;
    Some(Scenario {
        weeks_to_goal: round_to(weeks, 1),
        estimated_date: today.checked_add(Duration::days(days))?,
        weekly_rate: round_to(rate, 2),
    })
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
