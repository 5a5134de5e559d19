use serde::Deserialize;
use time::Date;

#[derive(Debug, Clone, Deserialize)]
pub struct WeightRequest {
    /// Defaults to today (UTC).
    pub date: Option<Date>,
    pub weight: f64,
    pub notes: Option<String>,
}
