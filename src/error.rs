use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::meals::model::MealType;

pub const INSUFFICIENT_MEALS_HINT: &str = "adjust dietary preferences or add meals";

/// Candidate pool size per meal type at the moment generation gave up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolSizes {
    pub breakfast: usize,
    pub lunch: usize,
    pub dinner: usize,
    pub snack: usize,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not enough meals for {}: {}", join_types(.missing), INSUFFICIENT_MEALS_HINT)]
    InsufficientMeals {
        missing: Vec<MealType>,
        pool_sizes: PoolSizes,
    },

    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn join_types(types: &[MealType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_index(msg: impl Into<String>) -> Self {
        Self::InvalidIndex(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Stable machine-readable kind, also used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::InsufficientMeals { .. } => "insufficient_meals",
            Self::InvalidIndex(_) => "invalid_index",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidIndex(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientMeals { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> serde_json::Value {
        match self {
            Self::InsufficientMeals {
                missing,
                pool_sizes,
            } => json!({
                "missingMealTypes": missing,
                "poolSizes": pool_sizes,
                "hint": INSUFFICIENT_MEALS_HINT,
            }),
            _ => serde_json::Value::Null,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(e).context("storage"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if let Self::Internal(e) = &self {
            error!(error = ?e, "internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = json!({
            "error": self.kind(),
            "message": message,
            "details": self.details(),
        });
        (status, Json(body)).into_response()
    }
}
