pub mod adherence;
pub mod dto;
pub mod generator;
pub mod handlers;
pub mod manual;
pub mod model;
pub mod repo;
mod repo_types;
pub mod services;
pub mod summary;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::plan_routes())
}
