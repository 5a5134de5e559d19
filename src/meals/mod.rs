pub mod model;
pub mod repo;
mod repo_types;
pub mod selector;
