pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod schema; // drop-and-recreate schema tool
pub mod storage; // photo files on disk

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
