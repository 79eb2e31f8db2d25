pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod responses;
pub mod routes;
pub mod services;
pub mod sla;
pub mod state;
pub mod worker;

pub use state::AppState;
