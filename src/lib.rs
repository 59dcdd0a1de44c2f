// Library exports for testing
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod logger;
pub mod metrics;
pub mod models;
pub mod services;
pub mod throttle;
pub mod utils;
