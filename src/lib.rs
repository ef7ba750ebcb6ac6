pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod stats;
pub mod workflow;
