pub mod api_client;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod telemetry;
pub mod ui;
