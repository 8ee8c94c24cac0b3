pub mod app;
pub mod config;
pub mod core;
pub mod models;
pub mod platform;
pub mod search;
pub mod ui;
