/// Administrator credential from environment variables
pub mod admin;

/// Application configuration loading from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;
