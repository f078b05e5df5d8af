//! HTTP middleware components.

/// Business API key and cron secret authentication
pub mod auth;
