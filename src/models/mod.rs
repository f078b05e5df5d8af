//! Data models representing database entities and API payloads.

/// Tenant model and onboarding types
pub mod business;
/// Bookings, passengers and verification views
pub mod booking;
/// Payments and gateway wire types
pub mod payment;
/// Tour services
pub mod service;
/// Availability slots and availability checks
pub mod slot;
/// Business notification webhooks
pub mod webhook;
