//! Business logic services.
//!
//! Services hold the logic that is more than a single query: transactions,
//! validation, outbound calls and rendering. Thin CRUD lives directly in the
//! handlers.

pub mod availability_service;
pub mod booking_service;
pub mod business_service;
pub mod cancellation_service;
pub mod document_service;
pub mod payment_gateway;
pub mod payment_service;
pub mod signature;
pub mod webhook_service;
