//! Availability slot model: one scheduled departure of a service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a record from the `availability_slots` table.
///
/// The database enforces `0 <= booked_count <= capacity`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Slot {
    pub id: Uuid,
    pub business_id: Uuid,
    pub service_id: Uuid,
    pub departure_at: DateTime<Utc>,
    pub capacity: i32,
    pub booked_count: i32,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    /// Seats still free. Never negative, even if a capacity edit raced a booking.
    pub fn remaining(&self) -> i32 {
        (self.capacity - self.booked_count).max(0)
    }
}

/// Request to open a new departure.
///
/// `capacity` falls back to the service's `default_capacity`.
#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub departure_at: DateTime<Utc>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCapacityRequest {
    pub capacity: i32,
}

/// Optional departure window for slot listings.
#[derive(Debug, Default, Deserialize)]
pub struct SlotRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SlotResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub departure_at: DateTime<Utc>,
    pub capacity: i32,
    pub booked_count: i32,
    pub remaining: i32,
    pub is_blocked: bool,
}

impl From<Slot> for SlotResponse {
    fn from(slot: Slot) -> Self {
        Self {
            remaining: slot.remaining(),
            id: slot.id,
            service_id: slot.service_id,
            departure_at: slot.departure_at,
            capacity: slot.capacity,
            booked_count: slot.booked_count,
            is_blocked: slot.is_blocked,
        }
    }
}

/// Public slot listing entry. Booked counts stay private.
#[derive(Debug, Serialize)]
pub struct PublicSlotResponse {
    pub id: Uuid,
    pub departure_at: DateTime<Utc>,
    pub remaining: i32,
}

impl From<Slot> for PublicSlotResponse {
    fn from(slot: Slot) -> Self {
        Self {
            remaining: slot.remaining(),
            id: slot.id,
            departure_at: slot.departure_at,
        }
    }
}

/// `GET /api/v1/public/availability?slot_id=...&pax=...`
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub slot_id: Uuid,
    pub pax: i32,
}

/// Why a slot cannot take a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    Blocked,
    Departed,
    InsufficientCapacity,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub slot_id: Uuid,
    pub available: bool,
    pub remaining: i32,
    pub reason: Option<UnavailableReason>,
}
