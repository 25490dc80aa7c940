// models/bookingmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BOOKING_STATUS_CONFIRMED: &str = "confirmed";

/// Materialized from an accepted negotiation. One per negotiation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub negotiation_id: Uuid,
    pub listing_id: Uuid,
    pub customer_id: Uuid,
    pub owner_id: Uuid,
    pub price: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
