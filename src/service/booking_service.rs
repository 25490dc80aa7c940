// service/booking_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::BookingExt,
    models::{
        bookingmodel::Booking,
        negotiationmodel::{Negotiation, NegotiationStatus},
    },
    service::error::ServiceError,
};

const RECONCILE_BATCH: i64 = 100;

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingExt>,
}

impl BookingService {
    pub fn new(bookings: Arc<dyn BookingExt>) -> Self {
        Self { bookings }
    }

    /// Idempotent: calling it twice for the same negotiation yields the same booking.
    pub async fn create_from_negotiation(
        &self,
        negotiation: &Negotiation,
        owner_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let price = match (negotiation.status, negotiation.final_price) {
            (NegotiationStatus::Accepted, Some(price)) => price,
            _ => {
                return Err(ServiceError::Validation(format!(
                    "negotiation {} has not been accepted",
                    negotiation.id
                )))
            }
        };

        let booking = self
            .bookings
            .create_booking_for_negotiation(negotiation, owner_id, price)
            .await?;

        tracing::info!(
            "Booking {} materialized for negotiation {} at {}",
            booking.id,
            negotiation.id,
            price
        );

        Ok(booking)
    }

    /// Creates the bookings that an accept left behind. Returns how many were created.
    pub async fn reconcile_missing_bookings(&self) -> Result<usize, ServiceError> {
        let pending = self.bookings.get_accepted_without_booking(RECONCILE_BATCH).await?;

        let mut created = 0;
        for (negotiation, owner_id) in pending {
            match self.create_from_negotiation(&negotiation, owner_id).await {
                Ok(_) => created += 1,
                Err(e) => tracing::error!(
                    "Failed to create booking for negotiation {}: {}",
                    negotiation.id,
                    e
                ),
            }
        }

        Ok(created)
    }
}
