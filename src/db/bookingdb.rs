// db/bookingdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{
    bookingmodel::{Booking, BOOKING_STATUS_CONFIRMED},
    negotiationmodel::Negotiation,
};

#[async_trait]
pub trait BookingExt: Send + Sync {
    /// Inserts the booking for an accepted negotiation, or returns the one
    /// that already exists for it.
    async fn create_booking_for_negotiation(
        &self,
        negotiation: &Negotiation,
        owner_id: Uuid,
        price: f64,
    ) -> Result<Booking, sqlx::Error>;

    /// Accepted negotiations together with their listing owner that have no booking yet.
    async fn get_accepted_without_booking(
        &self,
        limit: i64,
    ) -> Result<Vec<(Negotiation, Uuid)>, sqlx::Error>;
}

#[derive(sqlx::FromRow)]
struct NegotiationWithOwner {
    #[sqlx(flatten)]
    negotiation: Negotiation,
    owner_id: Uuid,
}

#[async_trait]
impl BookingExt for DBClient {
    async fn create_booking_for_negotiation(
        &self,
        negotiation: &Negotiation,
        owner_id: Uuid,
        price: f64,
    ) -> Result<Booking, sqlx::Error> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, negotiation_id, listing_id, customer_id, owner_id, price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (negotiation_id)
            DO UPDATE SET negotiation_id = EXCLUDED.negotiation_id
            RETURNING id, negotiation_id, listing_id, customer_id, owner_id, price, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(negotiation.id)
        .bind(negotiation.listing_id)
        .bind(negotiation.initiator_user_id)
        .bind(owner_id)
        .bind(price)
        .bind(BOOKING_STATUS_CONFIRMED)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_accepted_without_booking(
        &self,
        limit: i64,
    ) -> Result<Vec<(Negotiation, Uuid)>, sqlx::Error> {
        let rows = sqlx::query_as::<_, NegotiationWithOwner>(
            r#"
            SELECT n.*, l.owner_id
            FROM negotiations n
            JOIN listings l ON l.id = n.listing_id
            LEFT JOIN bookings b ON b.negotiation_id = n.id
            WHERE n.status = 'accepted'
            AND b.id IS NULL
            ORDER BY n.updated_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.negotiation, row.owner_id))
            .collect())
    }
}
