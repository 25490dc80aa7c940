// db/negotiationdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::negotiationmodel::Negotiation;

#[async_trait]
pub trait NegotiationExt: Send + Sync {
    async fn get_negotiation(&self, negotiation_id: Uuid) -> Result<Option<Negotiation>, sqlx::Error>;

    async fn create_negotiation(&self, negotiation: &Negotiation) -> Result<Negotiation, sqlx::Error>;

    async fn find_active_negotiation(
        &self,
        listing_id: Uuid,
        initiator_user_id: Uuid,
    ) -> Result<Option<Negotiation>, sqlx::Error>;

    /// Writes status, prices, history and expiry in one statement, but only if
    /// the stored row is still at `expected_version`. `None` means another
    /// writer got there first.
    async fn update_negotiation(
        &self,
        negotiation: &Negotiation,
        expected_version: i64,
    ) -> Result<Option<Negotiation>, sqlx::Error>;

    async fn get_user_negotiations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Negotiation>, sqlx::Error>;

    async fn get_overdue_negotiations(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Negotiation>, sqlx::Error>;
}

#[async_trait]
impl NegotiationExt for DBClient {
    async fn get_negotiation(&self, negotiation_id: Uuid) -> Result<Option<Negotiation>, sqlx::Error> {
        sqlx::query_as::<_, Negotiation>(
            r#"
            SELECT * FROM negotiations WHERE id = $1
            "#,
        )
        .bind(negotiation_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_negotiation(&self, negotiation: &Negotiation) -> Result<Negotiation, sqlx::Error> {
        sqlx::query_as::<_, Negotiation>(
            r#"
            INSERT INTO negotiations
                (id, listing_id, initiator_user_id, current_price, final_price, status,
                 history, expires_at, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(negotiation.id)
        .bind(negotiation.listing_id)
        .bind(negotiation.initiator_user_id)
        .bind(negotiation.current_price)
        .bind(negotiation.final_price)
        .bind(negotiation.status)
        .bind(Json(&negotiation.history))
        .bind(negotiation.expires_at)
        .bind(negotiation.version)
        .bind(negotiation.created_at)
        .bind(negotiation.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_active_negotiation(
        &self,
        listing_id: Uuid,
        initiator_user_id: Uuid,
    ) -> Result<Option<Negotiation>, sqlx::Error> {
        sqlx::query_as::<_, Negotiation>(
            r#"
            SELECT * FROM negotiations
            WHERE listing_id = $1
            AND initiator_user_id = $2
            AND status IN ('pending', 'countered')
            LIMIT 1
            "#,
        )
        .bind(listing_id)
        .bind(initiator_user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_negotiation(
        &self,
        negotiation: &Negotiation,
        expected_version: i64,
    ) -> Result<Option<Negotiation>, sqlx::Error> {
        sqlx::query_as::<_, Negotiation>(
            r#"
            UPDATE negotiations
            SET current_price = $2,
                final_price = $3,
                status = $4,
                history = $5,
                expires_at = $6,
                version = version + 1,
                updated_at = $7
            WHERE id = $1 AND version = $8
            RETURNING *
            "#,
        )
        .bind(negotiation.id)
        .bind(negotiation.current_price)
        .bind(negotiation.final_price)
        .bind(negotiation.status)
        .bind(Json(&negotiation.history))
        .bind(negotiation.expires_at)
        .bind(negotiation.updated_at)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_negotiations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Negotiation>, sqlx::Error> {
        sqlx::query_as::<_, Negotiation>(
            r#"
            SELECT n.* FROM negotiations n
            JOIN listings l ON l.id = n.listing_id
            WHERE n.initiator_user_id = $1 OR l.owner_id = $1
            ORDER BY n.updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_overdue_negotiations(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Negotiation>, sqlx::Error> {
        sqlx::query_as::<_, Negotiation>(
            r#"
            SELECT * FROM negotiations
            WHERE status IN ('pending', 'countered')
            AND expires_at <= $1
            ORDER BY expires_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
