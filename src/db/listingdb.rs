// db/listingdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::listingmodel::Listing;

/// Read-only view of listing ownership.
#[async_trait]
pub trait ListingExt: Send + Sync {
    async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, sqlx::Error>;
}

#[async_trait]
impl ListingExt for DBClient {
    async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, sqlx::Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, owner_id, title, created_at
            FROM listings
            WHERE id = $1
            "#,
        )
        .bind(listing_id)
        .fetch_optional(&self.pool)
        .await
    }
}
