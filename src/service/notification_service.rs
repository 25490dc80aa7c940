// service/notification_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::NotificationExt,
    models::{
        listingmodel::Listing,
        negotiationmodel::Negotiation,
        notificationmodel::{NewNotification, NEGOTIATION_NOTIFICATION_TYPE},
    },
    service::error::ServiceError,
};

#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationExt>,
}

impl NotificationService {
    pub fn new(notifications: Arc<dyn NotificationExt>) -> Self {
        Self { notifications }
    }

    pub async fn notify_new_offer(
        &self,
        owner_id: Uuid,
        negotiation: &Negotiation,
        listing: &Listing,
        message: Option<&str>,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            owner_id,
            "New offer received".to_string(),
            format!(
                "You received an offer of {} for \"{}\"",
                negotiation.current_price, listing.title
            ),
            serde_json::json!({
                "negotiation_id": negotiation.id,
                "new_price": negotiation.current_price,
                "message": message,
            }),
        )
        .await
    }

    pub async fn notify_counter_offer(
        &self,
        recipient_id: Uuid,
        negotiation: &Negotiation,
        listing: &Listing,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            recipient_id,
            "New counter offer".to_string(),
            format!(
                "You received a counter offer of {} for \"{}\"",
                negotiation.current_price, listing.title
            ),
            serde_json::json!({
                "negotiation_id": negotiation.id,
                "new_price": negotiation.current_price,
            }),
        )
        .await
    }

    pub async fn notify_accepted(
        &self,
        recipient_id: Uuid,
        negotiation: &Negotiation,
        listing: &Listing,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            recipient_id,
            "Offer accepted".to_string(),
            format!(
                "Your negotiation for \"{}\" was accepted at {}",
                listing.title, negotiation.current_price
            ),
            serde_json::json!({
                "negotiation_id": negotiation.id,
                "final_price": negotiation.final_price,
            }),
        )
        .await
    }

    pub async fn notify_closed(
        &self,
        recipient_id: Uuid,
        negotiation: &Negotiation,
        listing: &Listing,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            recipient_id,
            format!("Negotiation {}", negotiation.status.to_str()),
            format!(
                "The negotiation for \"{}\" was {}",
                listing.title,
                negotiation.status.to_str()
            ),
            serde_json::json!({
                "negotiation_id": negotiation.id,
                "status": negotiation.status,
            }),
        )
        .await
    }

    async fn store_notification(
        &self,
        user_id: Uuid,
        title: String,
        message: String,
        data: serde_json::Value,
    ) -> Result<(), ServiceError> {
        tracing::info!("Negotiation notification for user {}: {}", user_id, title);

        self.notifications
            .create_notification(NewNotification {
                user_id,
                notification_type: NEGOTIATION_NOTIFICATION_TYPE.to_string(),
                title,
                message,
                data: Some(data),
            })
            .await?;

        Ok(())
    }
}
