// db/notificationdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::notificationmodel::{NewNotification, Notification};

#[async_trait]
pub trait NotificationExt: Send + Sync {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, sqlx::Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, notification_type, title, message, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, notification_type, title, message, data, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.notification_type)
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.data)
        .fetch_one(&self.pool)
        .await
    }
}
