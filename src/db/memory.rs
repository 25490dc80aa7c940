// db/memory.rs
// In-memory stand-in for Postgres used by the service and router tests.
use std::{
    borrow::Cow,
    collections::HashMap,
    error::Error as StdError,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{BookingExt, ListingExt, NegotiationExt, NotificationExt, UserExt};
use crate::models::{
    bookingmodel::{Booking, BOOKING_STATUS_CONFIRMED},
    listingmodel::Listing,
    negotiationmodel::{Negotiation, NegotiationStatus},
    notificationmodel::{NewNotification, Notification},
    usermodel::User,
};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    listings: Mutex<HashMap<Uuid, Listing>>,
    negotiations: Mutex<HashMap<Uuid, Negotiation>>,
    notifications: Mutex<Vec<Notification>>,
    bookings: Mutex<Vec<Booking>>,
    pub fail_notifications: AtomicBool,
    pub fail_bookings: AtomicBool,
    /// Number of upcoming conditional updates to refuse as if a concurrent
    /// writer had bumped the version.
    pub stale_writes: AtomicUsize,
    pub update_calls: AtomicUsize,
    /// Makes the next active-negotiation lookup miss, as if a concurrent
    /// create had not committed yet when it ran.
    pub miss_next_active_lookup: AtomicBool,
}

fn unavailable() -> sqlx::Error {
    sqlx::Error::Protocol("store unavailable".to_string())
}

/// Stand-in for the Postgres error raised by the one-active-negotiation index.
#[derive(Debug)]
struct UniqueViolation(&'static str);

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
    }
}

impl StdError for UniqueViolation {}

impl sqlx::error::DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.0)
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, name: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn add_listing(&self, owner_id: Uuid, title: &str) -> Listing {
        let listing = Listing {
            id: Uuid::new_v4(),
            owner_id,
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.listings.lock().unwrap().insert(listing.id, listing.clone());
        listing
    }

    pub fn put_negotiation(&self, negotiation: Negotiation) {
        self.negotiations
            .lock()
            .unwrap()
            .insert(negotiation.id, negotiation);
    }

    pub fn negotiation(&self, id: Uuid) -> Option<Negotiation> {
        self.negotiations.lock().unwrap().get(&id).cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

#[async_trait]
impl ListingExt for MemoryStore {
    async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, sqlx::Error> {
        Ok(self.listings.lock().unwrap().get(&listing_id).cloned())
    }
}

#[async_trait]
impl NegotiationExt for MemoryStore {
    async fn get_negotiation(&self, negotiation_id: Uuid) -> Result<Option<Negotiation>, sqlx::Error> {
        Ok(self.negotiation(negotiation_id))
    }

    async fn create_negotiation(&self, negotiation: &Negotiation) -> Result<Negotiation, sqlx::Error> {
        let mut negotiations = self.negotiations.lock().unwrap();
        let clashes = negotiation.status.is_active()
            && negotiations.values().any(|n| {
                n.listing_id == negotiation.listing_id
                    && n.initiator_user_id == negotiation.initiator_user_id
                    && n.status.is_active()
            });
        if clashes {
            return Err(sqlx::Error::Database(Box::new(UniqueViolation(
                "idx_negotiations_one_active",
            ))));
        }

        negotiations.insert(negotiation.id, negotiation.clone());
        Ok(negotiation.clone())
    }

    async fn find_active_negotiation(
        &self,
        listing_id: Uuid,
        initiator_user_id: Uuid,
    ) -> Result<Option<Negotiation>, sqlx::Error> {
        if self.miss_next_active_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }

        Ok(self
            .negotiations
            .lock()
            .unwrap()
            .values()
            .find(|n| {
                n.listing_id == listing_id
                    && n.initiator_user_id == initiator_user_id
                    && n.status.is_active()
            })
            .cloned())
    }

    async fn update_negotiation(
        &self,
        negotiation: &Negotiation,
        expected_version: i64,
    ) -> Result<Option<Negotiation>, sqlx::Error> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut negotiations = self.negotiations.lock().unwrap();
        let Some(stored) = negotiations.get_mut(&negotiation.id) else {
            return Ok(None);
        };

        let refuse = self
            .stale_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refuse {
            stored.version += 1;
            return Ok(None);
        }
        if stored.version != expected_version {
            return Ok(None);
        }

        let mut updated = negotiation.clone();
        updated.version = expected_version + 1;
        *stored = updated.clone();
        Ok(Some(updated))
    }

    async fn get_user_negotiations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Negotiation>, sqlx::Error> {
        let listings = self.listings.lock().unwrap();
        let mut found: Vec<Negotiation> = self
            .negotiations
            .lock()
            .unwrap()
            .values()
            .filter(|n| {
                n.initiator_user_id == user_id
                    || listings.get(&n.listing_id).map(|l| l.owner_id) == Some(user_id)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(found
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_overdue_negotiations(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Negotiation>, sqlx::Error> {
        Ok(self
            .negotiations
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.status.is_active() && n.expires_at <= now)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationExt for MemoryStore {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let stored = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            notification_type: notification.notification_type,
            title: notification.title,
            message: notification.message,
            data: notification.data,
            is_read: false,
            created_at: Utc::now(),
        };
        self.notifications.lock().unwrap().push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl BookingExt for MemoryStore {
    async fn create_booking_for_negotiation(
        &self,
        negotiation: &Negotiation,
        owner_id: Uuid,
        price: f64,
    ) -> Result<Booking, sqlx::Error> {
        if self.fail_bookings.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let mut bookings = self.bookings.lock().unwrap();
        if let Some(existing) = bookings.iter().find(|b| b.negotiation_id == negotiation.id) {
            return Ok(existing.clone());
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            negotiation_id: negotiation.id,
            listing_id: negotiation.listing_id,
            customer_id: negotiation.initiator_user_id,
            owner_id,
            price,
            status: BOOKING_STATUS_CONFIRMED.to_string(),
            created_at: Utc::now(),
        };
        bookings.push(booking.clone());
        Ok(booking)
    }

    async fn get_accepted_without_booking(
        &self,
        limit: i64,
    ) -> Result<Vec<(Negotiation, Uuid)>, sqlx::Error> {
        let bookings = self.bookings.lock().unwrap();
        let listings = self.listings.lock().unwrap();

        Ok(self
            .negotiations
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.status == NegotiationStatus::Accepted)
            .filter(|n| !bookings.iter().any(|b| b.negotiation_id == n.id))
            .filter_map(|n| listings.get(&n.listing_id).map(|l| (n.clone(), l.owner_id)))
            .take(limit.max(0) as usize)
            .collect())
    }
}
