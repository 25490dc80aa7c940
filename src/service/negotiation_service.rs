// service/negotiation_service.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::MAX_NEGOTIATION_EXPIRY_DAYS,
    db::{ListingExt, NegotiationExt},
    models::{
        bookingmodel::Booking,
        listingmodel::Listing,
        negotiationmodel::{
            HistoryEntry, HistoryEntryType, Negotiation, NegotiationHistory, NegotiationStatus,
        },
    },
    service::{
        booking_service::BookingService, error::ServiceError,
        notification_service::NotificationService,
    },
};

/// Attempts at the read-validate-write cycle before giving up on a contended row.
const MAX_WRITE_ATTEMPTS: usize = 3;
const OVERDUE_BATCH: i64 = 200;

#[derive(Debug, Serialize)]
pub struct AcceptOutcome {
    pub negotiation: Negotiation,
    /// `None` when the booking could not be created right away; the
    /// reconciliation job retries it.
    pub booking: Option<Booking>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Closing {
    Reject,
    Cancel,
}

#[derive(Clone)]
pub struct NegotiationService {
    negotiations: Arc<dyn NegotiationExt>,
    listings: Arc<dyn ListingExt>,
    notification_service: Arc<NotificationService>,
    booking_service: Arc<BookingService>,
    expiry_window: Duration,
}

impl NegotiationService {
    pub fn new(
        negotiations: Arc<dyn NegotiationExt>,
        listings: Arc<dyn ListingExt>,
        notification_service: Arc<NotificationService>,
        booking_service: Arc<BookingService>,
        expiry_days: i64,
    ) -> Self {
        Self {
            negotiations,
            listings,
            notification_service,
            booking_service,
            expiry_window: Duration::days(expiry_days.clamp(1, MAX_NEGOTIATION_EXPIRY_DAYS)),
        }
    }

    pub async fn create(
        &self,
        actor: Uuid,
        listing_id: Uuid,
        price: f64,
        message: Option<String>,
    ) -> Result<Negotiation, ServiceError> {
        ensure_valid_price(price)?;

        let listing = self
            .listings
            .get_listing(listing_id)
            .await?
            .ok_or(ServiceError::ListingNotFound(listing_id))?;

        if listing.owner_id == actor {
            return Err(ServiceError::OwnListing);
        }

        if let Some(existing) = self
            .negotiations
            .find_active_negotiation(listing_id, actor)
            .await?
        {
            return Err(ServiceError::ActiveNegotiationExists(existing.id));
        }

        let now = Utc::now();
        let created = self
            .negotiations
            .create_negotiation(&Negotiation {
                id: Uuid::new_v4(),
                listing_id,
                initiator_user_id: actor,
                current_price: price,
                final_price: None,
                status: NegotiationStatus::Pending,
                history: NegotiationHistory::new(),
                expires_at: deadline(now, self.expiry_window)?,
                version: 0,
                created_at: now,
                updated_at: now,
            })
            .await;

        // A concurrent create for the same pair lands on the one-active index.
        let negotiation = match created {
            Ok(negotiation) => negotiation,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return match self
                    .negotiations
                    .find_active_negotiation(listing_id, actor)
                    .await?
                {
                    Some(existing) => Err(ServiceError::ActiveNegotiationExists(existing.id)),
                    None => Err(ServiceError::Database(sqlx::Error::Database(db_err))),
                };
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Negotiation {} opened by {} on listing {} at {}",
            negotiation.id,
            actor,
            listing_id,
            price
        );

        let message = normalize_message(message);
        if let Err(e) = self
            .notification_service
            .notify_new_offer(listing.owner_id, &negotiation, &listing, message.as_deref())
            .await
        {
            tracing::warn!("Failed to notify owner of negotiation {}: {}", negotiation.id, e);
        }

        Ok(negotiation)
    }

    pub async fn accept(
        &self,
        negotiation_id: Uuid,
        actor: Uuid,
        message: Option<String>,
    ) -> Result<AcceptOutcome, ServiceError> {
        let message = normalize_message(message);
        let (negotiation, listing) = self
            .transition(negotiation_id, |current, listing, now| {
                plan_accept(current, listing, actor, message.clone(), now)
            })
            .await?;

        tracing::info!(
            "Negotiation {} accepted by {} at {:?}",
            negotiation.id,
            actor,
            negotiation.final_price
        );

        let booking = match self
            .booking_service
            .create_from_negotiation(&negotiation, listing.owner_id)
            .await
        {
            Ok(booking) => Some(booking),
            Err(e) => {
                tracing::error!(
                    "Negotiation {} accepted but booking creation failed: {}",
                    negotiation.id,
                    e
                );
                None
            }
        };

        let recipient = negotiation.counter_party(actor, listing.owner_id);
        if let Err(e) = self
            .notification_service
            .notify_accepted(recipient, &negotiation, &listing)
            .await
        {
            tracing::warn!("Failed to notify {} of acceptance: {}", recipient, e);
        }

        Ok(AcceptOutcome { negotiation, booking })
    }

    pub async fn counter(
        &self,
        negotiation_id: Uuid,
        actor: Uuid,
        price: f64,
        message: Option<String>,
    ) -> Result<Negotiation, ServiceError> {
        let message = normalize_message(message);
        let window = self.expiry_window;
        let (negotiation, listing) = self
            .transition(negotiation_id, |current, listing, now| {
                plan_counter(current, listing, actor, price, message.clone(), now, window)
            })
            .await?;

        tracing::info!(
            "Negotiation {} countered by {} at {}",
            negotiation.id,
            actor,
            price
        );

        let recipient = negotiation.counter_party(actor, listing.owner_id);
        if let Err(e) = self
            .notification_service
            .notify_counter_offer(recipient, &negotiation, &listing)
            .await
        {
            tracing::warn!("Failed to notify {} of counter offer: {}", recipient, e);
        }

        Ok(negotiation)
    }

    pub async fn reject(
        &self,
        negotiation_id: Uuid,
        actor: Uuid,
        message: Option<String>,
    ) -> Result<Negotiation, ServiceError> {
        self.close(negotiation_id, actor, Closing::Reject, message).await
    }

    pub async fn cancel(
        &self,
        negotiation_id: Uuid,
        actor: Uuid,
        message: Option<String>,
    ) -> Result<Negotiation, ServiceError> {
        self.close(negotiation_id, actor, Closing::Cancel, message).await
    }

    pub async fn get(&self, negotiation_id: Uuid, actor: Uuid) -> Result<Negotiation, ServiceError> {
        let (negotiation, listing) = self.load(negotiation_id).await?;
        if !negotiation.is_party(actor, listing.owner_id) {
            return Err(ServiceError::NotAParty);
        }
        Ok(negotiation)
    }

    pub async fn list_for_user(
        &self,
        actor: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Negotiation>, ServiceError> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;
        Ok(self
            .negotiations
            .get_user_negotiations(actor, limit as i64, offset)
            .await?)
    }

    /// Flips every active negotiation whose deadline has passed to `expired`.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let overdue = self
            .negotiations
            .get_overdue_negotiations(now, OVERDUE_BATCH)
            .await?;

        let mut expired = 0;
        for negotiation in overdue {
            if self.mark_expired(&negotiation, now).await? {
                expired += 1;
            }
        }

        Ok(expired)
    }

    async fn close(
        &self,
        negotiation_id: Uuid,
        actor: Uuid,
        closing: Closing,
        message: Option<String>,
    ) -> Result<Negotiation, ServiceError> {
        let message = normalize_message(message);
        let (negotiation, listing) = self
            .transition(negotiation_id, |current, listing, now| {
                plan_close(current, listing, actor, closing, message.clone(), now)
            })
            .await?;

        tracing::info!(
            "Negotiation {} {} by {}",
            negotiation.id,
            negotiation.status.to_str(),
            actor
        );

        let recipient = negotiation.counter_party(actor, listing.owner_id);
        if let Err(e) = self
            .notification_service
            .notify_closed(recipient, &negotiation, &listing)
            .await
        {
            tracing::warn!("Failed to notify {} of closed negotiation: {}", recipient, e);
        }

        Ok(negotiation)
    }

    /// Resolves the negotiation and, through the listing store, its owner.
    async fn load(&self, negotiation_id: Uuid) -> Result<(Negotiation, Listing), ServiceError> {
        let negotiation = self
            .negotiations
            .get_negotiation(negotiation_id)
            .await?
            .ok_or(ServiceError::NegotiationNotFound(negotiation_id))?;

        let listing = self
            .listings
            .get_listing(negotiation.listing_id)
            .await?
            .ok_or(ServiceError::NegotiationNotFound(negotiation_id))?;

        Ok((negotiation, listing))
    }

    async fn transition<F>(
        &self,
        negotiation_id: Uuid,
        plan: F,
    ) -> Result<(Negotiation, Listing), ServiceError>
    where
        F: Fn(&Negotiation, &Listing, DateTime<Utc>) -> Result<Negotiation, ServiceError> + Send + Sync,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (current, listing) = self.load(negotiation_id).await?;
            let now = Utc::now();

            let updated = match plan(&current, &listing, now) {
                Ok(updated) => updated,
                Err(ServiceError::Expired) => {
                    self.mark_expired(&current, now).await?;
                    return Err(ServiceError::Expired);
                }
                Err(e) => return Err(e),
            };

            if let Some(saved) = self
                .negotiations
                .update_negotiation(&updated, current.version)
                .await?
            {
                return Ok((saved, listing));
            }

            tracing::warn!(
                "Negotiation {} changed underneath us (attempt {}/{})",
                negotiation_id,
                attempt,
                MAX_WRITE_ATTEMPTS
            );
        }

        Err(ServiceError::ConcurrentModification(negotiation_id))
    }

    async fn mark_expired(&self, current: &Negotiation, now: DateTime<Utc>) -> Result<bool, ServiceError> {
        let mut expired = current.clone();
        expired.status = NegotiationStatus::Expired;
        expired.updated_at = now;

        let flipped = self
            .negotiations
            .update_negotiation(&expired, current.version)
            .await?
            .is_some();

        if flipped {
            tracing::info!("Negotiation {} expired at {}", current.id, current.expires_at);
        }

        Ok(flipped)
    }
}

fn normalize_message(message: Option<String>) -> Option<String> {
    message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

fn ensure_valid_price(price: f64) -> Result<(), ServiceError> {
    if !price.is_finite() {
        return Err(ServiceError::Validation("price must be a finite number".to_string()));
    }
    Ok(())
}

fn deadline(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>, ServiceError> {
    now.checked_add_signed(window).ok_or_else(|| {
        ServiceError::Validation("negotiation deadline is out of range".to_string())
    })
}

fn ensure_open(current: &Negotiation, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if current.status.is_terminal() {
        return Err(ServiceError::NoLongerActive(current.status));
    }
    if current.is_expired_at(now) {
        return Err(ServiceError::Expired);
    }
    Ok(())
}

fn plan_accept(
    current: &Negotiation,
    listing: &Listing,
    actor: Uuid,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<Negotiation, ServiceError> {
    // Accepting is always the owner agreeing to the price on the table,
    // whoever put it there.
    if actor != listing.owner_id {
        return Err(ServiceError::OnlyOwnerCanAccept);
    }
    if current.status == NegotiationStatus::Accepted {
        return Err(ServiceError::AlreadyAccepted);
    }
    ensure_open(current, now)?;

    let mut next = current.clone();
    next.history.append(HistoryEntry {
        entry_type: HistoryEntryType::Accepted,
        user_id: actor,
        price: current.current_price,
        message,
        timestamp: now,
    });
    next.status = NegotiationStatus::Accepted;
    next.final_price = Some(current.current_price);
    next.updated_at = now;
    Ok(next)
}

fn plan_counter(
    current: &Negotiation,
    listing: &Listing,
    actor: Uuid,
    price: f64,
    message: Option<String>,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<Negotiation, ServiceError> {
    if !current.is_party(actor, listing.owner_id) {
        return Err(ServiceError::NotAuthorizedToCounter);
    }
    if !current.status.is_active() {
        return Err(ServiceError::NoLongerActive(current.status));
    }
    ensure_valid_price(price)?;
    ensure_open(current, now)?;

    let mut next = current.clone();
    next.history.append(HistoryEntry {
        entry_type: HistoryEntryType::CounterOffer,
        user_id: actor,
        price,
        message,
        timestamp: now,
    });
    next.current_price = price;
    next.status = NegotiationStatus::Countered;
    next.expires_at = deadline(now, window)?;
    next.updated_at = now;
    Ok(next)
}

fn plan_close(
    current: &Negotiation,
    listing: &Listing,
    actor: Uuid,
    closing: Closing,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<Negotiation, ServiceError> {
    if !current.is_party(actor, listing.owner_id) {
        return Err(ServiceError::NotAParty);
    }
    if closing == Closing::Cancel && actor != current.initiator_user_id {
        return Err(ServiceError::OnlyInitiatorCanCancel);
    }
    ensure_open(current, now)?;

    let (entry_type, status) = match closing {
        Closing::Reject => (HistoryEntryType::Rejected, NegotiationStatus::Rejected),
        Closing::Cancel => (HistoryEntryType::Cancelled, NegotiationStatus::Cancelled),
    };

    let mut next = current.clone();
    next.history.append(HistoryEntry {
        entry_type,
        user_id: actor,
        price: current.current_price,
        message,
        timestamp: now,
    });
    next.status = status;
    next.updated_at = now;
    Ok(next)
}
