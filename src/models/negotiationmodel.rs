// models/negotiationmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "negotiation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Pending,
    Countered,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
}

impl NegotiationStatus {
    pub fn to_str(&self) -> &str {
        match self {
            NegotiationStatus::Pending => "pending",
            NegotiationStatus::Countered => "countered",
            NegotiationStatus::Accepted => "accepted",
            NegotiationStatus::Rejected => "rejected",
            NegotiationStatus::Expired => "expired",
            NegotiationStatus::Cancelled => "cancelled",
        }
    }

    /// Pending and countered negotiations are the only ones that accept writes.
    pub fn is_active(&self) -> bool {
        matches!(self, NegotiationStatus::Pending | NegotiationStatus::Countered)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEntryType {
    Accepted,
    CounterOffer,
    Rejected,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub entry_type: HistoryEntryType,
    pub user_id: Uuid,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Ordered audit trail of a negotiation. Entries are only ever added
/// through [`NegotiationHistory::append`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct NegotiationHistory(Vec<HistoryEntry>);

impl NegotiationHistory {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.last()
    }

    /// Price carried by the latest counter offer or acceptance, if any.
    pub fn latest_price(&self) -> Option<f64> {
        self.0
            .iter()
            .rev()
            .find(|entry| {
                matches!(
                    entry.entry_type,
                    HistoryEntryType::CounterOffer | HistoryEntryType::Accepted
                )
            })
            .map(|entry| entry.price)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow, PartialEq)]
pub struct Negotiation {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub initiator_user_id: Uuid,
    pub current_price: f64,
    pub final_price: Option<f64>,
    pub status: NegotiationStatus,
    #[sqlx(json)]
    pub history: NegotiationHistory,
    pub expires_at: DateTime<Utc>,
    /// Bumped on every write; updates are conditional on it.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Negotiation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_party(&self, user_id: Uuid, listing_owner_id: Uuid) -> bool {
        user_id == self.initiator_user_id || user_id == listing_owner_id
    }

    /// The party who is not `actor`.
    pub fn counter_party(&self, actor: Uuid, listing_owner_id: Uuid) -> Uuid {
        if actor == self.initiator_user_id {
            listing_owner_id
        } else {
            self.initiator_user_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(entry_type: HistoryEntryType, price: f64) -> HistoryEntry {
        HistoryEntry {
            entry_type,
            user_id: Uuid::new_v4(),
            price,
            message: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn only_pending_and_countered_are_active() {
        assert!(NegotiationStatus::Pending.is_active());
        assert!(NegotiationStatus::Countered.is_active());
        for status in [
            NegotiationStatus::Accepted,
            NegotiationStatus::Rejected,
            NegotiationStatus::Expired,
            NegotiationStatus::Cancelled,
        ] {
            assert!(status.is_terminal(), "{} should be terminal", status.to_str());
        }
    }

    #[test]
    fn latest_price_skips_rejections() {
        let mut history = NegotiationHistory::new();
        assert_eq!(history.latest_price(), None);

        history.append(entry(HistoryEntryType::CounterOffer, 90_000.0));
        history.append(entry(HistoryEntryType::Rejected, 1.0));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest_price(), Some(90_000.0));
        assert_eq!(history.last().map(|e| e.entry_type), Some(HistoryEntryType::Rejected));
    }

    #[test]
    fn history_serializes_as_plain_array() {
        let mut history = NegotiationHistory::new();
        history.append(HistoryEntry {
            entry_type: HistoryEntryType::CounterOffer,
            user_id: Uuid::nil(),
            price: 90_000.0,
            message: Some("can you do 90k?".to_string()),
            timestamp: Utc::now(),
        });

        let value = serde_json::to_value(&history).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["type"], "counter_offer");
        assert_eq!(first["price"], 90_000.0);
        assert_eq!(first["message"], "can you do 90k?");

        let back: NegotiationHistory = serde_json::from_value(value).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn counter_party_is_the_other_side() {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let negotiation = Negotiation {
            id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            initiator_user_id: Uuid::new_v4(),
            current_price: 100_000.0,
            final_price: None,
            status: NegotiationStatus::Pending,
            history: NegotiationHistory::new(),
            expires_at: now + Duration::days(7),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(negotiation.counter_party(negotiation.initiator_user_id, owner), owner);
        assert_eq!(negotiation.counter_party(owner, owner), negotiation.initiator_user_id);
        assert!(!negotiation.is_party(Uuid::new_v4(), owner));
        assert!(!negotiation.is_expired_at(now));
        assert!(negotiation.is_expired_at(now + Duration::days(8)));
    }
}
