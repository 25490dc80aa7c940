use thiserror::Error;
use uuid::Uuid;
use axum::http::StatusCode;

use crate::{
    error::{ErrorMessage, HttpError},
    models::negotiationmodel::NegotiationStatus,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Negotiation {0} not found")]
    NegotiationNotFound(Uuid),

    #[error("Listing {0} not found")]
    ListingNotFound(Uuid),

    #[error("Only listing owner can accept")]
    OnlyOwnerCanAccept,

    #[error("Not authorized to counter")]
    NotAuthorizedToCounter,

    #[error("Only the parties to a negotiation can access it")]
    NotAParty,

    #[error("Only the initiator can cancel a negotiation")]
    OnlyInitiatorCanCancel,

    #[error("You cannot negotiate on your own listing")]
    OwnListing,

    #[error("Negotiation already accepted")]
    AlreadyAccepted,

    #[error("Negotiation is no longer active")]
    NoLongerActive(NegotiationStatus),

    #[error("Negotiation has expired")]
    Expired,

    #[error("An active negotiation already exists for this listing")]
    ActiveNegotiationExists(Uuid),

    #[error("Negotiation was modified concurrently, please retry")]
    ConcurrentModification(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NegotiationNotFound(_)
            | ServiceError::ListingNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::OnlyOwnerCanAccept
            | ServiceError::NotAuthorizedToCounter
            | ServiceError::NotAParty
            | ServiceError::OnlyInitiatorCanCancel
            | ServiceError::OwnListing => StatusCode::FORBIDDEN,

            ServiceError::AlreadyAccepted
            | ServiceError::NoLongerActive(_)
            | ServiceError::Expired
            | ServiceError::ActiveNegotiationExists(_)
            | ServiceError::ConcurrentModification(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!("Negotiation request failed: {}", error);
            return HttpError::server_error(ErrorMessage::ServerError.to_string());
        }

        HttpError::new(error.to_string(), status)
    }
}
