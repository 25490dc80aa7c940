// dtos/negotiationdtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::negotiationmodel::Negotiation;

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct NegotiationMessageDto {
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CounterOfferDto {
    pub price: f64,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateNegotiationDto {
    pub listing_id: Uuid,
    pub price: f64,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

#[derive(Validate, Debug, Serialize, Deserialize)]
pub struct NegotiationQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NegotiationResponseDto {
    pub negotiation: Negotiation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptNegotiationResponseDto {
    pub negotiation: Negotiation,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NegotiationListResponseDto {
    pub negotiations: Vec<Negotiation>,
    pub page: u32,
    pub limit: u32,
}
