// handler/negotiation.rs
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, Path, Query, Request,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::negotiationdtos::{
        AcceptNegotiationResponseDto, CounterOfferDto, CreateNegotiationDto,
        NegotiationListResponseDto, NegotiationMessageDto, NegotiationQueryDto,
        NegotiationResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn negotiation_handler() -> Router {
    Router::new()
        .route("/", post(create_negotiation).get(get_my_negotiations))
        .route("/:negotiation_id", get(get_negotiation))
        .route("/:negotiation_id/accept", post(accept_negotiation))
        .route("/:negotiation_id/counter", post(counter_negotiation))
        .route("/:negotiation_id/reject", post(reject_negotiation))
        .route("/:negotiation_id/cancel", post(cancel_negotiation))
}

fn negotiation_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, HttpError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        HttpError::bad_request(ErrorMessage::InvalidNegotiationId.to_string())
            .with_details(serde_json::json!({ "path": rejection.body_text() }))
    })
}

const MESSAGE_BODY_LIMIT: usize = 64 * 1024;

/// Accept, reject and cancel carry only an optional message, so an empty
/// body is read as `{}`. Anything else must be valid JSON.
async fn message_body(request: Request) -> Result<NegotiationMessageDto, HttpError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MESSAGE_BODY_LIMIT)
        .await
        .map_err(|_| HttpError::bad_request(ErrorMessage::InvalidRequestBody.to_string()))?;

    let body = if bytes.is_empty() {
        NegotiationMessageDto::default()
    } else {
        let request = Request::from_parts(parts, Body::from(bytes));
        let Json(body) = Json::<NegotiationMessageDto>::from_request(request, &()).await?;
        body
    };

    body.validate().map_err(|e| HttpError::validation(&e))?;
    Ok(body)
}

pub async fn create_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    body: Result<Json<CreateNegotiationDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = body?;
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let negotiation = app_state
        .negotiation_service
        .create(auth.user.id, body.listing_id, body.price, body.message)
        .await?;

    Ok((StatusCode::CREATED, Json(NegotiationResponseDto { negotiation })))
}

pub async fn get_my_negotiations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<NegotiationQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate().map_err(|e| HttpError::validation(&e))?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(10);

    let negotiations = app_state
        .negotiation_service
        .list_for_user(auth.user.id, page, limit)
        .await?;

    Ok(Json(NegotiationListResponseDto {
        negotiations,
        page,
        limit,
    }))
}

pub async fn get_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let negotiation_id = negotiation_id(path)?;

    let negotiation = app_state
        .negotiation_service
        .get(negotiation_id, auth.user.id)
        .await?;

    Ok(Json(NegotiationResponseDto { negotiation }))
}

pub async fn accept_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    path: Result<Path<Uuid>, PathRejection>,
    request: Request,
) -> Result<impl IntoResponse, HttpError> {
    let negotiation_id = negotiation_id(path)?;
    let body = message_body(request).await?;

    let outcome = app_state
        .negotiation_service
        .accept(negotiation_id, auth.user.id, body.message)
        .await?;

    let message = if outcome.booking.is_some() {
        "Negotiation accepted! Your booking has been created."
    } else {
        "Negotiation accepted! Your booking will be created shortly."
    };

    Ok(Json(AcceptNegotiationResponseDto {
        negotiation: outcome.negotiation,
        message: message.to_string(),
    }))
}

pub async fn counter_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CounterOfferDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let negotiation_id = negotiation_id(path)?;
    let Json(body) = body?;
    body.validate().map_err(|e| HttpError::validation(&e))?;

    let negotiation = app_state
        .negotiation_service
        .counter(negotiation_id, auth.user.id, body.price, body.message)
        .await?;

    Ok(Json(NegotiationResponseDto { negotiation }))
}

pub async fn reject_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    path: Result<Path<Uuid>, PathRejection>,
    request: Request,
) -> Result<impl IntoResponse, HttpError> {
    let negotiation_id = negotiation_id(path)?;
    let body = message_body(request).await?;

    let negotiation = app_state
        .negotiation_service
        .reject(negotiation_id, auth.user.id, body.message)
        .await?;

    Ok(Json(NegotiationResponseDto { negotiation }))
}

pub async fn cancel_negotiation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    path: Result<Path<Uuid>, PathRejection>,
    request: Request,
) -> Result<impl IntoResponse, HttpError> {
    let negotiation_id = negotiation_id(path)?;
    let body = message_body(request).await?;

    let negotiation = app_state
        .negotiation_service
        .cancel(negotiation_id, auth.user.id, body.message)
        .await?;

    Ok(Json(NegotiationResponseDto { negotiation }))
}
