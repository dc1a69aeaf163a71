//! Booking endpoints: hold, confirm and read.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{BookingId, TravelId};
use domain::Booking;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_email: String,
    pub travel_id: String,
    pub selected_seats: i32,
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub user_email: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub travel_id: String,
    pub selected_seats: i32,
    pub total_price_cents: i64,
    pub status: String,
    pub expiration_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            user_id: booking.user_id.to_string(),
            travel_id: booking.travel_id.to_string(),
            selected_seats: booking.selected_seats,
            total_price_cents: booking.total_price.cents(),
            status: booking.status.to_string(),
            expiration_time: booking.expiration_time,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

// -- Handlers --

/// POST /bookings: hold seats for a user.
#[tracing::instrument(skip(state, req), fields(travel_id = %req.travel_id, seats = req.selected_seats))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let travel_id = parse_travel_id(&req.travel_id)?;

    let booking = state
        .lifecycle
        .create(&req.user_email, travel_id, req.selected_seats)
        .await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// GET /bookings?user_email=: list a user's bookings, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = state.lifecycle.list_bookings(&query.user_email).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// GET /bookings/{id}: load a booking.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.lifecycle.get_booking(booking_id).await?;
    Ok(Json(booking.into()))
}

/// POST /bookings/{id}/confirm: charge and confirm a pending booking.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.lifecycle.confirm(booking_id).await?;
    Ok(Json(booking.into()))
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    BookingId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid booking id: {e}")))
}

pub(crate) fn parse_travel_id(id: &str) -> Result<TravelId, ApiError> {
    TravelId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid travel id: {e}")))
}
