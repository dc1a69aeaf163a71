//! Travel offering endpoints, including administrative seat adjustments.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{Money, TravelOffering};
use lifecycle::LifecycleError;
use serde::{Deserialize, Serialize};
use store::Store;

use super::bookings::parse_travel_id;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTravelRequest {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub total_seats: i32,
    pub available_seats: Option<i32>,
    pub starting_date: Option<DateTime<Utc>>,
    pub ending_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct FindTravelQuery {
    pub slug: String,
}

#[derive(Deserialize)]
pub struct AdjustSeatsRequest {
    pub seats: i32,
}

// -- Response types --

#[derive(Serialize)]
pub struct TravelResponse {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub starting_date: Option<DateTime<Utc>>,
    pub ending_date: Option<DateTime<Utc>>,
    pub price_cents: i64,
    pub total_seats: i32,
    pub available_seats: i32,
    pub sold_out: bool,
}

impl From<TravelOffering> for TravelResponse {
    fn from(travel: TravelOffering) -> Self {
        let sold_out = travel.is_sold_out();
        Self {
            id: travel.id.to_string(),
            slug: travel.slug,
            name: travel.name,
            description: travel.description,
            starting_date: travel.starting_date,
            ending_date: travel.ending_date,
            price_cents: travel.price.cents(),
            total_seats: travel.total_seats,
            available_seats: travel.available_seats,
            sold_out,
        }
    }
}

// -- Handlers --

/// POST /travels: register a travel offering.
#[tracing::instrument(skip(state, req), fields(slug = %req.slug))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateTravelRequest>,
) -> Result<(StatusCode, Json<TravelResponse>), ApiError> {
    let travel = build_travel(req).map_err(LifecycleError::from)?;
    let travel = state.lifecycle.register_travel(travel).await?;
    Ok((StatusCode::CREATED, Json(travel.into())))
}

/// GET /travels/{id}: load an offering with its live seat counter.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<TravelResponse>, ApiError> {
    let travel_id = parse_travel_id(&id)?;
    let travel = state.lifecycle.get_travel(travel_id).await?;
    Ok(Json(travel.into()))
}

/// GET /travels?slug=: load an offering by its slug.
#[tracing::instrument(skip(state))]
pub async fn find_by_slug<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<FindTravelQuery>,
) -> Result<Json<TravelResponse>, ApiError> {
    let travel = state.lifecycle.get_travel_by_slug(&query.slug).await?;
    Ok(Json(travel.into()))
}

/// POST /travels/{id}/seats/increase: give seats back to an offering.
#[tracing::instrument(skip(state, req), fields(seats = req.seats))]
pub async fn increase_seats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AdjustSeatsRequest>,
) -> Result<Json<TravelResponse>, ApiError> {
    let travel_id = parse_travel_id(&id)?;
    let travel = state.lifecycle.increase_seats(travel_id, req.seats).await?;
    Ok(Json(travel.into()))
}

/// POST /travels/{id}/seats/decrease: withdraw seats from an offering.
#[tracing::instrument(skip(state, req), fields(seats = req.seats))]
pub async fn decrease_seats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AdjustSeatsRequest>,
) -> Result<Json<TravelResponse>, ApiError> {
    let travel_id = parse_travel_id(&id)?;
    let travel = state.lifecycle.decrease_seats(travel_id, req.seats).await?;
    Ok(Json(travel.into()))
}

fn build_travel(req: CreateTravelRequest) -> Result<TravelOffering, domain::BookingError> {
    let mut travel = TravelOffering::new(
        req.slug,
        req.name,
        Money::from_cents(req.price_cents),
        req.total_seats,
    )?;
    if let Some(available) = req.available_seats {
        travel = travel.with_available_seats(available)?;
    }
    if let Some(description) = req.description {
        travel = travel.with_description(description);
    }
    match (req.starting_date, req.ending_date) {
        (Some(start), Some(end)) => travel = travel.with_dates(start, end)?,
        (None, None) => {}
        _ => {
            return Err(domain::BookingError::InvalidTravel {
                reason: "starting_date and ending_date must be given together".to_string(),
            });
        }
    }
    Ok(travel)
}
