use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use ferry_catalog::{Availability, AvailabilityOverview};
use ferry_core::{parse_date, DepartureTime, Route, TripKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/prices", get(quote_price))
        .route("/v1/times", get(available_times))
        .route("/v1/availability", get(remaining_seats))
        .route("/v1/availability/overview", get(availability_overview))
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Serialize)]
pub struct PriceQuote {
    pub origin: String,
    pub destination: String,
    pub price: Decimal,
}

async fn quote_price(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<PriceQuote>, AppError> {
    let price = state.config.quote(&query.origin, &query.destination).await?;
    Ok(Json(PriceQuote {
        origin: query.origin,
        destination: query.destination,
        price,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TimesQuery {
    pub origin: String,
    pub destination: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct AvailableTimes {
    pub route: Route,
    pub date: NaiveDate,
    pub times: Vec<DepartureTime>,
}

async fn available_times(
    State(state): State<AppState>,
    Query(query): Query<TimesQuery>,
) -> Result<Json<AvailableTimes>, AppError> {
    let route = Route::parse(&query.origin, &query.destination)?;
    let date = parse_date(&query.date)?;
    let times = state.schedules.times_for(&route, date).await?;

    Ok(Json(AvailableTimes { route, date, times }))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub time: String,
}

async fn remaining_seats(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, AppError> {
    let trip = TripKey::new(
        Route::parse(&query.origin, &query.destination)?,
        parse_date(&query.date)?,
        query.time.parse()?,
    );
    Ok(Json(state.capacity.availability(&trip).await?))
}

async fn availability_overview(
    State(state): State<AppState>,
) -> Result<Json<AvailabilityOverview>, AppError> {
    let today = state.clock.today();
    Ok(Json(state.schedules.availability_overview(today).await?))
}
