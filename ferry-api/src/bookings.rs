use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use ferry_core::{Booking, LegKind};
use ferry_order::{NewBooking, PaymentInput, SeatMap};
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, Claims, Identity};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let my_bookings = Router::new()
        .route("/v1/my/bookings", get(my_bookings))
        .route_layer(middleware::from_fn_with_state(state, customer_auth_middleware));

    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{reference}", get(get_booking).delete(cancel_booking))
        .route(
            "/v1/bookings/{reference}/seats/{leg}",
            get(seat_map).put(assign_seats),
        )
        .route("/v1/bookings/{reference}/payment", post(record_payment))
        .merge(my_bookings)
}

async fn create_booking(
    State(state): State<AppState>,
    Identity(requester): Identity,
    Json(input): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(&requester, input).await?;
    info!("Booking {} created via API", booking.reference);
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Bookings attached to a user are visible to that user and admins only.
async fn get_booking(
    State(state): State<AppState>,
    Identity(requester): Identity,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.get(&reference).await?;
    if booking.user_id.is_some() && !requester.is_admin && !booking.is_owned_by(&requester) {
        return Err(AppError::AuthorizationError(format!(
            "Booking {} belongs to another user",
            reference
        )));
    }
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Identity(requester): Identity,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel(&requester, &reference).await?))
}

async fn seat_map(
    State(state): State<AppState>,
    Identity(requester): Identity,
    Path((reference, leg)): Path<(String, String)>,
) -> Result<Json<SeatMap>, AppError> {
    let leg: LegKind = leg.parse()?;
    Ok(Json(state.bookings.seat_map(&requester, &reference, leg).await?))
}

#[derive(Debug, Deserialize)]
pub struct SeatSelection {
    pub seats: Vec<u32>,
}

async fn assign_seats(
    State(state): State<AppState>,
    Identity(requester): Identity,
    Path((reference, leg)): Path<(String, String)>,
    Json(selection): Json<SeatSelection>,
) -> Result<Json<Booking>, AppError> {
    let leg: LegKind = leg.parse()?;
    let booking = state
        .bookings
        .assign_seats(&requester, &reference, leg, &selection.seats)
        .await?;
    Ok(Json(booking))
}

async fn record_payment(
    State(state): State<AppState>,
    Identity(requester): Identity,
    Path(reference): Path<String>,
    Json(payment): Json<PaymentInput>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.record_payment(&requester, &reference, payment).await?))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.for_user(&claims.sub).await?))
}
