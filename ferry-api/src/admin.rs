use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use ferry_catalog::{RoutePrice, ScheduleListing};
use ferry_core::{parse_date, Booking, DepartureTime, Route};
use ferry_order::{DashboardStats, RevenueReport};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppError;
use crate::middleware::{admin_auth_middleware, Claims};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub days: u32,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct SetPriceRequest {
    pub origin: String,
    pub destination: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CapacityBody {
    pub capacity: u32,
}

/// A recurring entry when `date` is absent, a date-specific one otherwise.
#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub origin: String,
    pub destination: String,
    pub time: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub added: usize,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/bookings", get(list_bookings))
        .route("/v1/admin/bookings/purge", post(purge_bookings))
        .route("/v1/admin/bookings/{reference}", delete(cancel_booking))
        .route("/v1/admin/payments", get(pending_payments))
        .route("/v1/admin/payments/{reference}/confirm", post(confirm_payment))
        .route("/v1/admin/prices", get(price_table).put(set_price))
        .route("/v1/admin/capacity", put(set_capacity))
        .route("/v1/admin/schedules", get(list_schedules).post(create_schedule))
        .route("/v1/admin/schedules/recurring/{id}", delete(delete_recurring))
        .route("/v1/admin/schedules/daily/{id}", delete(delete_daily))
        .route("/v1/admin/schedules/seed", post(seed_schedules))
        .route("/v1/admin/reports", get(revenue_report))
        .route("/v1/admin/dashboard", get(dashboard))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Bookings & payments
// ============================================================================

async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list().await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel(&claims.requester(), &reference).await?))
}

async fn purge_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<PurgeResponse>, AppError> {
    let deleted = state.bookings.purge_older_than(req.days).await?;
    info!("Admin {} purged {} booking(s) older than {} days", claims.sub, deleted, req.days);
    Ok(Json(PurgeResponse { deleted }))
}

async fn pending_payments(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.pending_payments().await?))
}

async fn confirm_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.confirm_payment(&reference).await?))
}

// ============================================================================
// Prices & capacity
// ============================================================================

async fn price_table(State(state): State<AppState>) -> Json<Vec<RoutePrice>> {
    Json(state.config.price_table().await)
}

async fn set_price(
    State(state): State<AppState>,
    Json(req): Json<SetPriceRequest>,
) -> Result<Json<RoutePrice>, AppError> {
    let route = Route::parse(&req.origin, &req.destination)?;
    state.config.set_price(route, req.price).await?;
    Ok(Json(RoutePrice { route, price: req.price }))
}

async fn set_capacity(
    State(state): State<AppState>,
    Json(req): Json<CapacityBody>,
) -> Result<Json<CapacityBody>, AppError> {
    state.config.set_capacity(req.capacity).await?;
    Ok(Json(CapacityBody { capacity: req.capacity }))
}

// ============================================================================
// Schedules
// ============================================================================

async fn list_schedules(State(state): State<AppState>) -> Result<Json<ScheduleListing>, AppError> {
    Ok(Json(state.schedules.list().await?))
}

/// 201 for a new entry, 200 when an identical one already existed.
async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let route = Route::parse(&req.origin, &req.destination)?;
    let time: DepartureTime = req.time.parse()?;

    let (entry, created) = match req.date.as_deref() {
        Some(raw) => {
            let (entry, created) = state.schedules.add_daily(route, parse_date(raw)?, time).await?;
            (json!(entry), created)
        }
        None => {
            let (entry, created) = state.schedules.add_recurring(route, time).await?;
            (json!(entry), created)
        }
    };

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!({ "created": created, "schedule": entry }))))
}

async fn delete_recurring(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.schedules.delete_recurring(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_daily(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.schedules.delete_daily(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn seed_schedules(State(state): State<AppState>) -> Result<Json<SeedResponse>, AppError> {
    let added = state.schedules.seed_from_fallback().await?;
    Ok(Json(SeedResponse { added }))
}

// ============================================================================
// Reports
// ============================================================================

async fn revenue_report(State(state): State<AppState>) -> Result<Json<RevenueReport>, AppError> {
    let bookings = state.bookings.list().await?;
    Ok(Json(RevenueReport::build(&bookings, state.clock.now())))
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let bookings = state.bookings.list().await?;
    let recurring = state.schedules.list().await?.recurring.len();
    Ok(Json(DashboardStats::build(&bookings, recurring, state.clock.now())))
}
