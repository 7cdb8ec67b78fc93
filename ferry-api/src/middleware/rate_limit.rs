use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use ferry_store::redis_repo::rate_limit_key;
use serde_json::json;
use std::net::SocketAddr;

use crate::state::AppState;

pub const REQUESTS_PER_WINDOW: i64 = 100;
pub const WINDOW_SECONDS: i64 = 60;

/// Fixed-window limit per client IP. Fails open when Redis is missing or
/// errors, and when the peer address is unknown.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (Some(redis), Some(ConnectInfo(addr))) = (
        state.redis.as_ref(),
        req.extensions().get::<ConnectInfo<SocketAddr>>().cloned(),
    ) else {
        return next.run(req).await;
    };

    let key = rate_limit_key(&addr.ip().to_string());
    match redis.check_rate_limit(&key, REQUESTS_PER_WINDOW, WINDOW_SECONDS).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded" })),
        )
            .into_response(),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
