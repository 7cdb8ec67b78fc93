use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use ferry_core::Requester;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

pub const ROLE_CUSTOMER: &str = "CUSTOMER";
pub const ROLE_ADMIN: &str = "ADMIN";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: &str, ttl_seconds: u64) -> Self {
        let ttl = Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX / 1000));
        Self {
            sub: sub.into(),
            role: role.to_owned(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn requester(&self) -> Requester {
        if self.is_admin() {
            Requester::admin(&self.sub)
        } else {
            Requester::customer(&self.sub)
        }
    }
}

pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

/// Decode the bearer token of a request. A missing, malformed or expired
/// token is an authentication failure.
fn claims_from_headers(headers: &HeaderMap, secret: &str) -> Result<Claims, AppError> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthenticationError("Invalid or expired token".to_string()))
}

// ============================================================================
// Optional identity
// ============================================================================

/// Caller identity for routes open to anonymous users. A request without an
/// `Authorization` header is anonymous; one with a bad token is rejected.
pub struct Identity(pub Requester);

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(Identity(Requester::anonymous()));
        }
        let claims = claims_from_headers(&parts.headers, &state.auth.jwt_secret)?;
        Ok(Identity(claims.requester()))
    }
}

// ============================================================================
// Customer Authentication Middleware
// ============================================================================

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_headers(req.headers(), &state.auth.jwt_secret)?;

    if claims.role != ROLE_CUSTOMER && !claims.is_admin() {
        return Err(AppError::AuthorizationError(format!(
            "Role {} cannot hold bookings",
            claims.role
        )));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// ============================================================================
// Admin Authentication Middleware
// ============================================================================

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_headers(req.headers(), &state.auth.jwt_secret)?;

    if !claims.is_admin() {
        return Err(AppError::AuthorizationError("Admin role required".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_token_round_trip_keeps_role() {
        let token = issue_token(&Claims::new("admin", ROLE_ADMIN, 60), "secret").unwrap();
        let claims = claims_from_headers(&headers_with(&token), "secret").unwrap();

        assert!(claims.is_admin());
        assert_eq!(claims.requester(), Requester::admin("admin"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(&Claims::new("guest-1", ROLE_CUSTOMER, 60), "secret").unwrap();
        let result = claims_from_headers(&headers_with(&token), "other");
        assert!(matches!(result, Err(AppError::AuthenticationError(_))));
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let result = claims_from_headers(&HeaderMap::new(), "secret");
        assert!(matches!(result, Err(AppError::AuthenticationError(_))));
    }
}
