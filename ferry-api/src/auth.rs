use axum::{
    extract::State,
    Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::{
    error::AppError,
    middleware::auth::{issue_token, Claims, ROLE_ADMIN, ROLE_CUSTOMER},
    state::AppState,
};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct AdminLogin {
    username: String,
    password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/guest", post(login_guest))
        .route("/admin", post(login_admin))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let claims = Claims::new(
        format!("guest-{}", Uuid::new_v4()),
        ROLE_CUSTOMER,
        state.auth.jwt_expiration_seconds,
    );
    let token = issue_token(&claims, &state.auth.jwt_secret)?;

    Ok(Json(AuthResponse { token, role: claims.role }))
}

async fn login_admin(
    State(state): State<AppState>,
    Json(login): Json<AdminLogin>,
) -> Result<Json<AuthResponse>, AppError> {
    if login.username != state.auth.admin_username || login.password != state.auth.admin_password {
        tracing::warn!("Rejected admin login for {}", login.username);
        return Err(AppError::AuthenticationError("Invalid credentials".to_string()));
    }

    let claims = Claims::new(login.username, ROLE_ADMIN, state.auth.jwt_expiration_seconds);
    let token = issue_token(&claims, &state.auth.jwt_secret)?;
    tracing::info!("Admin {} signed in", claims.sub);

    Ok(Json(AuthResponse { token, role: claims.role }))
}
