pub mod auth;
pub mod rate_limit;

pub use auth::{admin_auth_middleware, customer_auth_middleware, Claims, Identity};
pub use rate_limit::rate_limit_middleware;
