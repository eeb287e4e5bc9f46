//! Middleware for the LMS API
//!
//! Request tracing, rate limiting, security headers and authentication.

pub mod auth;
mod rate_limiter;
mod security;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, StaffUser};
pub use rate_limiter::{client_ip, rate_limit_layer, RateLimitDecision, RateLimiter};
pub use security::{hsts_header, security_headers};
pub use tracing::{request_tracing, REQUEST_ID_HEADER};
