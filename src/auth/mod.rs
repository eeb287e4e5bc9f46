//! Authentication module for the LMS server
//!
//! - Email/password registration and login with bcrypt hashes
//! - JWT access and refresh token generation and validation
//! - Revocable sessions keyed by the access token id

mod jwt;
mod password;
pub mod repository;
mod service;

pub use jwt::{generate_access_token, generate_refresh_token, verify_token, Claims, JwtError};
pub use password::{hash_password, verify_password};
pub use repository::{PgSessionRepository, PgUserRepository, SessionRepository, UserRepository};
pub use service::{AuthService, AuthSettings, ProfileResponse};
