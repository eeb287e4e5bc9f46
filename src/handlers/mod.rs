//! API handlers for the LMS backend

pub mod auth;
pub mod collateral;
pub mod customer;
pub mod loan_application;
pub mod loan_product;
pub mod user;

// Re-export extractors from middleware for handler use
pub use crate::middleware::{AdminUser, AuthenticatedUser, StaffUser};
