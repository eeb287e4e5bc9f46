//! Route definitions for the LMS API

mod auth;
mod collateral;
mod customer;
mod loan_application;
mod loan_product;
mod user;

pub use auth::auth_routes;
pub use collateral::collateral_routes;
pub use customer::customer_routes;
pub use loan_application::loan_application_routes;
pub use loan_product::loan_product_routes;
pub use user::user_routes;
