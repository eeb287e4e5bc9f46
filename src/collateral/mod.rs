pub mod model;
pub mod repository;
pub mod service;

pub use model::*;
pub use repository::{CollateralRepository, PgCollateralRepository};
pub use service::CollateralService;
