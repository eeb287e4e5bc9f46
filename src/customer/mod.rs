pub mod model;
pub mod repository;
pub mod service;

pub use model::*;
pub use repository::{CustomerRepository, PgCustomerRepository};
pub use service::CustomerService;
