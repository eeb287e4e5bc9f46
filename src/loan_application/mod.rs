pub mod model;
pub mod repository;
pub mod service;
pub mod workflow;

pub use model::*;
pub use repository::{LoanApplicationRepository, PgLoanApplicationRepository};
pub use service::LoanApplicationService;
