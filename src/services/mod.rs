//! Cross-cutting business logic: loan arithmetic and dashboard aggregates

pub mod calculator;
mod dashboard;

pub use dashboard::{CustomerDashboard, DashboardService, DashboardStats, StaffDashboard};
