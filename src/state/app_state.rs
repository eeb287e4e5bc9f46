//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::{AuthService, AuthSettings, PgSessionRepository, PgUserRepository};
use crate::collateral::{CollateralRepository, CollateralService, PgCollateralRepository};
use crate::config::Config;
use crate::customer::{CustomerRepository, CustomerService, PgCustomerRepository};
use crate::db::MemoryStore;
use crate::loan_application::{
    LoanApplicationRepository, LoanApplicationService, PgLoanApplicationRepository,
};
use crate::loan_product::{LoanProductRepository, LoanProductService, PgLoanProductRepository};
use crate::services::DashboardService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub customer_service: Arc<CustomerService>,
    pub loan_product_service: Arc<LoanProductService>,
    pub loan_application_service: Arc<LoanApplicationService>,
    pub collateral_service: Arc<CollateralService>,
    pub dashboard_service: Arc<DashboardService>,
    /// Pool for health checks; `None` when running on the in-memory store
    pub db: Option<PgPool>,
}

/// Repository handles the services are built from
struct Repositories {
    users: Arc<dyn crate::auth::UserRepository>,
    sessions: Arc<dyn crate::auth::SessionRepository>,
    customers: Arc<dyn CustomerRepository>,
    products: Arc<dyn LoanProductRepository>,
    applications: Arc<dyn LoanApplicationRepository>,
    collaterals: Arc<dyn CollateralRepository>,
}

impl AppState {
    /// State backed by PostgreSQL
    pub fn postgres(pool: PgPool, config: &Config) -> Self {
        Self::from_repositories(
            Repositories {
                users: Arc::new(PgUserRepository::new(pool.clone())),
                sessions: Arc::new(PgSessionRepository::new(pool.clone())),
                customers: Arc::new(PgCustomerRepository::new(pool.clone())),
                products: Arc::new(PgLoanProductRepository::new(pool.clone())),
                applications: Arc::new(PgLoanApplicationRepository::new(pool.clone())),
                collaterals: Arc::new(PgCollateralRepository::new(pool.clone())),
            },
            AuthSettings::from(config),
            Some(pool),
        )
    }

    /// State backed by a process-local store
    pub fn in_memory(store: Arc<MemoryStore>, settings: AuthSettings) -> Self {
        Self::from_repositories(
            Repositories {
                users: store.clone(),
                sessions: store.clone(),
                customers: store.clone(),
                products: store.clone(),
                applications: store.clone(),
                collaterals: store,
            },
            settings,
            None,
        )
    }

    fn from_repositories(
        repos: Repositories,
        settings: AuthSettings,
        db: Option<PgPool>,
    ) -> Self {
        let auth_service = AuthService::new(
            repos.users,
            repos.sessions,
            repos.customers.clone(),
            settings,
        );
        let loan_application_service = LoanApplicationService::new(
            repos.applications.clone(),
            repos.products.clone(),
            repos.customers.clone(),
            repos.collaterals.clone(),
        );
        let collateral_service = CollateralService::new(
            repos.collaterals.clone(),
            repos.applications.clone(),
            repos.customers.clone(),
        );
        let dashboard_service = DashboardService::new(
            repos.applications,
            repos.customers.clone(),
            repos.collaterals,
        );

        Self {
            auth_service: Arc::new(auth_service),
            customer_service: Arc::new(CustomerService::new(repos.customers)),
            loan_product_service: Arc::new(LoanProductService::new(repos.products)),
            loan_application_service: Arc::new(loan_application_service),
            collateral_service: Arc::new(collateral_service),
            dashboard_service: Arc::new(dashboard_service),
            db,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<CustomerService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.customer_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanProductService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_product_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanApplicationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_application_service.clone()
    }
}

impl FromRef<AppState> for Arc<CollateralService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.collateral_service.clone()
    }
}

impl FromRef<AppState> for Arc<DashboardService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.dashboard_service.clone()
    }
}
