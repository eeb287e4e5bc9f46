//! In-memory storage
//!
//! One lock guards every table, so multi-row operations (application
//! creation with its pledges, status changes that release collateral) are
//! as atomic here as the PostgreSQL transactions they mirror.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{SessionRepository, UserRepository};
use crate::collateral::repository::{
    closed_application_conflict, pledge_conflict, release_conflict,
};
use crate::collateral::{Collateral, CollateralFilter, CollateralRepository, CollateralStatus};
use crate::customer::{Customer, CustomerRepository, KycStatus};
use crate::error::{ApiError, ApiResult};
use crate::loan_application::{
    workflow, ApplicationFilter, ApplicationStats, ApplicationStatus, LoanApplication,
    LoanApplicationRepository, LoanApplicationSummary,
};
use crate::loan_product::{LoanProduct, LoanProductRepository, ProductStatus};
use crate::models::{AuthSession, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: Vec<AuthSession>,
    customers: HashMap<Uuid, Customer>,
    products: HashMap<Uuid, LoanProduct>,
    applications: Vec<LoanApplication>,
    collaterals: Vec<Collateral>,
}

fn duplicate(what: &str) -> ApiError {
    ApiError::DuplicateEntry(format!("Duplicate value for {}", what))
}

impl Tables {
    fn check_new_user(&self, user: &User) -> ApiResult<()> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(duplicate("users.email"));
        }
        Ok(())
    }

    fn check_new_customer(&self, customer: &Customer) -> ApiResult<()> {
        if self
            .customers
            .values()
            .any(|c| c.pan_number == customer.pan_number)
        {
            return Err(duplicate("customers.pan_number"));
        }
        if self.customers.values().any(|c| c.user_id == customer.user_id) {
            return Err(duplicate("customers.user_id"));
        }
        Ok(())
    }

    /// All-or-nothing pledge; checks every row before touching any
    fn pledge(
        &mut self,
        application_id: Uuid,
        customer_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<Collateral>> {
        let eligible = self
            .collaterals
            .iter()
            .filter(|c| {
                ids.contains(&c.id)
                    && c.customer_id == customer_id
                    && c.status == CollateralStatus::Available
            })
            .count();
        if eligible != ids.len() {
            return Err(pledge_conflict());
        }

        let mut pledged = Vec::with_capacity(ids.len());
        for holding in self.collaterals.iter_mut().filter(|c| ids.contains(&c.id)) {
            holding.status = CollateralStatus::Pledged;
            holding.application_id = Some(application_id);
            holding.pledged_at = Some(now);
            holding.released_at = None;
            holding.updated_at = now;
            pledged.push(holding.clone());
        }
        Ok(pledged)
    }

    fn release_where(
        &mut self,
        now: DateTime<Utc>,
        matches: impl Fn(&Collateral) -> bool,
    ) -> Vec<Collateral> {
        let mut released = Vec::new();
        for holding in self
            .collaterals
            .iter_mut()
            .filter(|c| c.status == CollateralStatus::Pledged && matches(c))
        {
            holding.status = CollateralStatus::Available;
            holding.application_id = None;
            holding.released_at = Some(now);
            holding.updated_at = now;
            released.push(holding.clone());
        }
        released
    }

    fn summarize(&self, app: &LoanApplication) -> LoanApplicationSummary {
        let (customer_name, customer_email) = self
            .customers
            .get(&app.customer_id)
            .map(|c| (c.full_name(), c.email.clone()))
            .unwrap_or_default();
        let product_name = self
            .products
            .get(&app.loan_product_id)
            .map(|p| p.product_name.clone())
            .unwrap_or_default();

        LoanApplicationSummary {
            id: app.id,
            application_number: app.application_number.clone(),
            customer_id: app.customer_id,
            customer_name,
            customer_email,
            loan_product_id: app.loan_product_id,
            product_name,
            requested_amount: app.requested_amount,
            approved_amount: app.approved_amount,
            tenure_months: app.tenure_months,
            interest_rate: app.interest_rate,
            calculated_emi: app.calculated_emi,
            status: app.status,
            review_notes: app.review_notes.clone(),
            created_at: app.created_at,
        }
    }
}

/// Process-local store implementing every repository trait
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: &User) -> ApiResult<User> {
        let mut tables = self.tables.write().await;
        tables.check_new_user(user)?;
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn create_with_customer(
        &self,
        user: &User,
        customer: &Customer,
    ) -> ApiResult<(User, Customer)> {
        let mut tables = self.tables.write().await;
        tables.check_new_user(user)?;
        tables.check_new_customer(customer)?;
        tables.users.insert(user.id, user.clone());
        tables.customers.insert(customer.id, customer.clone());
        Ok((user.clone(), customer.clone()))
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = now;
        }
        Ok(())
    }

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.last_login_at = Some(now);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, session: &AuthSession) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        if tables.sessions.iter().any(|s| s.jti == session.jti) {
            return Err(duplicate("auth_sessions.jti"));
        }
        tables.sessions.push(session.clone());
        Ok(())
    }

    async fn find_live_by_jti(
        &self,
        jti: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<AuthSession>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.jti == jti && s.is_live(now))
            .cloned())
    }

    async fn find_live_by_refresh_hash(
        &self,
        refresh_token_hash: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<AuthSession>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.refresh_token_hash == refresh_token_hash && s.is_live(now))
            .cloned())
    }

    async fn rotate(
        &self,
        id: Uuid,
        jti: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ApiResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.revoked_at.is_none())
        {
            Some(session) => {
                session.jti = jti.to_string();
                session.refresh_token_hash = refresh_token_hash.to_string();
                session.expires_at = expires_at;
                session.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke(&self, jti: &str, now: DateTime<Utc>) -> ApiResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .sessions
            .iter_mut()
            .find(|s| s.jti == jti && s.revoked_at.is_none())
        {
            Some(session) => {
                session.revoked_at = Some(now);
                session.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all(
        &self,
        user_id: Uuid,
        except_jti: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<u64> {
        let mut tables = self.tables.write().await;
        let mut revoked = 0;
        for session in tables.sessions.iter_mut().filter(|s| {
            s.user_id == user_id && s.revoked_at.is_none() && Some(s.jti.as_str()) != except_jti
        }) {
            session.revoked_at = Some(now);
            session.updated_at = now;
            revoked += 1;
        }
        Ok(revoked)
    }
}

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn find_by_pan(&self, pan_number: &str) -> ApiResult<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .find(|c| c.pan_number == pan_number)
            .cloned())
    }

    async fn list(
        &self,
        kyc_status: Option<KycStatus>,
        offset: i64,
        limit: i64,
    ) -> ApiResult<(Vec<Customer>, i64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Customer> = tables
            .customers
            .values()
            .filter(|c| kyc_status.map_or(true, |status| c.kyc_status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, customer: &Customer) -> ApiResult<Customer> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .customers
            .get_mut(&customer.id)
            .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))?;

        stored.first_name = customer.first_name.clone();
        stored.last_name = customer.last_name.clone();
        stored.phone_number = customer.phone_number.clone();
        stored.set_address(customer.address());
        stored.annual_income = customer.annual_income;
        stored.occupation = customer.occupation.clone();
        stored.kyc_status = customer.kyc_status;
        stored.kyc_verified_at = customer.kyc_verified_at;
        stored.kyc_verified_by_id = customer.kyc_verified_by_id;
        stored.kyc_remarks = customer.kyc_remarks.clone();
        stored.updated_at = customer.updated_at;
        Ok(stored.clone())
    }

    async fn count(&self) -> ApiResult<i64> {
        Ok(self.tables.read().await.customers.len() as i64)
    }
}

#[async_trait]
impl LoanProductRepository for MemoryStore {
    async fn list_active(&self) -> ApiResult<Vec<LoanProduct>> {
        let tables = self.tables.read().await;
        let mut products: Vec<LoanProduct> = tables
            .products
            .values()
            .filter(|p| p.status == ProductStatus::Active)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        Ok(products)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LoanProduct>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> ApiResult<Option<LoanProduct>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .find(|p| p.product_code == code)
            .cloned())
    }

    async fn create(&self, product: &LoanProduct) -> ApiResult<LoanProduct> {
        let mut tables = self.tables.write().await;
        if tables
            .products
            .values()
            .any(|p| p.product_code == product.product_code)
        {
            return Err(duplicate("loan_products.product_code"));
        }
        tables.products.insert(product.id, product.clone());
        Ok(product.clone())
    }

    async fn update(&self, product: &LoanProduct) -> ApiResult<LoanProduct> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .products
            .get_mut(&product.id)
            .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))?;

        // product_code and created_at are immutable
        *stored = LoanProduct {
            product_code: stored.product_code.clone(),
            created_at: stored.created_at,
            ..product.clone()
        };
        Ok(stored.clone())
    }
}

#[async_trait]
impl LoanApplicationRepository for MemoryStore {
    async fn create(
        &self,
        application: &LoanApplication,
        collateral_ids: &[Uuid],
    ) -> ApiResult<LoanApplication> {
        let mut tables = self.tables.write().await;

        if tables
            .applications
            .iter()
            .any(|a| a.application_number == application.application_number)
        {
            return Err(duplicate("loan_applications.application_number"));
        }
        if !tables.customers.contains_key(&application.customer_id)
            || !tables.products.contains_key(&application.loan_product_id)
        {
            return Err(ApiError::BadRequest(
                "Invalid foreign key reference".to_string(),
            ));
        }

        if !collateral_ids.is_empty() {
            tables.pledge(
                application.id,
                application.customer_id,
                collateral_ids,
                application.created_at,
            )?;
        }
        tables.applications.push(application.clone());
        Ok(application.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LoanApplication>> {
        let tables = self.tables.read().await;
        Ok(tables.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn list(
        &self,
        filter: &ApplicationFilter,
    ) -> ApiResult<(Vec<LoanApplicationSummary>, i64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&LoanApplication> = tables
            .applications
            .iter()
            .filter(|a| filter.customer_id.map_or(true, |id| a.customer_id == id))
            .filter(|a| filter.status.map_or(true, |status| a.status == status))
            .collect();
        // Newest first; insertion order breaks ties
        matching.reverse();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|app| tables.summarize(app))
            .collect();
        Ok((page, total))
    }

    async fn update_status(
        &self,
        updated: &LoanApplication,
        expected: ApplicationStatus,
        release_collateral: bool,
    ) -> ApiResult<Option<LoanApplication>> {
        let mut tables = self.tables.write().await;

        let Some(stored) = tables
            .applications
            .iter_mut()
            .find(|a| a.id == updated.id && a.status == expected)
        else {
            return Ok(None);
        };
        *stored = updated.clone();

        if release_collateral {
            let released = tables.release_where(updated.updated_at, |c| {
                c.application_id == Some(updated.id)
            });
            tracing::info!(
                application_id = %updated.id,
                released = released.len(),
                "Released pledged collateral"
            );
        }

        Ok(Some(updated.clone()))
    }

    async fn stats(&self, customer_id: Option<Uuid>) -> ApiResult<ApplicationStats> {
        let tables = self.tables.read().await;
        let groups = tables
            .applications
            .iter()
            .filter(|a| customer_id.map_or(true, |id| a.customer_id == id))
            .map(|a| (a.status, 1, a.principal()));
        Ok(ApplicationStats::from_groups(groups))
    }
}

#[async_trait]
impl CollateralRepository for MemoryStore {
    async fn insert_many(&self, holdings: &[Collateral]) -> ApiResult<Vec<Collateral>> {
        let mut tables = self.tables.write().await;
        if holdings
            .iter()
            .any(|h| !tables.customers.contains_key(&h.customer_id))
        {
            return Err(ApiError::BadRequest(
                "Invalid foreign key reference".to_string(),
            ));
        }
        tables.collaterals.extend(holdings.iter().cloned());
        Ok(holdings.to_vec())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> ApiResult<Vec<Collateral>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Collateral> = tables
            .collaterals
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn list(&self, filter: &CollateralFilter) -> ApiResult<Vec<Collateral>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Collateral> = tables
            .collaterals
            .iter()
            .filter(|c| filter.customer_id.map_or(true, |id| c.customer_id == id))
            .filter(|c| filter.status.map_or(true, |status| c.status == status))
            .filter(|c| {
                filter
                    .application_id
                    .map_or(true, |id| c.application_id == Some(id))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn pledge(
        &self,
        application_id: Uuid,
        customer_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<Collateral>> {
        let mut tables = self.tables.write().await;
        let status = tables
            .applications
            .iter()
            .find(|a| a.id == application_id)
            .map(|a| a.status)
            .ok_or_else(|| ApiError::NotFound("Loan application not found".to_string()))?;
        if !workflow::accepts_collateral(status) {
            return Err(closed_application_conflict(status));
        }
        tables.pledge(application_id, customer_id, ids, now)
    }

    async fn release(&self, ids: &[Uuid], now: DateTime<Utc>) -> ApiResult<Vec<Collateral>> {
        let mut tables = self.tables.write().await;
        let pledged = tables
            .collaterals
            .iter()
            .filter(|c| ids.contains(&c.id) && c.status == CollateralStatus::Pledged)
            .count();
        if pledged != ids.len() {
            return Err(release_conflict());
        }
        Ok(tables.release_where(now, |c| ids.contains(&c.id)))
    }

    async fn pledged_value(&self, customer_id: Option<Uuid>) -> ApiResult<f64> {
        let tables = self.tables.read().await;
        Ok(tables
            .collaterals
            .iter()
            .filter(|c| c.status == CollateralStatus::Pledged)
            .filter(|c| customer_id.map_or(true, |id| c.customer_id == id))
            .map(|c| c.value)
            .sum())
    }
}
