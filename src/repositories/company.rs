//! # Company Repository
//!
//! CRUD operations for the tenant companies, including matching-program and
//! subscription updates.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::company::{
    ActiveModel as CompanyActiveModel, Column, CompanySettings, Entity as Company,
    MatchingProgram, Model as CompanyModel, Subscription,
};
use crate::models::{Address, ContactInfo};

use super::Page;

/// Request data for creating a new company
#[derive(Debug, Clone)]
pub struct CreateCompanyData {
    pub name: String,
    pub domain: String,
    pub ein: String,
    pub address: Address,
    pub contact_info: ContactInfo,
    pub subscription: Option<Subscription>,
}

/// Company overlay: only fields present in the request change.
#[derive(Debug, Clone, Default)]
pub struct UpdateCompanyData {
    pub name: Option<String>,
    pub address: Option<Address>,
    pub contact_info: Option<ContactInfo>,
    pub settings: Option<CompanySettings>,
}

/// Directory listing filters.
#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    /// Substring match against name or domain.
    pub search: Option<String>,
    /// Exact match against the subscription status, e.g. "active", "trial".
    pub subscription_status: Option<String>,
}

/// Repository for company database operations
pub struct CompanyRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CompanyRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, company_id: Uuid) -> Result<Option<CompanyModel>, ApiError> {
        Ok(Company::find_by_id(company_id).one(self.db).await?)
    }

    /// Batch lookup keyed by id, for joining names onto donation rows.
    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<std::collections::HashMap<Uuid, CompanyModel>, ApiError> {
        let companies = Company::find()
            .filter(Column::Id.is_in(ids))
            .all(self.db)
            .await?;
        Ok(companies.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Domain lookup used at registration time to place a user in a tenant.
    pub async fn find_by_domain(&self, domain: &str) -> Result<Option<CompanyModel>, ApiError> {
        Ok(Company::find()
            .filter(Column::Domain.eq(domain))
            .one(self.db)
            .await?)
    }

    pub async fn list(
        &self,
        filter: CompanyFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<CompanyModel>, ApiError> {
        let per_page = per_page.max(1);
        let mut query = Company::find().order_by_asc(Column::Name);

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(Column::Name.contains(term).or(Column::Domain.contains(term)));
        }

        // The subscription lives in a JSON column, so its status filter is
        // applied in memory after the SQL filters narrow the set. The
        // directory is super-admin scale, not a hot path.
        if let Some(status) = filter.subscription_status {
            let matching: Vec<CompanyModel> = query
                .all(self.db)
                .await?
                .into_iter()
                .filter(|c| c.subscription.status == status)
                .collect();

            let total = matching.len() as u64;
            let pages = total.div_ceil(per_page);
            let start = page.saturating_sub(1).saturating_mul(per_page) as usize;
            let items = matching
                .into_iter()
                .skip(start)
                .take(per_page as usize)
                .collect();
            return Ok(Page { items, total, pages });
        }

        let paginator = query.paginate(self.db, per_page);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page {
            items,
            total: totals.number_of_items,
            pages: totals.number_of_pages,
        })
    }

    pub async fn create(&self, data: CreateCompanyData) -> Result<CompanyModel, ApiError> {
        let company = CompanyActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(data.name),
            domain: Set(data.domain),
            ein: Set(data.ein),
            address: Set(data.address),
            contact_info: Set(data.contact_info),
            subscription: Set(data.subscription.unwrap_or_default()),
            matching_program: Set(MatchingProgram::default()),
            settings: Set(CompanySettings::default()),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        Ok(company.insert(self.db).await?)
    }

    /// Apply a field-by-field overlay.
    pub async fn update(
        &self,
        company: CompanyModel,
        data: UpdateCompanyData,
    ) -> Result<CompanyModel, ApiError> {
        let mut active = company.into_active_model();
        if let Some(name) = data.name {
            active.name = Set(name);
        }
        if let Some(address) = data.address {
            active.address = Set(address);
        }
        if let Some(contact_info) = data.contact_info {
            active.contact_info = Set(contact_info);
        }
        if let Some(settings) = data.settings {
            active.settings = Set(settings);
        }

        Ok(active.update(self.db).await?)
    }

    /// Replace the matching-program configuration. The running annual
    /// reservation survives configuration changes.
    pub async fn set_matching_program(
        &self,
        company: CompanyModel,
        mut program: MatchingProgram,
    ) -> Result<CompanyModel, ApiError> {
        program.used_amount = company.matching_program.used_amount;

        let mut active = company.into_active_model();
        active.matching_program = Set(program);
        Ok(active.update(self.db).await?)
    }

    pub async fn set_subscription(
        &self,
        company: CompanyModel,
        subscription: Subscription,
    ) -> Result<CompanyModel, ApiError> {
        let mut active = company.into_active_model();
        active.subscription = Set(subscription);
        Ok(active.update(self.db).await?)
    }

    pub async fn set_active(
        &self,
        company: CompanyModel,
        is_active: bool,
    ) -> Result<CompanyModel, ApiError> {
        let mut active = company.into_active_model();
        active.is_active = Set(is_active);
        Ok(active.update(self.db).await?)
    }

    pub async fn count(&self) -> Result<u64, ApiError> {
        Ok(Company::find().count(self.db).await?)
    }
}
