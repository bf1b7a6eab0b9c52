//! # Tax Record Repository
//!
//! Upsert-style persistence for yearly tax records, keyed by the unique
//! (user, tax year) pair. Regeneration fully replaces the stored line items
//! and summary.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::charity;
use crate::models::donation;
use crate::models::tax_record::{
    ActiveModel as TaxRecordActiveModel, Column, Entity as TaxRecord, Model as TaxRecordModel,
    TaxDocuments, TaxLineItems, TaxRecordStatus,
};
use crate::models::user;
use crate::taxes::{build_line_items, compute_summary};

/// Repository for tax record database operations
pub struct TaxRecordRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TaxRecordRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, record_id: Uuid) -> Result<Option<TaxRecordModel>, ApiError> {
        Ok(TaxRecord::find_by_id(record_id).one(self.db).await?)
    }

    pub async fn find_by_user_and_year(
        &self,
        user_id: Uuid,
        tax_year: i32,
    ) -> Result<Option<TaxRecordModel>, ApiError> {
        Ok(TaxRecord::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::TaxYear.eq(tax_year))
            .one(self.db)
            .await?)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<TaxRecordModel>, ApiError> {
        Ok(TaxRecord::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::TaxYear)
            .all(self.db)
            .await?)
    }

    /// Generate or fully replace the record for (user, year) from the
    /// supplied completed donations.
    pub async fn generate(
        &self,
        owner: &user::Model,
        tax_year: i32,
        donations: &[donation::Model],
        charities: &HashMap<Uuid, charity::Model>,
    ) -> Result<TaxRecordModel, ApiError> {
        let items = build_line_items(donations, charities);
        let summary = compute_summary(&items);
        let now = Utc::now();

        match self.find_by_user_and_year(owner.id, tax_year).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.donations = Set(TaxLineItems(items));
                active.summary = Set(summary);
                active.documents = Set(TaxDocuments::all_generated(now));
                active.status = Set(TaxRecordStatus::Generated);
                active.generated_at = Set(Some(now.into()));
                Ok(active.update(self.db).await?)
            }
            None => {
                let record = TaxRecordActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(owner.id),
                    company_id: Set(owner.company_id),
                    tax_year: Set(tax_year),
                    donations: Set(TaxLineItems(items)),
                    summary: Set(summary),
                    documents: Set(TaxDocuments::all_generated(now)),
                    status: Set(TaxRecordStatus::Generated),
                    generated_at: Set(Some(now.into())),
                    downloaded_at: Set(None),
                    created_at: Set(now.into()),
                };
                Ok(record.insert(self.db).await?)
            }
        }
    }

    pub async fn mark_downloaded(
        &self,
        record: TaxRecordModel,
    ) -> Result<TaxRecordModel, ApiError> {
        let mut active = record.into_active_model();
        active.status = Set(TaxRecordStatus::Downloaded);
        active.downloaded_at = Set(Some(Utc::now().into()));
        Ok(active.update(self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::donation::{
        DonationStatus, DonationType, PaymentMethod, ProcessingInfo, TaxInfo,
    };
    use crate::repositories::test_support::{seed_charity, seed_company, seed_user, setup_db};
    use sea_orm::PaginatorTrait;

    fn completed_donation(
        user: &user::Model,
        charity: &charity::Model,
        amount: f64,
    ) -> donation::Model {
        donation::Model {
            id: Uuid::new_v4(),
            user_id: user.id,
            company_id: user.company_id,
            charity_id: charity.id,
            amount,
            matching_amount: 0.0,
            total_amount: amount,
            donation_type: DonationType::OneTime,
            frequency: None,
            status: DonationStatus::Completed,
            payment_method: PaymentMethod::DirectPayment,
            payroll_info: None,
            notes: None,
            is_anonymous: false,
            processing_info: ProcessingInfo::default(),
            tax_info: TaxInfo::default(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn generate_creates_then_replaces_one_row_per_year() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let owner = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;
        let charities: HashMap<Uuid, charity::Model> =
            [(charity.id, charity.clone())].into_iter().collect();

        let repo = TaxRecordRepository::new(&db);

        let donations = vec![completed_donation(&owner, &charity, 100.0)];
        let first = repo
            .generate(&owner, 2025, &donations, &charities)
            .await
            .unwrap();
        assert_eq!(first.status, TaxRecordStatus::Generated);
        assert_eq!(first.summary.total_donations, 100.0);
        assert!(first.documents.schedule_a.generated);

        let donations = vec![
            completed_donation(&owner, &charity, 100.0),
            completed_donation(&owner, &charity, 50.0),
        ];
        let second = repo
            .generate(&owner, 2025, &donations, &charities)
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.summary.total_donations, 150.0);
        assert_eq!(second.summary.donation_count, 2);
        assert_eq!(TaxRecord::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn records_for_different_years_coexist() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let owner = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;
        let charities: HashMap<Uuid, charity::Model> =
            [(charity.id, charity.clone())].into_iter().collect();

        let repo = TaxRecordRepository::new(&db);
        let donations = vec![completed_donation(&owner, &charity, 10.0)];
        repo.generate(&owner, 2024, &donations, &charities)
            .await
            .unwrap();
        repo.generate(&owner, 2025, &donations, &charities)
            .await
            .unwrap();

        let records = repo.list_for_user(owner.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tax_year, 2025);
        assert_eq!(records[1].tax_year, 2024);
    }

    #[tokio::test]
    async fn mark_downloaded_advances_status() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let owner = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;
        let charities: HashMap<Uuid, charity::Model> =
            [(charity.id, charity.clone())].into_iter().collect();

        let repo = TaxRecordRepository::new(&db);
        let donations = vec![completed_donation(&owner, &charity, 10.0)];
        let record = repo
            .generate(&owner, 2025, &donations, &charities)
            .await
            .unwrap();

        let downloaded = repo.mark_downloaded(record).await.unwrap();
        assert_eq!(downloaded.status, TaxRecordStatus::Downloaded);
        assert!(downloaded.downloaded_at.is_some());
    }
}
