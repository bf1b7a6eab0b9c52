//! # Donation Repository
//!
//! The donation lifecycle lives here: validated creation with matching
//! computation and counter side effects in one transaction, and status
//! transitions validated against the lifecycle table.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, invalid_state_transition, not_found, validation_error};
use crate::matching::{compute_match, round_cents};
use crate::models::charity::{self, Entity as Charity};
use crate::models::company::{self, Entity as Company};
use crate::models::donation::{
    ActiveModel as DonationActiveModel, Column, DonationStatus, DonationType,
    Entity as Donation, Model as DonationModel, PaymentMethod, PayrollInfo, ProcessingInfo,
    TaxInfo,
};
use crate::models::user::{self, Entity as User};
use crate::taxes::year_bounds;

use super::Page;

/// Request data for creating a new donation
#[derive(Debug, Clone)]
pub struct CreateDonationData {
    pub charity_id: Uuid,
    pub amount: f64,
    pub donation_type: DonationType,
    pub frequency: Option<String>,
    pub payment_method: PaymentMethod,
    pub payroll_info: Option<PayrollInfo>,
    pub notes: Option<String>,
    pub is_anonymous: bool,
    pub tax_deductible: bool,
}

/// Listing filters; every field narrows the result set when present.
#[derive(Debug, Clone, Default)]
pub struct DonationFilter {
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub charity_id: Option<Uuid>,
    pub status: Option<DonationStatus>,
    pub donation_type: Option<DonationType>,
    pub year: Option<i32>,
}

/// Repository for donation database operations
pub struct DonationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> DonationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, donation_id: Uuid) -> Result<Option<DonationModel>, ApiError> {
        Ok(Donation::find_by_id(donation_id).one(self.db).await?)
    }

    pub async fn list(
        &self,
        filter: DonationFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<DonationModel>, ApiError> {
        let paginator = Self::filtered(filter)
            .order_by_desc(Column::CreatedAt)
            .paginate(self.db, per_page.max(1));

        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page {
            items,
            total: totals.number_of_items,
            pages: totals.number_of_pages,
        })
    }

    /// Unpaginated fetch for summaries and reports.
    pub async fn list_all(&self, filter: DonationFilter) -> Result<Vec<DonationModel>, ApiError> {
        Ok(Self::filtered(filter)
            .order_by_desc(Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    fn filtered(filter: DonationFilter) -> sea_orm::Select<Donation> {
        let mut query = Donation::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(Column::UserId.eq(user_id));
        }
        if let Some(company_id) = filter.company_id {
            query = query.filter(Column::CompanyId.eq(company_id));
        }
        if let Some(charity_id) = filter.charity_id {
            query = query.filter(Column::CharityId.eq(charity_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }
        if let Some(donation_type) = filter.donation_type {
            query = query.filter(Column::DonationType.eq(donation_type));
        }
        if let Some(year) = filter.year {
            let (start, end) = year_bounds(year);
            query = query
                .filter(Column::CreatedAt.gte(start))
                .filter(Column::CreatedAt.lte(end));
        }
        query
    }

    /// Create a donation: validate, compute the employer match against the
    /// remaining annual budget, reserve it, insert, and apply the counter
    /// side effects. All of it commits or rolls back as one transaction.
    pub async fn create(
        &self,
        donor: &user::Model,
        charity: &charity::Model,
        data: CreateDonationData,
    ) -> Result<DonationModel, ApiError> {
        Self::validate(charity, &data)?;

        let txn = self.db.begin().await?;

        // The company row is re-read inside the transaction so the
        // reservation sees the current used_amount.
        let company = Company::find_by_id(donor.company_id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found("Company not found"))?;

        let require_approval = company.settings.require_approval_for_donations;
        let outcome = compute_match(&company.matching_program, data.amount);

        if outcome.matching_amount > 0.0 {
            reserve_matching(&txn, company, outcome.matching_amount).await?;
        }

        let initial_status = if require_approval {
            DonationStatus::Pending
        } else {
            DonationStatus::Approved
        };

        let donation = DonationActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(donor.id),
            company_id: Set(donor.company_id),
            charity_id: Set(charity.id),
            amount: Set(round_cents(data.amount)),
            matching_amount: Set(outcome.matching_amount),
            total_amount: Set(outcome.total_amount),
            donation_type: Set(data.donation_type),
            frequency: Set(data.frequency),
            status: Set(initial_status),
            payment_method: Set(data.payment_method),
            payroll_info: Set(data.payroll_info),
            notes: Set(data.notes),
            is_anonymous: Set(data.is_anonymous),
            processing_info: Set(ProcessingInfo::default()),
            tax_info: Set(TaxInfo {
                tax_deductible: data.tax_deductible,
                receipt_sent: false,
            }),
            created_at: Set(Utc::now().into()),
        };
        let donation = donation.insert(&txn).await?;

        if initial_status != DonationStatus::Pending {
            apply_counter_side_effects(&txn, &donation).await?;
        }

        txn.commit().await?;
        Ok(donation)
    }

    /// Admin status update, validated against the lifecycle table. Approval
    /// of a pending donation applies the counter side effects deferred at
    /// creation; cancellation or failure releases the matching reservation.
    pub async fn update_status(
        &self,
        donation: DonationModel,
        target: DonationStatus,
        failure_reason: Option<String>,
    ) -> Result<DonationModel, ApiError> {
        if !donation.status.can_transition_to(target) {
            return Err(invalid_state_transition(&format!(
                "Cannot transition donation from {:?} to {:?}",
                donation.status, target
            )));
        }

        let txn = self.db.begin().await?;

        if donation.status == DonationStatus::Pending && target == DonationStatus::Approved {
            apply_counter_side_effects(&txn, &donation).await?;
        }

        if matches!(target, DonationStatus::Cancelled | DonationStatus::Failed)
            && donation.matching_amount > 0.0
        {
            release_matching(&txn, donation.company_id, donation.matching_amount).await?;
        }

        let now = Utc::now();
        let mut processing_info = donation.processing_info.clone();
        processing_info.last_status_update = Some(now);
        if target == DonationStatus::Failed {
            processing_info.failure_reason = failure_reason;
        }
        if target == DonationStatus::Cancelled {
            processing_info.cancelled_at = Some(now);
        }

        let mut active = donation.into_active_model();
        active.status = Set(target);
        active.processing_info = Set(processing_info);
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Cancel a donation. Only pending or approved donations qualify.
    pub async fn cancel(&self, donation: DonationModel) -> Result<DonationModel, ApiError> {
        if !donation.status.is_cancellable() {
            return Err(invalid_state_transition(
                "Only pending or approved donations can be cancelled",
            ));
        }
        self.update_status(donation, DonationStatus::Cancelled, None)
            .await
    }

    /// A user's completed donations inside one calendar year, oldest first.
    pub async fn completed_for_user_in_year(
        &self,
        user_id: Uuid,
        year: i32,
    ) -> Result<Vec<DonationModel>, ApiError> {
        let (start, end) = year_bounds(year);
        Ok(Donation::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Status.eq(DonationStatus::Completed))
            .filter(Column::CreatedAt.gte(start))
            .filter(Column::CreatedAt.lte(end))
            .order_by_asc(Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    /// Distinct years in which the user completed donations, newest first.
    pub async fn years_with_completed_donations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<i32>, ApiError> {
        use chrono::Datelike;

        let donations = Donation::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Status.eq(DonationStatus::Completed))
            .all(self.db)
            .await?;

        let mut years: Vec<i32> = donations.iter().map(|d| d.created_at.year()).collect();
        years.sort_unstable();
        years.dedup();
        years.reverse();
        Ok(years)
    }

    fn validate(charity: &charity::Model, data: &CreateDonationData) -> Result<(), ApiError> {
        let mut errors = serde_json::Map::new();

        if data.amount <= 0.0 {
            errors.insert("amount".into(), json!("Amount must be greater than zero"));
        }
        if let Some(min) = charity.donation_info.min_donation {
            if data.amount < min {
                errors.insert("amount".into(), json!(format!("Minimum donation is {min}")));
            }
        }
        if let Some(max) = charity.donation_info.max_donation {
            if data.amount > max {
                errors.insert("amount".into(), json!(format!("Maximum donation is {max}")));
            }
        }
        if data.donation_type == DonationType::Recurring {
            if data.frequency.as_deref().map_or(true, str::is_empty) {
                errors.insert(
                    "frequency".into(),
                    json!("Recurring donations require a frequency"),
                );
            }
            if !charity.donation_info.accepts_recurring {
                errors.insert(
                    "donation_type".into(),
                    json!("This charity does not accept recurring donations"),
                );
            }
        }
        if data.payment_method == PaymentMethod::PayrollDeduction && data.payroll_info.is_none() {
            errors.insert(
                "payroll_info".into(),
                json!("Payroll deduction requires deduction type and value"),
            );
        }
        if !charity.is_active {
            errors.insert("charity_id".into(), json!("Charity is not active"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(validation_error(
                "Donation validation failed",
                serde_json::Value::Object(errors),
            ))
        }
    }
}

async fn reserve_matching<C: ConnectionTrait>(
    conn: &C,
    company: company::Model,
    amount: f64,
) -> Result<(), ApiError> {
    let mut program = company.matching_program.clone();
    program.used_amount = round_cents(program.used_amount + amount);

    let mut active = company.into_active_model();
    active.matching_program = Set(program);
    active.update(conn).await?;
    Ok(())
}

async fn release_matching<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    amount: f64,
) -> Result<(), ApiError> {
    let company = Company::find_by_id(company_id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found("Company not found"))?;

    let mut program = company.matching_program.clone();
    program.used_amount = round_cents((program.used_amount - amount).max(0.0));

    let mut active = company.into_active_model();
    active.matching_program = Set(program);
    active.update(conn).await?;
    Ok(())
}

/// Increment the charity's running totals and the donor's gamification
/// counters for a donation entering the active ledger.
async fn apply_counter_side_effects<C: ConnectionTrait>(
    conn: &C,
    donation: &DonationModel,
) -> Result<(), ApiError> {
    let charity = Charity::find_by_id(donation.charity_id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found("Charity not found"))?;

    let new_total = round_cents(charity.total_donations + donation.total_amount);
    let new_donors = charity.total_donors + 1;
    let mut charity_active = charity.into_active_model();
    charity_active.total_donations = Set(new_total);
    charity_active.total_donors = Set(new_donors);
    charity_active.update(conn).await?;

    let donor = User::find_by_id(donation.user_id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found("User not found"))?;

    let mut gamification = donor.gamification.clone();
    gamification.total_points += donation.amount.floor() as i64;
    gamification.total_donated = round_cents(gamification.total_donated + donation.amount);
    gamification.level = (gamification.total_points / 1000 + 1) as i32;

    let mut donor_active = donor.into_active_model();
    donor_active.gamification = Set(gamification);
    donor_active.update(conn).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::company::{MatchType, MatchingProgram};
    use crate::repositories::test_support::{seed_charity, seed_company, seed_user, setup_db};

    fn one_time(charity_id: Uuid, amount: f64) -> CreateDonationData {
        CreateDonationData {
            charity_id,
            amount,
            donation_type: DonationType::OneTime,
            frequency: None,
            payment_method: PaymentMethod::DirectPayment,
            payroll_info: None,
            notes: None,
            is_anonymous: false,
            tax_deductible: true,
        }
    }

    fn fixed_25() -> MatchingProgram {
        MatchingProgram {
            enabled: true,
            match_type: MatchType::Fixed,
            fixed_amount: Some(25.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creation_applies_match_and_side_effects_when_no_approval_required() {
        let db = setup_db().await;
        let company = seed_company(&db, fixed_25(), false).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;

        let repo = DonationRepository::new(&db);
        let donation = repo
            .create(&donor, &charity, one_time(charity.id, 60.0))
            .await
            .unwrap();

        assert_eq!(donation.status, DonationStatus::Approved);
        assert_eq!(donation.matching_amount, 25.0);
        assert_eq!(donation.total_amount, 85.0);

        let charity = Charity::find_by_id(charity.id).one(&db).await.unwrap().unwrap();
        assert_eq!(charity.total_donations, 85.0);
        assert_eq!(charity.total_donors, 1);

        let donor = User::find_by_id(donor.id).one(&db).await.unwrap().unwrap();
        assert_eq!(donor.gamification.total_donated, 60.0);
        assert_eq!(donor.gamification.total_points, 60);

        let company = Company::find_by_id(company.id).one(&db).await.unwrap().unwrap();
        assert_eq!(company.matching_program.used_amount, 25.0);
    }

    #[tokio::test]
    async fn pending_creation_defers_counter_side_effects() {
        let db = setup_db().await;
        let company = seed_company(&db, fixed_25(), true).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;

        let repo = DonationRepository::new(&db);
        let donation = repo
            .create(&donor, &charity, one_time(charity.id, 60.0))
            .await
            .unwrap();
        assert_eq!(donation.status, DonationStatus::Pending);

        let charity_row = Charity::find_by_id(charity.id).one(&db).await.unwrap().unwrap();
        assert_eq!(charity_row.total_donations, 0.0);
        assert_eq!(charity_row.total_donors, 0);

        // Approval applies the deferred counters.
        let approved = repo
            .update_status(donation, DonationStatus::Approved, None)
            .await
            .unwrap();
        assert_eq!(approved.status, DonationStatus::Approved);

        let charity_row = Charity::find_by_id(charity.id).one(&db).await.unwrap().unwrap();
        assert_eq!(charity_row.total_donations, 85.0);
        assert_eq!(charity_row.total_donors, 1);
    }

    #[tokio::test]
    async fn annual_limit_trims_the_reserved_match() {
        let db = setup_db().await;
        let mut program = MatchingProgram {
            enabled: true,
            match_type: MatchType::Percentage,
            percentage: Some(100.0),
            ..Default::default()
        };
        program.annual_limit = Some(1000.0);
        program.used_amount = 940.0;
        let company = seed_company(&db, program, false).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;

        let repo = DonationRepository::new(&db);
        let donation = repo
            .create(&donor, &charity, one_time(charity.id, 200.0))
            .await
            .unwrap();

        assert_eq!(donation.matching_amount, 60.0);
        assert_eq!(donation.total_amount, 260.0);

        let company = Company::find_by_id(company.id).one(&db).await.unwrap().unwrap();
        assert_eq!(company.matching_program.used_amount, 1000.0);
    }

    #[tokio::test]
    async fn cancel_releases_the_matching_reservation() {
        let db = setup_db().await;
        let company = seed_company(&db, fixed_25(), false).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;

        let repo = DonationRepository::new(&db);
        let donation = repo
            .create(&donor, &charity, one_time(charity.id, 60.0))
            .await
            .unwrap();

        let cancelled = repo.cancel(donation).await.unwrap();
        assert_eq!(cancelled.status, DonationStatus::Cancelled);
        assert!(cancelled.processing_info.cancelled_at.is_some());

        let company = Company::find_by_id(company.id).one(&db).await.unwrap().unwrap();
        assert_eq!(company.matching_program.used_amount, 0.0);
    }

    #[tokio::test]
    async fn cancelling_a_terminal_donation_is_rejected() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;

        let repo = DonationRepository::new(&db);
        let donation = repo
            .create(&donor, &charity, one_time(charity.id, 40.0))
            .await
            .unwrap();
        let donation = repo
            .update_status(donation, DonationStatus::Processing, None)
            .await
            .unwrap();
        let donation = repo
            .update_status(donation, DonationStatus::Completed, None)
            .await
            .unwrap();

        let err = repo.cancel(donation).await.unwrap_err();
        assert_eq!(err.code, Box::from("INVALID_STATE_TRANSITION"));
    }

    #[tokio::test]
    async fn illegal_status_jumps_are_rejected() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), true).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;

        let repo = DonationRepository::new(&db);
        let donation = repo
            .create(&donor, &charity, one_time(charity.id, 40.0))
            .await
            .unwrap();
        assert_eq!(donation.status, DonationStatus::Pending);

        let err = repo
            .update_status(donation, DonationStatus::Completed, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, Box::from("INVALID_STATE_TRANSITION"));
    }

    #[tokio::test]
    async fn validation_rejects_bad_requests_before_any_write() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;
        let repo = DonationRepository::new(&db);

        let err = repo
            .create(&donor, &charity, one_time(charity.id, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.code, Box::from("VALIDATION_FAILED"));

        let mut recurring = one_time(charity.id, 10.0);
        recurring.donation_type = DonationType::Recurring;
        let err = repo.create(&donor, &charity, recurring).await.unwrap_err();
        assert_eq!(err.code, Box::from("VALIDATION_FAILED"));

        let mut payroll = one_time(charity.id, 10.0);
        payroll.payment_method = PaymentMethod::PayrollDeduction;
        let err = repo.create(&donor, &charity, payroll).await.unwrap_err();
        assert_eq!(err.code, Box::from("VALIDATION_FAILED"));

        assert_eq!(
            Donation::find().count(&db).await.unwrap(),
            0,
            "no rows written by failed validations"
        );
    }

    #[tokio::test]
    async fn failed_transition_records_the_reason() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let donor = seed_user(&db, company.id).await;
        let charity = seed_charity(&db).await;

        let repo = DonationRepository::new(&db);
        let donation = repo
            .create(&donor, &charity, one_time(charity.id, 40.0))
            .await
            .unwrap();
        let donation = repo
            .update_status(donation, DonationStatus::Processing, None)
            .await
            .unwrap();
        let failed = repo
            .update_status(
                donation,
                DonationStatus::Failed,
                Some("payment declined".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(failed.status, DonationStatus::Failed);
        assert_eq!(
            failed.processing_info.failure_reason.as_deref(),
            Some("payment declined")
        );
    }
}
