//! # Charity Repository
//!
//! Catalog queries (category, search, featured) plus the super-admin
//! mutations that maintain the shared charity directory.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::charity::{
    ActiveModel as CharityActiveModel, CharityCategory, Column, DonationInfo,
    Entity as Charity, Impact, Model as CharityModel, Verification,
};
use crate::models::{Address, ContactInfo};

use super::Page;

/// Request data for creating a new charity
#[derive(Debug, Clone)]
pub struct CreateCharityData {
    pub name: String,
    pub ein: String,
    pub description: String,
    pub category: CharityCategory,
    pub subcategory: Option<String>,
    pub website: Option<String>,
    pub address: Address,
    pub contact_info: Option<ContactInfo>,
    pub impact: Option<Impact>,
    pub donation_info: Option<DonationInfo>,
}

/// Charity overlay: only fields present in the request change.
#[derive(Debug, Clone, Default)]
pub struct UpdateCharityData {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<CharityCategory>,
    pub subcategory: Option<String>,
    pub website: Option<String>,
    pub address: Option<Address>,
    pub contact_info: Option<ContactInfo>,
    pub impact: Option<Impact>,
    pub donation_info: Option<DonationInfo>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Catalog sort orders. Name sorts ascending; the other two put the
/// biggest and newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CharitySort {
    #[default]
    Name,
    TotalDonations,
    Created,
}

/// Catalog listing filters; inactive charities stay hidden unless asked for.
#[derive(Debug, Clone, Default)]
pub struct CharityFilter {
    pub category: Option<CharityCategory>,
    pub search: Option<String>,
    pub featured_only: bool,
    pub include_inactive: bool,
    pub sort: CharitySort,
}

/// Repository for charity database operations
pub struct CharityRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CharityRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, charity_id: Uuid) -> Result<Option<CharityModel>, ApiError> {
        Ok(Charity::find_by_id(charity_id).one(self.db).await?)
    }

    /// Batch lookup keyed by id, for joining names onto donation rows.
    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<std::collections::HashMap<Uuid, CharityModel>, ApiError> {
        let charities = Charity::find()
            .filter(Column::Id.is_in(ids))
            .all(self.db)
            .await?;
        Ok(charities.into_iter().map(|c| (c.id, c)).collect())
    }

    pub async fn list(
        &self,
        filter: CharityFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<CharityModel>, ApiError> {
        let mut query = Charity::find();

        if !filter.include_inactive {
            query = query.filter(Column::IsActive.eq(true));
        }
        if filter.featured_only {
            query = query.filter(Column::IsFeatured.eq(true));
        }
        if let Some(category) = filter.category {
            query = query.filter(Column::Category.eq(category));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            let term = search.trim().to_string();
            query = query.filter(
                Condition::any()
                    .add(Column::Name.contains(&term))
                    .add(Column::Description.contains(&term)),
            );
        }

        let query = match filter.sort {
            CharitySort::Name => query.order_by_asc(Column::Name),
            CharitySort::TotalDonations => query.order_by_desc(Column::TotalDonations),
            CharitySort::Created => query.order_by_desc(Column::CreatedAt),
        };

        let paginator = query.paginate(self.db, per_page.max(1));

        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page {
            items,
            total: totals.number_of_items,
            pages: totals.number_of_pages,
        })
    }

    pub async fn featured(&self, limit: u64) -> Result<Vec<CharityModel>, ApiError> {
        Ok(Charity::find()
            .filter(Column::IsActive.eq(true))
            .filter(Column::IsFeatured.eq(true))
            .order_by_desc(Column::TotalDonations)
            .limit(limit)
            .all(self.db)
            .await?)
    }

    pub async fn create(&self, data: CreateCharityData) -> Result<CharityModel, ApiError> {
        let charity = CharityActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(data.name),
            ein: Set(data.ein),
            description: Set(data.description),
            category: Set(data.category),
            subcategory: Set(data.subcategory),
            website: Set(data.website),
            address: Set(data.address),
            contact_info: Set(data.contact_info),
            verification: Set(Verification::default()),
            impact: Set(data.impact),
            donation_info: Set(data.donation_info.unwrap_or_default()),
            is_featured: Set(false),
            is_active: Set(true),
            total_donations: Set(0.0),
            total_donors: Set(0),
            created_at: Set(Utc::now().into()),
        };

        Ok(charity.insert(self.db).await?)
    }

    /// Apply a field-by-field overlay.
    pub async fn update(
        &self,
        charity: CharityModel,
        data: UpdateCharityData,
    ) -> Result<CharityModel, ApiError> {
        let mut active = charity.into_active_model();
        if let Some(name) = data.name {
            active.name = Set(name);
        }
        if let Some(description) = data.description {
            active.description = Set(description);
        }
        if let Some(category) = data.category {
            active.category = Set(category);
        }
        if let Some(subcategory) = data.subcategory {
            active.subcategory = Set(Some(subcategory));
        }
        if let Some(website) = data.website {
            active.website = Set(Some(website));
        }
        if let Some(address) = data.address {
            active.address = Set(address);
        }
        if let Some(contact_info) = data.contact_info {
            active.contact_info = Set(Some(contact_info));
        }
        if let Some(impact) = data.impact {
            active.impact = Set(Some(impact));
        }
        if let Some(donation_info) = data.donation_info {
            active.donation_info = Set(donation_info);
        }
        if let Some(is_featured) = data.is_featured {
            active.is_featured = Set(is_featured);
        }
        if let Some(is_active) = data.is_active {
            active.is_active = Set(is_active);
        }

        Ok(active.update(self.db).await?)
    }

    /// Record a super-admin verification decision.
    pub async fn verify(
        &self,
        charity: CharityModel,
        verified_by: String,
        rating: Option<f64>,
    ) -> Result<CharityModel, ApiError> {
        let verification = Verification {
            is_verified: true,
            verified_by: Some(verified_by),
            verified_at: Some(Utc::now()),
            rating: rating.or(charity.verification.rating),
            financial_score: charity.verification.financial_score,
            accountability_score: charity.verification.accountability_score,
        };

        let mut active = charity.into_active_model();
        active.verification = Set(verification);
        Ok(active.update(self.db).await?)
    }

    pub async fn count_active(&self) -> Result<u64, ApiError> {
        Ok(Charity::find()
            .filter(Column::IsActive.eq(true))
            .count(self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_db;

    async fn seed(repo: &CharityRepository<'_>, name: &str, category: CharityCategory) -> CharityModel {
        repo.create(CreateCharityData {
            name: name.to_string(),
            ein: format!("98-{}", &Uuid::new_v4().simple().to_string()[..7]),
            description: "A worthy cause".to_string(),
            category,
            subcategory: None,
            website: None,
            address: Address::default(),
            contact_info: None,
            impact: None,
            donation_info: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn list_filters_by_category() {
        let db = setup_db().await;
        let repo = CharityRepository::new(&db);
        seed(&repo, "Tree Planters", CharityCategory::Environment).await;
        seed(&repo, "Scholars Fund", CharityCategory::Education).await;

        let page = repo
            .list(
                CharityFilter {
                    category: Some(CharityCategory::Education),
                    ..Default::default()
                },
                1,
                20,
            )
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Scholars Fund");
    }

    #[tokio::test]
    async fn search_matches_name_or_description() {
        let db = setup_db().await;
        let repo = CharityRepository::new(&db);
        seed(&repo, "Ocean Cleanup", CharityCategory::Environment).await;
        seed(&repo, "Scholars Fund", CharityCategory::Education).await;

        let page = repo
            .list(
                CharityFilter {
                    search: Some("ocean".to_string()),
                    ..Default::default()
                },
                1,
                20,
            )
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Ocean Cleanup");
    }

    #[tokio::test]
    async fn list_sorts_by_total_donations_when_asked() {
        let db = setup_db().await;
        let repo = CharityRepository::new(&db);
        let small = seed(&repo, "Modest Org", CharityCategory::Other).await;
        let big = seed(&repo, "Popular Org", CharityCategory::Other).await;

        let mut active = big.into_active_model();
        active.total_donations = Set(900.0);
        active.update(&db).await.unwrap();
        let mut active = small.into_active_model();
        active.total_donations = Set(10.0);
        active.update(&db).await.unwrap();

        let page = repo
            .list(
                CharityFilter {
                    sort: CharitySort::TotalDonations,
                    ..Default::default()
                },
                1,
                20,
            )
            .await
            .unwrap();
        assert_eq!(page.items[0].name, "Popular Org");
        assert_eq!(page.items[1].name, "Modest Org");

        // The default stays alphabetical.
        let page = repo.list(CharityFilter::default(), 1, 20).await.unwrap();
        assert_eq!(page.items[0].name, "Modest Org");
    }

    #[tokio::test]
    async fn inactive_charities_are_hidden_by_default() {
        let db = setup_db().await;
        let repo = CharityRepository::new(&db);
        let charity = seed(&repo, "Dormant Org", CharityCategory::Other).await;
        repo.update(
            charity,
            UpdateCharityData {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let visible = repo.list(CharityFilter::default(), 1, 20).await.unwrap();
        assert_eq!(visible.total, 0);

        let all = repo
            .list(
                CharityFilter {
                    include_inactive: true,
                    ..Default::default()
                },
                1,
                20,
            )
            .await
            .unwrap();
        assert_eq!(all.total, 1);
    }

    #[tokio::test]
    async fn verify_stamps_the_reviewer_and_time() {
        let db = setup_db().await;
        let repo = CharityRepository::new(&db);
        let charity = seed(&repo, "Vetted Org", CharityCategory::Health).await;
        assert!(!charity.verification.is_verified);

        let verified = repo
            .verify(charity, "admin@platform.example".to_string(), Some(4.5))
            .await
            .unwrap();

        assert!(verified.verification.is_verified);
        assert_eq!(
            verified.verification.verified_by.as_deref(),
            Some("admin@platform.example")
        );
        assert_eq!(verified.verification.rating, Some(4.5));
        assert!(verified.verification.verified_at.is_some());
    }
}
