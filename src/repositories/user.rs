//! # User Repository
//!
//! CRUD and query operations for user entities, including profile overlay
//! updates and the company leaderboard.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::user::{
    ActiveModel as UserActiveModel, Column, Entity as User, Gamification, Model as UserModel,
    NotificationPreferences, Preferences, PrivacyPreferences, UserRole,
};

use super::Page;

/// Request data for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserData {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub company_id: Uuid,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
}

/// Profile overlay: only fields present in the request change.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub notifications: Option<NotificationPreferences>,
    pub privacy: Option<PrivacyPreferences>,
}

/// Repository for user database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserModel>, ApiError> {
        Ok(User::find_by_id(user_id).one(self.db).await?)
    }

    /// Batch lookup keyed by id, for joining names onto donation rows.
    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<std::collections::HashMap<Uuid, UserModel>, ApiError> {
        let users = User::find()
            .filter(Column::Id.is_in(ids))
            .all(self.db)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, ApiError> {
        Ok(User::find()
            .filter(Column::Email.eq(email))
            .one(self.db)
            .await?)
    }

    /// Insert a new user. Duplicate emails surface as 409 via the unique
    /// index on the email column.
    pub async fn create(&self, data: CreateUserData) -> Result<UserModel, ApiError> {
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(data.email),
            password_hash: Set(data.password_hash),
            first_name: Set(data.first_name),
            last_name: Set(data.last_name),
            role: Set(data.role),
            company_id: Set(data.company_id),
            employee_id: Set(data.employee_id),
            department: Set(data.department),
            position: Set(data.position),
            phone: Set(data.phone),
            preferences: Set(Preferences::default()),
            gamification: Set(Gamification::default()),
            is_active: Set(true),
            is_verified: Set(false),
            last_login: Set(None),
            created_at: Set(Utc::now().into()),
        };

        Ok(user.insert(self.db).await?)
    }

    /// List a company's users, newest first, optionally narrowed to one
    /// department.
    pub async fn list_by_company(
        &self,
        company_id: Uuid,
        department: Option<String>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<UserModel>, ApiError> {
        let mut query = User::find().filter(Column::CompanyId.eq(company_id));
        if let Some(department) = department.filter(|d| !d.trim().is_empty()) {
            query = query.filter(Column::Department.eq(department.trim()));
        }

        let paginator = query
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

    /// Cross-tenant listing, newest first. Super-admin surfaces only.
    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<UserModel>, ApiError> {
        let paginator = User::find()
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

    pub async fn count_active(&self) -> Result<u64, ApiError> {
        Ok(User::find()
            .filter(Column::IsActive.eq(true))
            .count(self.db)
            .await?)
    }

    pub async fn count_active_by_company(&self, company_id: Uuid) -> Result<u64, ApiError> {
        Ok(User::find()
            .filter(Column::CompanyId.eq(company_id))
            .filter(Column::IsActive.eq(true))
            .count(self.db)
            .await?)
    }

    /// Apply a field-by-field profile overlay.
    pub async fn update_profile(
        &self,
        user: UserModel,
        data: UpdateProfileData,
    ) -> Result<UserModel, ApiError> {
        let mut preferences = user.preferences.clone();
        if let Some(notifications) = data.notifications {
            preferences.notifications = notifications;
        }
        if let Some(privacy) = data.privacy {
            preferences.privacy = privacy;
        }

        let mut active = user.into_active_model();
        if let Some(first_name) = data.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = data.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(phone) = data.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(department) = data.department {
            active.department = Set(Some(department));
        }
        if let Some(position) = data.position {
            active.position = Set(Some(position));
        }
        active.preferences = Set(preferences);

        Ok(active.update(self.db).await?)
    }

    pub async fn set_password_hash(
        &self,
        user: UserModel,
        password_hash: String,
    ) -> Result<UserModel, ApiError> {
        let mut active = user.into_active_model();
        active.password_hash = Set(password_hash);
        Ok(active.update(self.db).await?)
    }

    pub async fn record_login(&self, user: UserModel) -> Result<UserModel, ApiError> {
        let mut active = user.into_active_model();
        active.last_login = Set(Some(Utc::now().into()));
        Ok(active.update(self.db).await?)
    }

    pub async fn set_active(&self, user: UserModel, is_active: bool) -> Result<UserModel, ApiError> {
        let mut active = user.into_active_model();
        active.is_active = Set(is_active);
        Ok(active.update(self.db).await?)
    }

    pub async fn set_role(&self, user: UserModel, role: UserRole) -> Result<UserModel, ApiError> {
        let mut active = user.into_active_model();
        active.role = Set(role);
        Ok(active.update(self.db).await?)
    }

    /// Company leaderboard: active users who opted in, ranked by total
    /// donated. The opt-in flag lives in a JSON column, so filtering and
    /// ranking happen after the fetch.
    pub async fn leaderboard(
        &self,
        company_id: Uuid,
        limit: usize,
    ) -> Result<Vec<UserModel>, ApiError> {
        let mut users: Vec<UserModel> = User::find()
            .filter(Column::CompanyId.eq(company_id))
            .filter(Column::IsActive.eq(true))
            .all(self.db)
            .await?
            .into_iter()
            .filter(|u| u.preferences.privacy.show_on_leaderboard)
            .collect();

        users.sort_by(|a, b| {
            b.gamification
                .total_donated
                .partial_cmp(&a.gamification.total_donated)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        users.truncate(limit);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{seed_company, seed_user, setup_db};
    use sea_orm::IntoActiveModel;

    #[tokio::test]
    async fn create_and_find_by_email() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;

        let repo = UserRepository::new(&db);
        let created = repo
            .create(CreateUserData {
                email: "ada@acme.example".to_string(),
                password_hash: "hash".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                role: UserRole::Employee,
                company_id: company.id,
                employee_id: Some("E-1".to_string()),
                department: None,
                position: None,
                phone: None,
            })
            .await
            .unwrap();

        let found = repo.find_by_email("ada@acme.example").await.unwrap();
        assert_eq!(found.unwrap().id, created.id);
        assert!(repo.find_by_email("nobody@acme.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let repo = UserRepository::new(&db);

        let data = CreateUserData {
            email: "dup@acme.example".to_string(),
            password_hash: "hash".to_string(),
            first_name: "First".to_string(),
            last_name: "User".to_string(),
            role: UserRole::Employee,
            company_id: company.id,
            employee_id: None,
            department: None,
            position: None,
            phone: None,
        };

        repo.create(data.clone()).await.unwrap();
        let err = repo.create(data).await.unwrap_err();
        assert_eq!(err.code, Box::from("CONFLICT"));
    }

    #[tokio::test]
    async fn profile_overlay_only_touches_provided_fields() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let user = seed_user(&db, company.id).await;
        let repo = UserRepository::new(&db);

        let updated = repo
            .update_profile(
                user,
                UpdateProfileData {
                    department: Some("Engineering".to_string()),
                    privacy: Some(PrivacyPreferences {
                        show_on_leaderboard: false,
                        share_donation_history: false,
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "Test");
        assert_eq!(updated.department.as_deref(), Some("Engineering"));
        assert!(!updated.preferences.privacy.show_on_leaderboard);
        // Untouched sub-document keeps its defaults.
        assert!(updated.preferences.notifications.email);
    }

    #[tokio::test]
    async fn leaderboard_excludes_opt_outs_and_ranks_by_total_donated() {
        let db = setup_db().await;
        let company = seed_company(&db, Default::default(), false).await;
        let repo = UserRepository::new(&db);

        let mut totals = Vec::new();
        for (donated, visible) in [(50.0, true), (200.0, true), (999.0, false)] {
            let user = seed_user(&db, company.id).await;
            let mut active = user.clone().into_active_model();
            active.gamification = Set(Gamification {
                total_donated: donated,
                ..Default::default()
            });
            active.preferences = Set(Preferences {
                privacy: PrivacyPreferences {
                    show_on_leaderboard: visible,
                    share_donation_history: false,
                },
                ..Default::default()
            });
            let updated = active.update(&db).await.unwrap();
            totals.push((updated.id, donated, visible));
        }

        let board = repo.leaderboard(company.id, 10).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].gamification.total_donated, 200.0);
        assert_eq!(board[1].gamification.total_donated, 50.0);
    }
}
