//! Test utilities for integration tests.
//!
//! Spins up the full application against an in-memory SQLite database and
//! exposes helpers for seeding tenants, users and charities directly
//! through the repositories.

use anyhow::{Context, Result as AnyhowResult};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use uuid::Uuid;

use givingworks::auth::issue_token;
use givingworks::config::AppConfig;
use givingworks::migration::{Migrator, MigratorTrait};
use givingworks::models::charity::{CharityCategory, DonationInfo};
use givingworks::models::company::{CompanySettings, MatchingProgram};
use givingworks::models::user::UserRole;
use givingworks::models::{Address, ContactInfo, charity, company, user};
use givingworks::repositories::charity::CreateCharityData;
use givingworks::repositories::company::{CreateCompanyData, UpdateCompanyData};
use givingworks::repositories::user::CreateUserData;
use givingworks::repositories::{CharityRepository, CompanyRepository, UserRepository};
use givingworks::server::{AppState, create_app};

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool is capped at one connection so every query sees the same
/// in-memory database.
pub async fn setup_test_db() -> AnyhowResult<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Configuration suitable for tests: the local profile defaults plus a
/// cheap bcrypt cost so password hashing does not dominate test time.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        bcrypt_cost: 4,
        ..Default::default()
    }
}

pub struct TestServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<AnyhowResult<()>>>,
}

impl TestServerHandle {
    fn new(shutdown_tx: oneshot::Sender<()>, join_handle: JoinHandle<AnyhowResult<()>>) -> Self {
        Self {
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        }
    }

    #[allow(dead_code)]
    pub async fn shutdown(mut self) -> AnyhowResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            handle.await.context("server task join failed")??;
        }
        Ok(())
    }
}

impl Drop for TestServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Everything a test needs to talk to a running app.
pub struct TestApp {
    pub url: String,
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub client: reqwest::Client,
    _handle: TestServerHandle,
}

impl TestApp {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// Mint a bearer token for `user` without going through login.
    pub fn token_for(&self, user: &user::Model) -> String {
        issue_token(&self.config, user).expect("failed to issue test token")
    }
}

/// Spawns the application on a random local port.
pub async fn spawn_test_app() -> TestApp {
    let db = setup_test_db().await.unwrap();
    let config = Arc::new(test_config());

    let state = AppState {
        config: Arc::clone(&config),
        db: db.clone(),
    };
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{}", addr);

    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        let _ = ready_tx.send(());
        server.await.context("axum server error")
    });

    ready_rx.await.expect("server task to signal readiness");

    TestApp {
        url,
        db,
        config,
        client: reqwest::Client::new(),
        _handle: TestServerHandle::new(shutdown_tx, server_task),
    }
}

/// Seed a tenant with the given matching program and approval setting.
pub async fn seed_company(
    db: &DatabaseConnection,
    matching: MatchingProgram,
    require_approval: bool,
) -> company::Model {
    let repo = CompanyRepository::new(db);
    let company = repo
        .create(CreateCompanyData {
            name: "Test Company".to_string(),
            domain: format!("{}.example", Uuid::new_v4().simple()),
            ein: "12-3456789".to_string(),
            address: Address::default(),
            contact_info: ContactInfo::default(),
            subscription: None,
        })
        .await
        .unwrap();
    let company = repo.set_matching_program(company, matching).await.unwrap();
    repo.update(
        company,
        UpdateCompanyData {
            settings: Some(CompanySettings {
                require_approval_for_donations: require_approval,
                payroll_integration: None,
            }),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

/// Seed a user with a random email. The password hash is not loginable;
/// use [`TestApp::token_for`] for authenticated requests.
pub async fn seed_user(db: &DatabaseConnection, company_id: Uuid, role: UserRole) -> user::Model {
    UserRepository::new(db)
        .create(CreateUserData {
            email: format!("{}@test.example", Uuid::new_v4().simple()),
            password_hash: "not-a-real-hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            company_id,
            employee_id: None,
            department: None,
            position: None,
            phone: None,
        })
        .await
        .unwrap()
}

/// Seed an active charity with no donation constraints.
#[allow(dead_code)]
pub async fn seed_charity(db: &DatabaseConnection) -> charity::Model {
    CharityRepository::new(db)
        .create(CreateCharityData {
            name: format!("Charity {}", Uuid::new_v4().simple()),
            ein: format!("45-{}", &Uuid::new_v4().simple().to_string()[..7]),
            description: "A worthy cause".to_string(),
            category: CharityCategory::Education,
            subcategory: None,
            website: None,
            address: Address::default(),
            contact_info: None,
            impact: None,
            donation_info: Some(DonationInfo::default()),
        })
        .await
        .unwrap()
}
