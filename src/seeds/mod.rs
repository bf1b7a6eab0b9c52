//! Database seeding functionality
//!
//! Populates a development database with two demo companies, their users,
//! a small charity catalog and donations across the lifecycle. Seeding is
//! idempotent: companies are keyed by domain and skipped when present, so
//! running it twice does not duplicate data or inflate counters.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::models::charity::{CharityCategory, DonationInfo};
use crate::models::company::{MatchType, MatchingProgram};
use crate::models::donation::{DonationStatus, DonationType, PaymentMethod};
use crate::models::user::UserRole;
use crate::models::{Address, ContactInfo, charity, company, user};
use crate::repositories::charity::CreateCharityData;
use crate::repositories::company::CreateCompanyData;
use crate::repositories::donation::CreateDonationData;
use crate::repositories::user::CreateUserData;
use crate::repositories::{
    CharityRepository, CompanyRepository, DonationRepository, UserRepository,
};

/// Every seeded account shares this password.
pub const DEMO_PASSWORD: &str = "password123";

pub async fn seed_all(config: &AppConfig, db: &DatabaseConnection) -> Result<()> {
    let charities = seed_charities(db).await?;

    let acme = seed_company_with_users(
        config,
        db,
        CompanyDefinition {
            name: "Acme Corporation",
            domain: "acme.example",
            ein: "12-3456789",
            matching: MatchingProgram {
                enabled: true,
                match_type: MatchType::Percentage,
                percentage: Some(50.0),
                fixed_amount: None,
                max_match_per_employee: Some(500.0),
                annual_limit: Some(10_000.0),
                used_amount: 0.0,
                preferred_charities: Vec::new(),
            },
            require_approval: false,
        },
    )
    .await?;

    let globex = seed_company_with_users(
        config,
        db,
        CompanyDefinition {
            name: "Globex Industries",
            domain: "globex.example",
            ein: "98-7654321",
            matching: MatchingProgram {
                enabled: true,
                match_type: MatchType::Fixed,
                fixed_amount: Some(25.0),
                percentage: None,
                max_match_per_employee: None,
                annual_limit: Some(2_000.0),
                used_amount: 0.0,
                preferred_charities: Vec::new(),
            },
            require_approval: true,
        },
    )
    .await?;

    if let Some(seeded) = acme {
        seed_donations(db, &seeded, &charities).await?;
    }
    if let Some(seeded) = globex {
        seed_donations(db, &seeded, &charities).await?;
    }

    log::info!("Database seeding completed successfully");
    Ok(())
}

struct CompanyDefinition {
    name: &'static str,
    domain: &'static str,
    ein: &'static str,
    matching: MatchingProgram,
    require_approval: bool,
}

struct SeededCompany {
    employees: Vec<user::Model>,
}

async fn seed_charities(db: &DatabaseConnection) -> Result<Vec<charity::Model>> {
    let repo = CharityRepository::new(db);
    let definitions: [(&str, &str, CharityCategory, bool); 5] = [
        (
            "Clean Water Initiative",
            "45-0000001",
            CharityCategory::Environment,
            true,
        ),
        (
            "Books for All",
            "45-0000002",
            CharityCategory::Education,
            true,
        ),
        (
            "City Food Bank",
            "45-0000003",
            CharityCategory::HumanServices,
            false,
        ),
        (
            "Rural Health Outreach",
            "45-0000004",
            CharityCategory::Health,
            false,
        ),
        (
            "Shelter Paws",
            "45-0000005",
            CharityCategory::Animals,
            false,
        ),
    ];

    let mut out = Vec::with_capacity(definitions.len());
    for (name, ein, category, featured) in definitions {
        let existing = repo
            .list(
                crate::repositories::charity::CharityFilter {
                    search: Some(name.to_string()),
                    include_inactive: true,
                    ..Default::default()
                },
                1,
                1,
            )
            .await?;
        if let Some(found) = existing.items.into_iter().next() {
            log::info!("Charity '{}' already exists, skipping", name);
            out.push(found);
            continue;
        }

        let created = repo
            .create(CreateCharityData {
                name: name.to_string(),
                ein: ein.to_string(),
                description: format!("{name} is a demo charity for local development."),
                category,
                subcategory: None,
                website: None,
                address: Address {
                    street: "1 Charity Way".to_string(),
                    city: "Springfield".to_string(),
                    state: "IL".to_string(),
                    zip_code: "62704".to_string(),
                },
                contact_info: Some(ContactInfo {
                    email: format!("hello@{}", name.to_lowercase().replace(' ', "-")),
                    phone: None,
                }),
                impact: None,
                donation_info: Some(DonationInfo {
                    min_donation: Some(5.0),
                    max_donation: None,
                    suggested_amounts: vec![10.0, 25.0, 50.0, 100.0],
                    accepts_recurring: true,
                }),
            })
            .await
            .with_context(|| format!("failed to seed charity {name}"))?;

        if featured {
            repo.update(
                created.clone(),
                crate::repositories::charity::UpdateCharityData {
                    is_featured: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        }
        out.push(created);
    }

    Ok(out)
}

async fn seed_company_with_users(
    config: &AppConfig,
    db: &DatabaseConnection,
    definition: CompanyDefinition,
) -> Result<Option<SeededCompany>> {
    let companies = CompanyRepository::new(db);
    if companies.find_by_domain(definition.domain).await?.is_some() {
        log::info!("Company '{}' already exists, skipping", definition.domain);
        return Ok(None);
    }

    let company = companies
        .create(CreateCompanyData {
            name: definition.name.to_string(),
            domain: definition.domain.to_string(),
            ein: definition.ein.to_string(),
            address: Address::default(),
            contact_info: ContactInfo {
                email: format!("admin@{}", definition.domain),
                phone: None,
            },
            subscription: None,
        })
        .await
        .with_context(|| format!("failed to seed company {}", definition.domain))?;

    let company = companies
        .set_matching_program(company, definition.matching)
        .await?;
    let company = companies
        .update(
            company,
            crate::repositories::company::UpdateCompanyData {
                settings: Some(company::CompanySettings {
                    require_approval_for_donations: definition.require_approval,
                    payroll_integration: None,
                }),
                ..Default::default()
            },
        )
        .await?;

    let users = UserRepository::new(db);
    let password_hash = hash_password(config, DEMO_PASSWORD)
        .map_err(|err| anyhow::anyhow!("failed to hash demo password: {err}"))?;

    let mut employees = Vec::new();
    let roster: [(&str, &str, UserRole, &str); 4] = [
        ("hr", "Admin", UserRole::HrAdmin, "People"),
        ("ada", "Lovelace", UserRole::Employee, "Engineering"),
        ("grace", "Hopper", UserRole::Employee, "Engineering"),
        ("jean", "Bartik", UserRole::Employee, "Finance"),
    ];
    for (first, last, role, department) in roster {
        let created = users
            .create(CreateUserData {
                email: format!("{first}@{}", definition.domain),
                password_hash: password_hash.clone(),
                first_name: capitalize(first),
                last_name: last.to_string(),
                role,
                company_id: company.id,
                employee_id: Some(format!("E-{}", &Uuid::new_v4().simple().to_string()[..6])),
                department: Some(department.to_string()),
                position: None,
                phone: None,
            })
            .await?;
        if role == UserRole::Employee {
            employees.push(created);
        }
    }

    // One cross-tenant super admin, created alongside the first company.
    if users.find_by_email("root@givingworks.example").await?.is_none() {
        users
            .create(CreateUserData {
                email: "root@givingworks.example".to_string(),
                password_hash: password_hash.clone(),
                first_name: "Platform".to_string(),
                last_name: "Admin".to_string(),
                role: UserRole::SuperAdmin,
                company_id: company.id,
                employee_id: None,
                department: None,
                position: None,
                phone: None,
            })
            .await?;
    }

    Ok(Some(SeededCompany { employees }))
}

/// Create donations through the repository so matching reservations and
/// running counters stay consistent, then walk a few of them through the
/// lifecycle to produce completed and cancelled examples.
async fn seed_donations(
    db: &DatabaseConnection,
    seeded: &SeededCompany,
    charities: &[charity::Model],
) -> Result<()> {
    let donations = DonationRepository::new(db);
    let amounts = [25.0, 60.0, 100.0, 40.0, 250.0, 15.0];

    for (i, amount) in amounts.into_iter().enumerate() {
        let donor = &seeded.employees[i % seeded.employees.len()];
        let charity = &charities[i % charities.len()];

        let donation = donations
            .create(
                donor,
                charity,
                CreateDonationData {
                    charity_id: charity.id,
                    amount,
                    donation_type: DonationType::OneTime,
                    frequency: None,
                    payment_method: PaymentMethod::DirectPayment,
                    payroll_info: None,
                    notes: None,
                    is_anonymous: i % 5 == 0,
                    tax_deductible: true,
                },
            )
            .await?;

        match i % 3 {
            // Walk to completed so tax records have material.
            0 => {
                let donation = if donation.status == DonationStatus::Pending {
                    donations
                        .update_status(donation, DonationStatus::Approved, None)
                        .await?
                } else {
                    donation
                };
                let donation = donations
                    .update_status(donation, DonationStatus::Processing, None)
                    .await?;
                donations
                    .update_status(donation, DonationStatus::Completed, None)
                    .await?;
            }
            // Leave in its initial state (pending or approved).
            1 => {}
            // Cancel to exercise reservation release.
            _ => {
                donations.cancel(donation).await?;
            }
        }
    }

    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
