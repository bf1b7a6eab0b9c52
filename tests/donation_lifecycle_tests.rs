//! End-to-end donation lifecycle tests: creation with employer matching,
//! approval workflow, cancellation and transition validation.

use reqwest::StatusCode;
use serde_json::{Value, json};

use givingworks::models::company::{MatchType, MatchingProgram};
use givingworks::models::user::UserRole;
use givingworks::repositories::CompanyRepository;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{seed_charity, seed_company, seed_user, spawn_test_app};

fn fixed_25_program(annual_limit: Option<f64>) -> MatchingProgram {
    MatchingProgram {
        enabled: true,
        match_type: MatchType::Fixed,
        fixed_amount: Some(25.0),
        percentage: None,
        max_match_per_employee: None,
        annual_limit,
        used_amount: 0.0,
        preferred_charities: Vec::new(),
    }
}

#[tokio::test]
async fn donation_with_fixed_match_reserves_budget_and_updates_counters() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, fixed_25_program(Some(1_000.0)), false).await;
    let donor = seed_user(&app.db, company.id, UserRole::Employee).await;
    let charity = seed_charity(&app.db).await;
    let token = app.token_for(&donor);

    let response = app
        .client
        .post(app.endpoint("/api/donations"))
        .bearer_auth(&token)
        .json(&json!({"charity_id": charity.id, "amount": 60.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let donation = &body["data"];
    assert_eq!(donation["status"], json!("approved"));
    assert_eq!(donation["amount"], json!(60.0));
    assert_eq!(donation["matching_amount"], json!(25.0));
    assert_eq!(donation["total_amount"], json!(85.0));

    // The matching reservation is visible on the company row.
    let company = CompanyRepository::new(&app.db)
        .find_by_id(company.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(company.matching_program.used_amount, 25.0);

    // Charity running totals count the combined amount and one donor.
    let response = app
        .client
        .get(app.endpoint(&format!("/api/charities/{}", charity.id)))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_donations"], json!(85.0));
    assert_eq!(body["data"]["total_donors"], json!(1));

    // Gamification counters on the donor reflect the personal amount.
    let response = app
        .client
        .get(app.endpoint("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["gamification"]["total_points"], json!(60));
    assert_eq!(body["data"]["user"]["gamification"]["total_donated"], json!(60.0));
}

#[tokio::test]
async fn match_is_trimmed_to_the_remaining_annual_budget() {
    let app = spawn_test_app().await;
    let mut program = MatchingProgram {
        enabled: true,
        match_type: MatchType::Percentage,
        percentage: Some(100.0),
        fixed_amount: None,
        max_match_per_employee: None,
        annual_limit: Some(1_000.0),
        used_amount: 0.0,
        preferred_charities: Vec::new(),
    };
    program.used_amount = 0.0;
    let company = seed_company(&app.db, program, false).await;

    // Drain most of the budget with a first donation.
    let donor = seed_user(&app.db, company.id, UserRole::Employee).await;
    let charity = seed_charity(&app.db).await;
    let token = app.token_for(&donor);

    for (amount, expected_match) in [(940.0, 940.0), (200.0, 60.0), (50.0, 0.0)] {
        let response = app
            .client
            .post(app.endpoint("/api/donations"))
            .bearer_auth(&token)
            .json(&json!({"charity_id": charity.id, "amount": amount}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["data"]["matching_amount"],
            json!(expected_match),
            "amount {amount}"
        );
    }

    let company = CompanyRepository::new(&app.db)
        .find_by_id(company.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(company.matching_program.used_amount, 1_000.0);
}

#[tokio::test]
async fn pending_donations_defer_counters_until_approval() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, fixed_25_program(None), true).await;
    let donor = seed_user(&app.db, company.id, UserRole::Employee).await;
    let admin = seed_user(&app.db, company.id, UserRole::HrAdmin).await;
    let charity = seed_charity(&app.db).await;

    let response = app
        .client
        .post(app.endpoint("/api/donations"))
        .bearer_auth(app.token_for(&donor))
        .json(&json!({"charity_id": charity.id, "amount": 40.0}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], json!("pending"));
    let donation_id = body["data"]["id"].as_str().unwrap().to_string();

    // Counters are untouched while pending.
    let response = app
        .client
        .get(app.endpoint(&format!("/api/charities/{}", charity.id)))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_donations"], json!(0.0));

    let response = app
        .client
        .put(app.endpoint(&format!("/api/donations/{donation_id}/status")))
        .bearer_auth(app.token_for(&admin))
        .json(&json!({"status": "approved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(app.endpoint(&format!("/api/charities/{}", charity.id)))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_donations"], json!(65.0));
    assert_eq!(body["data"]["total_donors"], json!(1));
}

#[tokio::test]
async fn cancelling_releases_the_matching_reservation() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, fixed_25_program(Some(500.0)), false).await;
    let donor = seed_user(&app.db, company.id, UserRole::Employee).await;
    let charity = seed_charity(&app.db).await;
    let token = app.token_for(&donor);

    let response = app
        .client
        .post(app.endpoint("/api/donations"))
        .bearer_auth(&token)
        .json(&json!({"charity_id": charity.id, "amount": 30.0}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let donation_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .put(app.endpoint(&format!("/api/donations/{donation_id}/cancel")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], json!("cancelled"));

    let company = CompanyRepository::new(&app.db)
        .find_by_id(company.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(company.matching_program.used_amount, 0.0);

    // A second cancel hits the terminal-state guard.
    let response = app
        .client
        .put(app.endpoint(&format!("/api/donations/{donation_id}/cancel")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("INVALID_STATE_TRANSITION"));
}

#[tokio::test]
async fn skipping_lifecycle_steps_is_rejected() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), true).await;
    let donor = seed_user(&app.db, company.id, UserRole::Employee).await;
    let admin = seed_user(&app.db, company.id, UserRole::HrAdmin).await;
    let charity = seed_charity(&app.db).await;

    let response = app
        .client
        .post(app.endpoint("/api/donations"))
        .bearer_auth(app.token_for(&donor))
        .json(&json!({"charity_id": charity.id, "amount": 10.0}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let donation_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .put(app.endpoint(&format!("/api/donations/{donation_id}/status")))
        .bearer_auth(app.token_for(&admin))
        .json(&json!({"status": "completed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("INVALID_STATE_TRANSITION"));
}

#[tokio::test]
async fn validation_failures_report_field_errors() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), false).await;
    let donor = seed_user(&app.db, company.id, UserRole::Employee).await;
    let charity = seed_charity(&app.db).await;

    let response = app
        .client
        .post(app.endpoint("/api/donations"))
        .bearer_auth(app.token_for(&donor))
        .json(&json!({
            "charity_id": charity.id,
            "amount": -5.0,
            "type": "recurring",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
    assert!(body["errors"]["amount"].is_string());
    assert!(body["errors"]["frequency"].is_string());
}

#[tokio::test]
async fn employees_cannot_read_donations_of_other_tenants() {
    let app = spawn_test_app().await;
    let company_a = seed_company(&app.db, MatchingProgram::default(), false).await;
    let company_b = seed_company(&app.db, MatchingProgram::default(), false).await;
    let donor = seed_user(&app.db, company_a.id, UserRole::Employee).await;
    let outsider = seed_user(&app.db, company_b.id, UserRole::HrAdmin).await;
    let charity = seed_charity(&app.db).await;

    let response = app
        .client
        .post(app.endpoint("/api/donations"))
        .bearer_auth(app.token_for(&donor))
        .json(&json!({"charity_id": charity.id, "amount": 20.0}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let donation_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .get(app.endpoint(&format!("/api/donations/{donation_id}")))
        .bearer_auth(app.token_for(&outsider))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
