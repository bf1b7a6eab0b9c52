//! Integration tests for registration, login and the current-user endpoints.

use reqwest::StatusCode;
use serde_json::{Value, json};

use givingworks::models::company::MatchingProgram;
use givingworks::models::user::UserRole;
use givingworks::repositories::{CompanyRepository, UserRepository};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{seed_company, seed_user, spawn_test_app};

#[tokio::test]
async fn register_login_and_me_roundtrip() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), false).await;

    let response = app
        .client
        .post(app.endpoint("/api/auth/register"))
        .json(&json!({
            "email": "Ada@Test.example",
            "password": "hunter2hunter2",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "company_domain": company.domain,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    // Email is normalized and the hash never serialized.
    assert_eq!(body["data"]["user"]["email"], json!("ada@test.example"));
    assert!(body["data"]["user"].get("password_hash").is_none());
    assert_eq!(body["data"]["user"]["role"], json!("employee"));

    let response = app
        .client
        .post(app.endpoint("/api/auth/login"))
        .json(&json!({
            "email": "ada@test.example",
            "password": "hunter2hunter2",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let response = app
        .client
        .get(app.endpoint("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["company"]["id"], json!(company.id));
}

#[tokio::test]
async fn register_rejects_unknown_company_domain() {
    let app = spawn_test_app().await;

    let response = app
        .client
        .post(app.endpoint("/api/auth/register"))
        .json(&json!({
            "email": "nobody@nowhere.example",
            "password": "hunter2hunter2",
            "first_name": "No",
            "last_name": "Body",
            "company_domain": "nowhere.example",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
}

#[tokio::test]
async fn register_rejects_duplicate_email_with_conflict() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), false).await;

    let payload = json!({
        "email": "dup@test.example",
        "password": "hunter2hunter2",
        "first_name": "First",
        "last_name": "User",
        "company_domain": company.domain,
    });

    let response = app
        .client
        .post(app.endpoint("/api/auth/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .client
        .post(app.endpoint("/api/auth/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("CONFLICT"));
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email_identically() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), false).await;

    app.client
        .post(app.endpoint("/api/auth/register"))
        .json(&json!({
            "email": "grace@test.example",
            "password": "hunter2hunter2",
            "first_name": "Grace",
            "last_name": "Hopper",
            "company_domain": company.domain,
        }))
        .send()
        .await
        .unwrap();

    for (email, password) in [
        ("grace@test.example", "wrong-password"),
        ("missing@test.example", "hunter2hunter2"),
    ] {
        let response = app
            .client
            .post(app.endpoint("/api/auth/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], json!("Invalid credentials"));
    }
}

#[tokio::test]
async fn deactivated_users_get_the_same_login_rejection() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), false).await;

    app.client
        .post(app.endpoint("/api/auth/register"))
        .json(&json!({
            "email": "gone@test.example",
            "password": "hunter2hunter2",
            "first_name": "Gone",
            "last_name": "User",
            "company_domain": company.domain,
        }))
        .send()
        .await
        .unwrap();

    let repo = UserRepository::new(&app.db);
    let user = repo.find_by_email("gone@test.example").await.unwrap().unwrap();
    repo.set_active(user, false).await.unwrap();

    let response = app
        .client
        .post(app.endpoint("/api/auth/login"))
        .json(&json!({"email": "gone@test.example", "password": "hunter2hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    // Indistinguishable from a wrong password.
    assert_eq!(body["message"], json!("Invalid credentials"));
}

#[tokio::test]
async fn login_is_rejected_when_the_company_is_deactivated() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), false).await;

    app.client
        .post(app.endpoint("/api/auth/register"))
        .json(&json!({
            "email": "stranded@test.example",
            "password": "hunter2hunter2",
            "first_name": "Stranded",
            "last_name": "User",
            "company_domain": company.domain,
        }))
        .send()
        .await
        .unwrap();

    CompanyRepository::new(&app.db)
        .set_active(company, false)
        .await
        .unwrap();

    let response = app
        .client
        .post(app.endpoint("/api/auth/login"))
        .json(&json!({"email": "stranded@test.example", "password": "hunter2hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], json!("Company account is deactivated"));
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = spawn_test_app().await;

    let response = app
        .client
        .get(app.endpoint("/api/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .get(app.endpoint("/api/donations"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_catalog_needs_no_token_but_mutations_do() {
    let app = spawn_test_app().await;

    let response = app
        .client
        .get(app.endpoint("/api/charities"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .post(app.endpoint("/api/charities"))
        .json(&json!({"name": "X", "ein": "1", "description": "d", "category": "other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn employee_tokens_cannot_reach_admin_surfaces() {
    let app = spawn_test_app().await;
    let company = seed_company(&app.db, MatchingProgram::default(), false).await;
    let employee = seed_user(&app.db, company.id, UserRole::Employee).await;
    let token = app.token_for(&employee);

    let response = app
        .client
        .get(app.endpoint("/api/admin/dashboard"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], json!("FORBIDDEN"));
}
