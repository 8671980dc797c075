/// Authentication flows against a real database
///
/// Run with a migrated PostgreSQL at `DATABASE_URL`:
///
/// ```bash
/// cargo test -p scopegate-api --test auth_flow_tests -- --ignored
/// ```

mod common;

use axum::http::{Method, StatusCode};
use common::{TestContext, PASSWORD};
use scopegate_shared::models::{session::Session, user::User};
use serde_json::json;

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_register_sends_verification_and_grants_defaults() {
    let mut ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email();

    let (status, body) = ctx
        .call(
            Method::POST,
            "/register",
            None,
            Some(json!({"email": email, "password": PASSWORD})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["email"], email);
    assert_eq!(body["data"]["email_verified"], false);
    assert!(body["data"].get("password_hash").is_none());

    let user = User::find_by_email(&ctx.db, &email).await.unwrap().unwrap();
    ctx.track(user.id);
    assert!(ctx.mailed_token(&email).await.is_some());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_duplicate_email_conflicts() {
    let mut ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email();
    ctx.register(&email).await.unwrap();

    let (status, body) = ctx
        .call(
            Method::POST,
            "/register",
            None,
            Some(json!({"email": email.to_uppercase(), "password": PASSWORD})),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already registered");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_login_requires_verified_email() {
    let mut ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email();
    ctx.register(&email).await.unwrap();

    let (status, body) = ctx
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": email, "password": PASSWORD})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Email not verified");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_login_rejects_bad_credentials() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.verified_user().await.unwrap();

    for (email, password) in [
        (user.email.as_str(), "Wr0ng!Password"),
        ("nobody-here@example.com", PASSWORD),
    ] {
        let (status, body) = ctx
            .call(
                Method::POST,
                "/login",
                None,
                Some(json!({"email": email, "password": password})),
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_login_once_then_conflict_until_logout() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.verified_user().await.unwrap();

    let (status, body) = ctx
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": user.email, "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert!(body["data"]["refresh_token"].is_string());
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": user.email, "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already logged in");

    let (status, _) = ctx.call(Method::POST, "/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!Session::has_active(&ctx.db, user.id).await.unwrap());

    // The access token died with its session
    let (status, _) = ctx.call(Method::GET, "/post", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(ctx.login(&user.email).await.is_ok());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_refresh_issues_new_access_token() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.verified_user().await.unwrap();

    let (_, body) = ctx
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": user.email, "password": PASSWORD})),
        )
        .await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .call(
            Method::POST,
            "/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let renewed = body["data"]["access_token"].as_str().unwrap();

    let (status, _) = ctx.call(Method::GET, "/post", Some(renewed), None).await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not accepted as a refresh token
    let (status, _) = ctx
        .call(
            Method::POST,
            "/refresh",
            None,
            Some(json!({"refresh_token": access})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_verification_token_is_single_use() {
    let mut ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email();
    ctx.register(&email).await.unwrap();
    let token = ctx.mailed_token(&email).await.unwrap();

    let (status, _) = ctx
        .call(Method::POST, "/verify-email", None, Some(json!({"token": token})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .call(Method::POST, "/verify-email", None, Some(json!({"token": token})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired token");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_resend_verification_replaces_token() {
    let mut ctx = TestContext::new().await.unwrap();
    let email = TestContext::unique_email();
    ctx.register(&email).await.unwrap();
    let first = ctx.mailed_token(&email).await.unwrap();

    let (status, _) = ctx
        .call(
            Method::POST,
            "/resend-verification",
            None,
            Some(json!({"email": email})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = ctx.mailed_token(&email).await.unwrap();
    assert_ne!(first, second);

    let (status, _) = ctx
        .call(Method::POST, "/verify-email", None, Some(json!({"token": first})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .call(Method::POST, "/verify-email", None, Some(json!({"token": second})))
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_unknown_email_gets_same_answer() {
    let ctx = TestContext::new().await.unwrap();

    for uri in ["/forgot-password", "/resend-verification"] {
        let (status, body) = ctx
            .call(
                Method::POST,
                uri,
                None,
                Some(json!({"email": "nobody-here@example.com"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["status"], "success");
    }

    assert!(ctx.mailer.last_to("nobody-here@example.com").await.is_none());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_password_reset_revokes_sessions() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.verified_user().await.unwrap();
    let access = ctx.login(&user.email).await.unwrap();

    let (status, _) = ctx
        .call(
            Method::POST,
            "/forgot-password",
            None,
            Some(json!({"email": user.email})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = ctx.mailed_token(&user.email).await.unwrap();

    // Weak password is refused without burning the token
    let (status, _) = ctx
        .call(
            Method::POST,
            "/reset-password",
            None,
            Some(json!({"token": token, "password": "weakpassword"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let new_password = "N3w!Passw0rd";
    let (status, _) = ctx
        .call(
            Method::POST,
            "/reset-password",
            None,
            Some(json!({"token": token, "password": new_password})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.call(Method::GET, "/post", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": user.email, "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({"email": user.email, "password": new_password})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_concurrent_logins_admit_one() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.verified_user().await.unwrap();
    let credentials = json!({"email": user.email, "password": PASSWORD});

    let (first, second) = tokio::join!(
        ctx.call(Method::POST, "/login", None, Some(credentials.clone())),
        ctx.call(Method::POST, "/login", None, Some(credentials.clone())),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    // Only the winner holds a session
    assert_eq!(Session::revoke_all_for_user(&ctx.db, user.id).await.unwrap(), 1);

    ctx.cleanup().await.unwrap();
}
