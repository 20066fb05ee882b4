//! End-to-end flows against a real Postgres.
//!
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::FromRef,
    http::{header, Method, Request, StatusCode},
    Router,
};
use dreambid::{
    activity::{self, ActivityEvent, ActivityKind, ActivityLogger},
    app::build_app,
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    config::{AppConfig, JwtConfig},
    db,
    properties,
    state::AppState,
    storage::{LocalStorage, StorageClient},
    users::{Role, User},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

struct Harness {
    app: Router,
    state: AppState,
}

async fn harness() -> Harness {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&database_url)
        .await
        .expect("connect");
    db::bootstrap(&pool).await.expect("bootstrap");

    let uploads_dir = std::env::temp_dir().join(format!("dreambid-it-{}", Uuid::new_v4()));
    let config = Arc::new(AppConfig {
        database_url,
        jwt: JwtConfig {
            secret: "integration".into(),
            issuer: "dreambid".into(),
            audience: "dreambid-users".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        },
        uploads_dir: uploads_dir.clone(),
        activity_queue_capacity: 64,
        db_bootstrap: false,
    });
    let storage = Arc::new(LocalStorage::new(&uploads_dir).await.unwrap()) as Arc<dyn StorageClient>;
    let activity = ActivityLogger::spawn(pool.clone(), 64);
    let state = AppState::from_parts(pool, config, storage, activity);

    Harness {
        app: build_app(state.clone()),
        state,
    }
}

async fn create_user(state: &AppState, password: &str, role: Role) -> (User, String) {
    create_named_user(state, "Test User", password, role).await
}

async fn create_named_user(
    state: &AppState,
    full_name: &str,
    password: &str,
    role: Role,
) -> (User, String) {
    let email = format!("it-{}@example.com", Uuid::new_v4());
    let hash = hash_password(password).unwrap();
    let user = User::create(&state.db, &email, &hash, Some(full_name), None, role)
        .await
        .unwrap();
    let token = JwtKeys::from_ref(state).sign_access(user.id, role).unwrap();
    (user, token)
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({ "email": email, "password": password });
    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: Method, uri: &str, token: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn change_password_request(token: &str, current: &str, new: &str) -> Request<Body> {
    let body = serde_json::json!({
        "currentPassword": current,
        "newPassword": new,
        "confirmPassword": new,
    });
    Request::builder()
        .method(Method::POST)
        .uri("/api/user/change-password")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn wrong_current_password_leaves_hash_untouched() {
    let h = harness().await;
    let (user, token) = create_user(&h.state, "original-pass", Role::User).await;

    let (status, json) = call(&h.app, change_password_request(&token, "not-the-pass", "brand-new-pass")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Current password is incorrect");

    let stored = User::find_by_id(&h.state.db, user.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, user.password_hash);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn change_password_replaces_hash() {
    let h = harness().await;
    let (user, token) = create_user(&h.state, "original-pass", Role::User).await;

    let (status, json) = call(&h.app, change_password_request(&token, "original-pass", "brand-new-pass")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Password changed successfully");

    let stored = User::find_by_id(&h.state.db, user.id).await.unwrap().unwrap();
    assert!(verify_password("brand-new-pass", &stored.password_hash).unwrap());
    assert!(!verify_password("original-pass", &stored.password_hash).unwrap());

    let (status, json) = call(&h.app, login_request(&user.email, "brand-new-pass")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["id"], user.id.to_string());

    let (status, json) = call(&h.app, login_request(&user.email, "original-pass")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn photo_upload_then_delete() {
    let h = harness().await;
    let (_, token) = create_user(&h.state, "original-pass", Role::User).await;

    let boundary = "dreambidboundary";
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"me.PNG\"\r\nContent-Type: image/png\r\n\r\n",
        b = boundary
    )
    .into_bytes();
    body.extend_from_slice(&[0x89, b'P', b'N', b'G', 1, 2, 3]);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let (status, json) = call(
        &h.app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/user/upload-photo")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let photo_url = json["user"]["profile_photo"].as_str().unwrap().to_string();
    assert!(photo_url.starts_with("/uploads/profile_"));
    assert!(photo_url.ends_with(".png"));

    let file = h
        .state
        .config
        .uploads_dir
        .join(photo_url.trim_start_matches("/uploads/"));
    assert!(file.exists());

    let (status, json) = call(
        &h.app,
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/user/photo")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["user"]["profile_photo"].is_null());
    assert!(!file.exists());

    // Nothing left to delete
    let (status, _) = call(
        &h.app,
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/user/photo")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn admin_can_deactivate_and_login_is_refused() {
    let h = harness().await;
    let (_, admin_token) = create_user(&h.state, "admin-pass-1", Role::Admin).await;
    let (target, _) = create_user(&h.state, "target-pass", Role::User).await;

    let (status, json) = call(
        &h.app,
        Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/user/{}/status", target.id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"is_active":false}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["is_active"], false);

    let login = serde_json::json!({ "email": target.email, "password": "target-pass" });
    let (status, _) = call(
        &h.app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(login.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn search_treats_wildcards_literally() {
    let h = harness().await;
    let (_, admin_token) = create_user(&h.state, "admin-pass-1", Role::Admin).await;
    let tag = Uuid::new_v4().simple().to_string();
    let (literal, _) =
        create_named_user(&h.state, &format!("{} 50%_deal", tag), "pass-word-1", Role::User).await;
    create_named_user(&h.state, &format!("{} 50xydeal", tag), "pass-word-1", Role::User).await;

    // "<tag> 50%_" URL-encoded
    let uri = format!("/api/user/all?search={}%2050%25_", tag);
    let (status, json) = call(&h.app, authed(Method::GET, &uri, &admin_token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], literal.id.to_string());

    // The plain tag matches both
    let uri = format!("/api/user/all?search={}", tag);
    let (_, json) = call(&h.app, authed(Method::GET, &uri, &admin_token, None)).await;
    assert_eq!(json["total"], 2);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn role_update_rejects_staff_and_unknown_users() {
    let h = harness().await;
    let (_, admin_token) = create_user(&h.state, "admin-pass-1", Role::Admin).await;
    let (target, _) = create_user(&h.state, "target-pass", Role::User).await;

    let uri = format!("/api/user/{}/role", target.id);
    let (status, json) = call(
        &h.app,
        authed(Method::PUT, &uri, &admin_token, Some(r#"{"role":"staff"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid role specified");
    let stored = User::find_by_id(&h.state.db, target.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::User);

    let uri = format!("/api/user/{}/role", Uuid::new_v4());
    let (status, json) = call(
        &h.app,
        authed(Method::PUT, &uri, &admin_token, Some(r#"{"role":"admin"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "User not found");

    let uri = format!("/api/user/{}/role", target.id);
    let (status, json) = call(
        &h.app,
        authed(Method::PUT, &uri, &admin_token, Some(r#"{"role":"admin"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["role"], "admin");
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn activity_is_paginated_with_total() {
    let h = harness().await;
    let (user, token) = create_user(&h.state, "original-pass", Role::User).await;

    for kind in [
        ActivityKind::Login,
        ActivityKind::ProfileUpdated,
        ActivityKind::PasswordChanged,
    ] {
        h.state.activity.record(ActivityEvent::new(user.id, kind));
    }

    // Wait for the writer task to drain the queue
    let mut written = 0;
    for _ in 0..100 {
        written = activity::repo::count_for_user(&h.state.db, user.id).await.unwrap();
        if written == 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(written, 3);

    let (status, json) = call(
        &h.app,
        authed(Method::GET, "/api/user/activity?limit=2&offset=0", &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 3);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["activities"].as_array().unwrap().len(), 2);

    let (_, json) = call(
        &h.app,
        authed(Method::GET, "/api/user/activity?limit=2&offset=2", &token, None),
    )
    .await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["offset"], 2);
    assert_eq!(json["activities"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn duplicate_insert_is_a_unique_violation() {
    let h = harness().await;
    let (user, _) = create_user(&h.state, "original-pass", Role::User).await;
    let err = User::create(&h.state.db, &user.email, "hash", None, None, Role::User)
        .await
        .unwrap_err();
    assert!(db::is_unique_violation(&err));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_registrations_yield_one_conflict() {
    let h = harness().await;
    let email = format!("race-{}@example.com", Uuid::new_v4());
    let register = || {
        let body = serde_json::json!({ "email": email, "password": "race-pass-1" });
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (a, b) = tokio::join!(call(&h.app, register()), call(&h.app, register()));
    let mut statuses = vec![a.0, b.0];
    statuses.sort_by_key(|s| s.as_u16());
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    let conflict = if a.0 == StatusCode::CONFLICT { a.1 } else { b.1 };
    assert_eq!(conflict["message"], "Email already registered");
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn seeding_walks_properties_in_id_order() {
    let h = harness().await;
    for title in ["Seed test A", "Seed test B", "Seed test C"] {
        sqlx::query("INSERT INTO properties (title) VALUES ($1)")
            .bind(title)
            .execute(&h.state.db)
            .await
            .unwrap();
    }

    let ids = properties::repo::list_ids(&h.state.db).await.unwrap();
    assert!(ids.len() >= 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}
