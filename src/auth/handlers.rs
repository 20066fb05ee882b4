use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, is_long_enough, verify_password},
    policy::{Policy, StaffOrAdmin},
};
use crate::{
    activity::{ActivityEvent, ActivityKind},
    db,
    error::{ApiError, ApiResult, OrInternal},
    extract::AppJson,
    state::AppState,
    users::{Role, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/refresh", post(refresh))
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys
        .sign_access(user.id, user.role)
        .or_internal("Failed to issue token")?;
    let refresh_token = keys
        .sign_refresh(user.id, user.role)
        .or_internal("Failed to issue token")?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user,
    })
}

/// Checks credentials and account status.
async fn authenticate(state: &AppState, payload: &LoginRequest) -> ApiResult<User> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    let Some(user) = User::find_by_email(&state.db, &email)
        .await
        .or_internal("Login failed")?
    else {
        warn!(%email, "login unknown email");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let ok = verify_password(&payload.password, &user.password_hash).or_internal("Login failed")?;
    if !ok {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login to deactivated account");
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    Ok(user)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    if !is_long_enough(&payload.password) {
        warn!("password too short");
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }

    // Ensure email is not taken
    if User::find_by_email(&state.db, &email)
        .await
        .or_internal("Registration failed")?
        .is_some()
    {
        warn!(%email, "email already registered");
        return Err(ApiError::conflict("Email already registered"));
    }

    let hash = hash_password(&payload.password).or_internal("Registration failed")?;
    let full_name = payload.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let user = User::create(
        &state.db,
        &email,
        &hash,
        full_name,
        payload.phone.as_deref(),
        Role::User,
    )
    .await
    .map_err(|e| {
        // A concurrent registration won the unique constraint
        if db::is_unique_violation(&e) {
            warn!(%email, "email already registered");
            ApiError::conflict("Email already registered")
        } else {
            ApiError::Internal {
                message: "Registration failed",
                source: e,
            }
        }
    })?;

    state
        .activity
        .record(ActivityEvent::new(user.id, ActivityKind::Register));

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = authenticate(&state, &payload).await?;

    state
        .activity
        .record(ActivityEvent::new(user.id, ActivityKind::Login));

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

/// Login for the admin dashboard: only admin and staff accounts get tokens.
#[instrument(skip(state, payload))]
pub async fn admin_login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = authenticate(&state, &payload).await?;

    if !StaffOrAdmin::allows(user.role) {
        warn!(user_id = %user.id, role = %user.role, "dashboard login refused");
        return Err(ApiError::forbidden(StaffOrAdmin::DENIED));
    }

    state
        .activity
        .record(ActivityEvent::new(user.id, ActivityKind::Login));

    info!(user_id = %user.id, role = %user.role, "dashboard login");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    // Reload so role and status changes take effect on refresh
    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .or_internal("Failed to refresh token")?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    Ok(Json(issue_tokens(&state, user)?))
}
