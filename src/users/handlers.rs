use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        ActivityPage, ActivityQuery, ChangePasswordRequest, MessageResponse, Pagination,
        StatsQuery, UpdateProfileRequest, UpdateRoleRequest, UpdateStatusRequest, UserDetails,
        UserList, UserResponse, UsersQuery,
    },
    repo_types::User,
    services,
};
use crate::{
    activity::{self, ActivityEvent, ActivityKind, ActivityStats, ActivityView},
    auth::{
        extractors::AuthUser,
        password::{hash_password, verify_password},
        policy::AdminUser,
    },
    error::{ApiError, ApiResult, OrInternal},
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
    storage::key_from_public_url,
};

pub const PHOTO_MAX_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_STATS_DAYS: i64 = 30;
const DETAIL_ACTIVITY_LIMIT: i64 = 10;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/me", get(get_me))
        .route("/user/profile", put(update_profile))
        .route(
            "/user/upload-photo",
            post(upload_photo).layer(DefaultBodyLimit::max(PHOTO_MAX_BYTES)),
        )
        .route("/user/photo", delete(delete_photo))
        .route("/user/change-password", post(change_password))
        .route("/user/activity", get(list_activity))
        .route("/user/activity/stats", get(activity_stats))
}

/// Admin-only routes. `/user/all` is a static segment, so it wins over
/// `/user/:user_id`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/user/all", get(list_users))
        .route("/user/:user_id", get(user_details))
        .route("/user/:user_id/status", put(update_status))
        .route("/user/:user_id/role", put(update_role))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await
        .or_internal("Failed to fetch user info")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let full_name = services::validate_full_name(payload.full_name.as_deref())?;

    let user = User::update_profile(&state.db, auth.id, full_name, payload.phone.as_deref())
        .await
        .or_internal("Failed to update profile")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    state.activity.record(
        ActivityEvent::new(auth.id, ActivityKind::ProfileUpdated)
            .with_details(json!({ "fields_updated": ["full_name", "phone"] })),
    );

    info!("profile updated");
    Ok(Json(UserResponse {
        message: "Profile updated successfully",
        user,
    }))
}

/// POST /user/upload-photo (multipart, field `photo`)
#[instrument(skip(state, auth, mp), fields(user_id = %auth.id))]
pub async fn upload_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UserResponse>> {
    let mut mp = mp?;
    let mut upload = None;
    while let Some(field) = mp.next_field().await? {
        if field.name() != Some("photo") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        upload = Some((file_name, data));
        break;
    }

    let Some((file_name, data)) = upload.filter(|(_, data)| !data.is_empty()) else {
        return Err(ApiError::bad_request("No file provided"));
    };

    let ext = services::photo_extension(file_name.as_deref())?;
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let key = services::profile_photo_key(auth.id, millis, &ext);

    state
        .storage
        .put_object(&key, data)
        .await
        .or_internal("Failed to upload photo")?;

    let photo_url = state.storage.public_url(&key);
    let user = match User::set_profile_photo(&state.db, auth.id, Some(&photo_url)).await {
        Ok(Some(user)) => user,
        outcome => {
            // The row write failed; don't leave an orphaned file behind.
            if let Err(e) = state.storage.delete_object(&key).await {
                warn!(error = %e, %key, "orphaned photo cleanup failed");
            }
            return Err(match outcome {
                Err(source) => ApiError::Internal {
                    message: "Failed to upload photo",
                    source,
                },
                _ => ApiError::not_found("User not found"),
            });
        }
    };

    state.activity.record(
        ActivityEvent::new(auth.id, ActivityKind::ProfilePhotoUploaded)
            .with_details(json!({ "photo_url": photo_url })),
    );

    info!(%photo_url, "profile photo uploaded");
    Ok(Json(UserResponse {
        message: "Profile photo uploaded successfully",
        user,
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_photo(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<UserResponse>> {
    let current = User::find_by_id(&state.db, auth.id)
        .await
        .or_internal("Failed to delete photo")?;

    let Some(photo_url) = current.and_then(|u| u.profile_photo) else {
        return Err(ApiError::not_found("No profile photo found"));
    };

    match key_from_public_url(&photo_url) {
        Some(key) => {
            let removed = state
                .storage
                .delete_object(key)
                .await
                .or_internal("Failed to delete photo")?;
            if !removed {
                warn!(%photo_url, "profile photo file already missing");
            }
        }
        None => warn!(%photo_url, "profile photo is not a local upload; clearing reference only"),
    }

    let user = User::set_profile_photo(&state.db, auth.id, None)
        .await
        .or_internal("Failed to delete photo")?
        .ok_or_else(|| ApiError::not_found("No profile photo found"))?;

    state
        .activity
        .record(ActivityEvent::new(auth.id, ActivityKind::ProfilePhotoDeleted));

    info!("profile photo deleted");
    Ok(Json(UserResponse {
        message: "Profile photo deleted successfully",
        user,
    }))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (current, new) = services::validate_password_change(&payload)?;

    let user = User::find_by_id(&state.db, auth.id)
        .await
        .or_internal("Failed to change password")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let ok = verify_password(current, &user.password_hash).or_internal("Failed to change password")?;
    if !ok {
        warn!("change password with wrong current password");
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hash = hash_password(new).or_internal("Failed to change password")?;
    let updated = User::update_password(&state.db, auth.id, &hash)
        .await
        .or_internal("Failed to change password")?;
    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    state
        .activity
        .record(ActivityEvent::new(auth.id, ActivityKind::PasswordChanged));

    info!("password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(q): AppQuery<ActivityQuery>,
) -> ApiResult<Json<ActivityPage>> {
    let page = Pagination::new(q.limit, q.offset);

    let rows = activity::repo::list_for_user(&state.db, auth.id, page.limit, page.offset)
        .await
        .or_internal("Failed to fetch activity")?;
    let total = activity::repo::count_for_user(&state.db, auth.id)
        .await
        .or_internal("Failed to fetch activity")?;

    Ok(Json(ActivityPage {
        activities: rows.into_iter().map(ActivityView::from).collect(),
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn activity_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(q): AppQuery<StatsQuery>,
) -> ApiResult<Json<ActivityStats>> {
    let days_back = q.days_back.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, 365) as i32;
    let stats = activity::repo::stats_for_user(&state.db, auth.id, days_back)
        .await
        .or_internal("Failed to fetch activity stats")?;
    Ok(Json(stats))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.user.id))]
pub async fn list_users(
    admin: AdminUser,
    State(state): State<AppState>,
    AppQuery(q): AppQuery<UsersQuery>,
) -> ApiResult<Json<UserList>> {
    let page = Pagination::new(q.limit, q.offset);
    let pattern = services::search_pattern(q.search.as_deref());

    let data = User::search(&state.db, pattern.as_deref(), page.limit, page.offset)
        .await
        .or_internal("Failed to fetch users")?;
    let total = User::count_matching(&state.db, pattern.as_deref())
        .await
        .or_internal("Failed to fetch users")?;

    Ok(Json(UserList {
        data,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.user.id))]
pub async fn user_details(
    admin: AdminUser,
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
) -> ApiResult<Json<UserDetails>> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .or_internal("Failed to fetch user details")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let activities = activity::repo::list_for_user(&state.db, user_id, DETAIL_ACTIVITY_LIMIT, 0)
        .await
        .or_internal("Failed to fetch user details")?;
    let stats = activity::repo::stats_for_user(&state.db, user_id, DEFAULT_STATS_DAYS as i32)
        .await
        .or_internal("Failed to fetch user details")?;

    Ok(Json(UserDetails {
        user,
        activities: activities.into_iter().map(ActivityView::from).collect(),
        stats,
    }))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.user.id))]
pub async fn update_status(
    admin: AdminUser,
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> ApiResult<Json<UserResponse>> {
    let is_active = payload
        .is_active
        .ok_or_else(|| ApiError::bad_request("is_active field is required"))?;

    let user = User::set_active(&state.db, user_id, is_active)
        .await
        .or_internal("Failed to update user status")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(%user_id, is_active, "user status updated");
    Ok(Json(UserResponse {
        message: "User status updated successfully",
        user,
    }))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.user.id))]
pub async fn update_role(
    admin: AdminUser,
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    let role = services::parse_assignable_role(payload.role.as_deref())?;

    let user = User::set_role(&state.db, user_id, role)
        .await
        .or_internal("Failed to update user role")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(%user_id, %role, "user role updated");
    Ok(Json(UserResponse {
        message: "User role updated successfully",
        user,
    }))
}
