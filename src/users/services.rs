use uuid::Uuid;

use super::{dto::ChangePasswordRequest, repo_types::Role};
use crate::{auth::password::is_long_enough, error::ApiError};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Returns the trimmed name.
pub fn validate_full_name(full_name: Option<&str>) -> Result<&str, ApiError> {
    match full_name.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ApiError::bad_request("Full name is required")),
    }
}

/// Validated `(current, new)` password pair.
pub fn validate_password_change(req: &ChangePasswordRequest) -> Result<(&str, &str), ApiError> {
    fn non_empty(v: &Option<String>) -> Option<&str> {
        v.as_deref().filter(|s| !s.is_empty())
    }
    let (Some(current), Some(new), Some(confirm)) = (
        non_empty(&req.current_password),
        non_empty(&req.new_password),
        non_empty(&req.confirm_password),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    if new != confirm {
        return Err(ApiError::bad_request("New passwords do not match"));
    }
    if !is_long_enough(new) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    Ok((current, new))
}

/// Extension (with leading dot, lowercased) of an uploaded photo's original
/// filename. Only common image types are accepted.
pub fn photo_extension(file_name: Option<&str>) -> Result<String, ApiError> {
    let ext = file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if PHOTO_EXTENSIONS.contains(&ext.as_str()) => Ok(format!(".{}", ext)),
        _ => Err(ApiError::bad_request("Only image files are allowed")),
    }
}

pub fn profile_photo_key(user_id: Uuid, unix_millis: i128, ext: &str) -> String {
    format!("profile_{}_{}{}", user_id, unix_millis, ext)
}

/// Roles an admin may assign through the API. `staff` accounts are
/// provisioned out of band.
pub fn parse_assignable_role(role: Option<&str>) -> Result<Role, ApiError> {
    match role.map(str::parse::<Role>) {
        Some(Ok(role @ (Role::User | Role::Admin))) => Ok(role),
        _ => Err(ApiError::bad_request("Invalid role specified")),
    }
}

/// ILIKE pattern for a free-text search; `None` when the search is blank.
pub fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}
