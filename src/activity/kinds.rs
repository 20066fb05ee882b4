use std::str::FromStr;

/// Actions recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Login,
    Logout,
    Register,
    ProfileUpdated,
    ProfilePhotoUploaded,
    ProfilePhotoDeleted,
    PasswordChanged,
    PropertyCreated,
    PropertyUpdated,
    PropertyDeleted,
    PropertyViewed,
    PropertyShortlisted,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 12] = [
        ActivityKind::Login,
        ActivityKind::Logout,
        ActivityKind::Register,
        ActivityKind::ProfileUpdated,
        ActivityKind::ProfilePhotoUploaded,
        ActivityKind::ProfilePhotoDeleted,
        ActivityKind::PasswordChanged,
        ActivityKind::PropertyCreated,
        ActivityKind::PropertyUpdated,
        ActivityKind::PropertyDeleted,
        ActivityKind::PropertyViewed,
        ActivityKind::PropertyShortlisted,
    ];

    /// Value stored in `user_activities.action_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Login => "login",
            ActivityKind::Logout => "logout",
            ActivityKind::Register => "register",
            ActivityKind::ProfileUpdated => "profile_updated",
            ActivityKind::ProfilePhotoUploaded => "profile_photo_uploaded",
            ActivityKind::ProfilePhotoDeleted => "profile_photo_deleted",
            ActivityKind::PasswordChanged => "password_changed",
            ActivityKind::PropertyCreated => "property_created",
            ActivityKind::PropertyUpdated => "property_updated",
            ActivityKind::PropertyDeleted => "property_deleted",
            ActivityKind::PropertyViewed => "property_viewed",
            ActivityKind::PropertyShortlisted => "property_shortlisted",
        }
    }

    /// Value stored in `user_activities.resource_type`.
    pub fn resource_type(&self) -> &'static str {
        match self {
            ActivityKind::Login | ActivityKind::Logout | ActivityKind::Register => "auth",
            ActivityKind::ProfileUpdated
            | ActivityKind::ProfilePhotoUploaded
            | ActivityKind::ProfilePhotoDeleted => "user_profile",
            ActivityKind::PasswordChanged => "security",
            _ => "property",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Login => "Logged in",
            ActivityKind::Logout => "Logged out",
            ActivityKind::Register => "Registered",
            ActivityKind::ProfileUpdated => "Updated profile",
            ActivityKind::ProfilePhotoUploaded => "Uploaded profile photo",
            ActivityKind::ProfilePhotoDeleted => "Deleted profile photo",
            ActivityKind::PasswordChanged => "Changed password",
            ActivityKind::PropertyCreated => "Created property",
            ActivityKind::PropertyUpdated => "Updated property",
            ActivityKind::PropertyDeleted => "Deleted property",
            ActivityKind::PropertyViewed => "Viewed property",
            ActivityKind::PropertyShortlisted => "Shortlisted property",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
    }
}

/// Human label for a stored action type; unknown actions fall back to the
/// raw value.
pub fn label_for(action_type: &str) -> String {
    action_type
        .parse::<ActivityKind>()
        .map(|k| k.label().to_string())
        .unwrap_or_else(|_| action_type.to_string())
}
