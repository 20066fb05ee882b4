//! Role-based authorization.
//!
//! A [`Policy`] decides which roles may call a handler; [`Authorized`]
//! enforces it as an extractor. Place it first in the handler's argument
//! list so the role check runs before path or body parsing.

use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{extractors::AuthUser, jwt::JwtKeys};
use crate::{error::ApiError, users::Role};

pub trait Policy: Send + Sync + 'static {
    /// Message returned with the 403.
    const DENIED: &'static str;

    fn allows(role: Role) -> bool;
}

pub struct AdminOnly;

impl Policy for AdminOnly {
    const DENIED: &'static str = "Unauthorized - Admin access required";

    fn allows(role: Role) -> bool {
        role == Role::Admin
    }
}

/// Roles allowed into the admin dashboard.
pub struct StaffOrAdmin;

impl Policy for StaffOrAdmin {
    const DENIED: &'static str = "Access denied. Admin or staff access required.";

    fn allows(role: Role) -> bool {
        matches!(role, Role::Admin | Role::Staff)
    }
}

pub struct Authorized<P: Policy> {
    pub user: AuthUser,
    _policy: PhantomData<P>,
}

pub type AdminUser = Authorized<AdminOnly>;

impl<P: Policy> Authorized<P> {
    pub fn check(user: AuthUser) -> Result<Self, ApiError> {
        if !P::allows(user.role) {
            warn!(user_id = %user.id, role = %user.role, "role check failed");
            return Err(ApiError::forbidden(P::DENIED));
        }
        Ok(Self {
            user,
            _policy: PhantomData,
        })
    }
}

#[async_trait]
impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    P: Policy,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Self::check(user)
    }
}
