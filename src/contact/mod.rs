//! Public contact form.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::{
    auth::handlers::{is_valid_email, normalize_email},
    error::{ApiError, ApiResult, OrInternal},
    extract::AppJson,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub email: String,
    pub contacting_as: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub accepted_terms: bool,
    #[serde(default)]
    pub accept_newsletter: bool,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: &'static str,
}

/// Trimmed, validated submission ready to store.
#[derive(Debug, PartialEq)]
pub struct ContactMessage {
    pub name: String,
    pub contact_number: String,
    pub email: String,
    pub contacting_as: Option<String>,
    pub message: Option<String>,
    pub newsletter_opt_in: bool,
}

impl TryFrom<ContactRequest> for ContactMessage {
    type Error = ApiError;

    fn try_from(req: ContactRequest) -> Result<Self, Self::Error> {
        let name = req.name.trim().to_string();
        let contact_number = req.contact_number.trim().to_string();
        let email = normalize_email(&req.email);
        if name.is_empty() || contact_number.is_empty() || email.is_empty() {
            return Err(ApiError::bad_request("Please fill in all required fields"));
        }
        if !is_valid_email(&email) {
            return Err(ApiError::bad_request("Invalid email"));
        }
        if !req.accepted_terms {
            return Err(ApiError::bad_request(
                "Please accept the Privacy Policy and Terms of Service",
            ));
        }
        let optional = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Self {
            name,
            contact_number,
            email,
            contacting_as: optional(req.contacting_as),
            message: optional(req.message),
            newsletter_opt_in: req.accept_newsletter,
        })
    }
}

impl ContactMessage {
    pub async fn insert(&self, db: &PgPool) -> anyhow::Result<i64> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO contact_messages
                (name, contact_number, email, contacting_as, message, newsletter_opt_in)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&self.name)
        .bind(&self.contact_number)
        .bind(&self.email)
        .bind(&self.contacting_as)
        .bind(&self.message)
        .bind(self.newsletter_opt_in)
        .fetch_one(db)
        .await?;
        Ok(id)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/contact", post(submit))
}

#[instrument(skip(state, payload))]
pub async fn submit(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ContactRequest>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let msg = ContactMessage::try_from(payload)?;
    let id = msg
        .insert(&state.db)
        .await
        .or_internal("Something went wrong. Please try again.")?;

    info!(contact_id = id, "contact message stored");
    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Thank you! We will contact you soon.",
        }),
    ))
}
