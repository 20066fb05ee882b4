pub mod repo;
pub mod seed;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult, OrInternal},
    extract::AppPath,
    state::AppState,
};

pub use repo::{Property, PropertyImage};

/// Property with its images; what the client snapshots into a shortlist.
#[derive(Debug, Serialize)]
pub struct PropertyDetails {
    #[serde(flatten)]
    pub property: Property,
    pub cover_image_url: Option<String>,
    pub images: Vec<PropertyImage>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/properties/:property_id", get(get_property))
}

#[instrument(skip(state))]
pub async fn get_property(
    State(state): State<AppState>,
    AppPath(property_id): AppPath<Uuid>,
) -> ApiResult<Json<PropertyDetails>> {
    let property = repo::find_by_id(&state.db, property_id)
        .await
        .or_internal("Failed to fetch property")?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    let images = repo::images_for(&state.db, property_id)
        .await
        .or_internal("Failed to fetch property")?;

    Ok(Json(PropertyDetails {
        cover_image_url: images.first().map(|img| img.image_url.clone()),
        property,
        images,
    }))
}
