use axum::{
    extract::{Path, RawQuery, State},
    Json,
};

use crate::app::AppState;
use crate::database::models::{PopulatedProperty, TypeCounts};
use crate::error::ApiError;
use crate::filter::PropertyFilter;

/// GET /getAll - every property
pub async fn get_all(State(state): State<AppState>) -> Result<Json<Vec<PopulatedProperty>>, ApiError> {
    Ok(Json(state.properties.list_all().await?))
}

/// GET /find/featured - properties flagged as featured
pub async fn find_featured(State(state): State<AppState>) -> Result<Json<Vec<PopulatedProperty>>, ApiError> {
    Ok(Json(state.properties.list_featured().await?))
}

/// GET /find?field=value&... - equality filter on document fields.
/// Without parameters every property is returned.
pub async fn find(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<PopulatedProperty>>, ApiError> {
    let filter = PropertyFilter::from_query(query.as_deref())?;
    Ok(Json(state.properties.find(&filter).await?))
}

/// GET /find/types - `{ beach, mountain, village }` counts
pub async fn find_types(State(state): State<AppState>) -> Result<Json<TypeCounts>, ApiError> {
    Ok(Json(state.properties.type_counts().await?))
}

/// GET /find/:id - single property
pub async fn find_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PopulatedProperty>, ApiError> {
    Ok(Json(state.properties.get(&id).await?))
}
