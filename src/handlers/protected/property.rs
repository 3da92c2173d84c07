use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Property;
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::AuthUser;

/// GET /find/my-properties - properties owned by the caller
pub async fn find_my_properties(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_owned(&user.id).await?))
}

/// GET /find/bookmarked-properties - properties the caller bookmarked
pub async fn find_bookmarked_properties(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_bookmarked(&user.id).await?))
}

/// POST / - create a property owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Property>), ApiError> {
    let body = json_body(payload)?;
    let property = state.properties.create(user.id, body).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

/// PUT /:id - partial update, owner only
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Property>, ApiError> {
    let body = json_body(payload)?;
    Ok(Json(state.properties.update(&user.id, &id, body).await?))
}

/// PUT /bookmark/:id - toggle the caller's bookmark; owners cannot bookmark
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Property>, ApiError> {
    Ok(Json(state.properties.toggle_bookmark(user.id, &id).await?))
}

/// DELETE /:id - owner only
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.properties.delete(&user.id, &id).await?;
    Ok(Json(json!({ "msg": "Successfully deleted property" })))
}
