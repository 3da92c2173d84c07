// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token required)
pub mod protected; // Tier 2: routes wrapped by jwt_auth_middleware
pub mod public; // Tier 1: listing, search and detail reads

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;

/// Unwrap a JSON body, reporting extractor failures in the API's error format.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
