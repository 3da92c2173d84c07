use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{JwtError, TokenVerifier};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::{DatabaseManager, MemoryStore};
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::PropertyService;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub properties: PropertyService,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(config: &AppConfig, db: DatabaseManager) -> Result<Self, JwtError> {
        Ok(Self {
            properties: PropertyService::new(db),
            verifier: Arc::new(TokenVerifier::new(&config.security.jwt_secret)?),
        })
    }

    /// State backed by the given in-memory store.
    pub fn in_memory(config: &AppConfig, store: Arc<MemoryStore>) -> Result<Self, JwtError> {
        Self::new(config, DatabaseManager::memory(store))
    }

    #[cfg(test)]
    pub(crate) fn for_testing(config: &AppConfig) -> Result<Self, JwtError> {
        Self::in_memory(config, Arc::new(MemoryStore::new()))
    }
}

/// Full application router with CORS and request tracing.
pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    Router::new()
        .route("/health", get(public::health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .with_state(state)
        .layer(cors_layer(security))
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/getAll", get(public::get_all))
        .route("/find", get(public::find))
        .route("/find/featured", get(public::find_featured))
        .route("/find/types", get(public::find_types))
        .route("/find/:id", get(public::find_by_id))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/find/my-properties", get(protected::find_my_properties))
        .route("/find/bookmarked-properties", get(protected::find_bookmarked_properties))
        .route("/", post(protected::create))
        .route("/:id", put(protected::update).delete(protected::delete))
        .route("/bookmark/:id", put(protected::toggle_bookmark))
        // route_layer: unmatched paths still 404 instead of 403
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
