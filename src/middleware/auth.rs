use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::Claims;
use crate::database::models::UserId;
use crate::error::ApiError;

/// Authenticated caller, injected into request extensions by [`jwt_auth_middleware`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.id }
    }
}

/// Rejects requests without a valid bearer token; otherwise attaches [`AuthUser`].
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).ok_or_else(|| {
        tracing::debug!("Rejected {}: no bearer token", request.uri().path());
        ApiError::AuthMissing
    })?;

    let claims = state.verifier.verify(token).map_err(|e| {
        tracing::warn!("Rejected {}: {}", request.uri().path(), e);
        ApiError::auth_invalid(e.to_string())
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Token from an `Authorization: Bearer <token>` header, if well formed.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_jwt;
    use crate::config::AppConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Extension, Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    const SECRET: &str = "middleware-secret";

    fn guarded() -> Router {
        let state = AppState::for_testing(&AppConfig::for_testing(SECRET)).unwrap();
        Router::new()
            .route(
                "/whoami",
                get(|Extension(user): Extension<AuthUser>| async move { user.id.to_string() }),
            )
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
            .with_state(state)
    }

    async fn call(authorization: Option<String>) -> (StatusCode, Vec<u8>) {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = guarded().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[test]
    fn parses_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[tokio::test]
    async fn missing_header_is_forbidden_without_detail() {
        let (status, body) = call(None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["msg"], "Not authorized. No token provided");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn bad_token_reports_reason() {
        let (status, body) = call(Some("Bearer nonsense".to_string())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["msg"], "Wrong or expired token");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn valid_token_attaches_identity() {
        let user = UserId::new();
        let token = generate_jwt(SECRET, &Claims::new(user, 1).unwrap()).unwrap();

        let (status, body) = call(Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(body).unwrap(), user.to_string());
    }
}
