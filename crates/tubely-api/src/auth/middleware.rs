use crate::auth::jwt::JwtService;
use crate::auth::models::UserContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tubely_core::AppError;

fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".to_string()))
}

/// Reject the request with 401 unless it carries a valid bearer token.
pub async fn auth_middleware(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match bearer_token(&request).and_then(|token| jwt.validate_token(token)) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "Authentication failed");
            return HttpAppError(e).into_response();
        }
    };

    request.extensions_mut().insert(UserContext {
        user_id: claims.sub,
    });
    next.run(request).await
}
