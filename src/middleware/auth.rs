use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Authenticated caller, attached to the request extensions.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            is_admin: claims.is_admin,
        }
    }
}

/// Rejects with 401 when no usable bearer token is present and with 403 when
/// the token fails verification.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_jwt_from_headers(&headers).map_err(|reason| {
        debug!("Rejecting request to {}: {}", request.uri().path(), reason);
        ApiError::unauthorized("Authentication required").into_response()
    })?;

    let claims = validate_jwt(token, &state.config.security).map_err(|e| {
        debug!("Token verification failed: {}", e);
        ApiError::forbidden("Not authorized").into_response()
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Authorization header is not valid ASCII")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err("empty bearer token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}
