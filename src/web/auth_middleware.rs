use crate::jwt::validate_session_token;
use crate::models::profiles::Profile;
use crate::{ApiError, AppState};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Resolves the session token to an active Profile, or explains why not.
pub fn profile_for_token(state: &AppState, token: &str) -> Result<Profile, ApiError> {
    let claims = validate_session_token(token, &state.config.session_jwt_secret)
        .map_err(|_| ApiError::Unauthorized)?;

    let subject: Uuid = claims.sub.parse().map_err(|_| {
        debug!("Session subject is not a uuid: {}", claims.sub);
        ApiError::Unauthorized
    })?;

    let profile = state
        .db
        .get_profile_by_id(subject)
        .map_err(|e| {
            error!("Database error resolving session profile: {:?}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::Unauthorized)?;

    if !profile.is_active {
        debug!("Rejected session for deactivated profile {}", profile.id);
        return Err(ApiError::Unauthorized);
    }

    Ok(profile)
}

/// Requires a valid session token and stores the Profile as an extension.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return ApiError::Unauthorized.into_response();
    };

    match profile_for_token(&state, token) {
        Ok(profile) => {
            req.extensions_mut().insert(profile);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

/// Requires a valid session whose profile carries the admin role.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return ApiError::Unauthorized.into_response();
    };

    match profile_for_token(&state, token) {
        Ok(profile) if profile.is_admin() => {
            req.extensions_mut().insert(profile);
            next.run(req).await
        }
        Ok(_) => ApiError::Unauthorized.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
