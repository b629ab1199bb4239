//! Session adapter surface: who am I, per the hosted auth provider.

use crate::models::profiles::Profile;
use crate::web::auth_middleware::require_session;
use crate::{ApiError, AppState};
use axum::{middleware::from_fn_with_state, routing::get, Extension, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /api/session - the authenticated caller's profile
async fn current_session(Extension(profile): Extension<Profile>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "profile": profile })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/session", get(current_session))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state)
}
