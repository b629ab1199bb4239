//! Admin panel surface: user management and system settings.

use crate::models::profiles::{Profile, UpdateProfile, ROLE_ADMIN, ROLE_USER};
use crate::models::settings::SystemSetting;
use crate::web::auth_middleware::require_admin;
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<Profile>,
}

/// GET /api/admin/users
async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.db.list_profiles()?;
    Ok(Json(UserListResponse { users }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/admin/users/:id - edit name, role, or active flag
async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(ref role) = body.role {
        if role != ROLE_ADMIN && role != ROLE_USER {
            return Err(ApiError::Validation(format!(
                "role must be {ROLE_ADMIN:?} or {ROLE_USER:?}"
            )));
        }
    }

    state
        .db
        .get_profile_by_id(user_id)?
        .ok_or(ApiError::UserNotFound)?;

    let user = state.db.update_profile(
        user_id,
        UpdateProfile {
            full_name: body
                .full_name
                .map(|n| Some(n.trim().to_string()).filter(|n| !n.is_empty())),
            role: body.role,
            is_active: body.is_active,
        },
    )?;

    info!(
        "Admin updated user {}: role={} active={}",
        user.id, user.role, user.is_active
    );
    Ok(Json(json!({ "user": user })))
}

/// DELETE /api/admin/users/:id - immediate and permanent; admins cannot
/// delete themselves.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Extension(admin): Extension<Profile>,
) -> Result<Json<Value>, ApiError> {
    if admin.id == user_id {
        return Err(ApiError::Validation(
            "an admin cannot delete their own account".to_string(),
        ));
    }

    let deleted = state.db.delete_profile(user_id)?;
    if deleted == 0 {
        return Err(ApiError::UserNotFound);
    }
    info!("Admin {} deleted user {}", admin.id, user_id);
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Serialize)]
pub struct SettingListResponse {
    pub settings: Vec<SystemSetting>,
}

/// GET /api/admin/settings
async fn list_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingListResponse>, ApiError> {
    let settings = state.db.list_settings()?;
    Ok(Json(SettingListResponse { settings }))
}

#[derive(Debug, Deserialize)]
pub struct UpsertSettingsRequest {
    pub settings: Vec<SystemSetting>,
}

/// PUT /api/admin/settings - bulk upsert by key
async fn upsert_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpsertSettingsRequest>,
) -> Result<Json<SettingListResponse>, ApiError> {
    if body.settings.iter().any(|s| s.key.trim().is_empty()) {
        return Err(ApiError::Validation(
            "setting keys cannot be blank".to_string(),
        ));
    }

    let settings = state.db.upsert_settings(body.settings)?;
    info!("Admin saved {} system settings", settings.len());
    Ok(Json(SettingListResponse { settings }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id", put(update_user))
        .route("/api/admin/users/:id", delete(delete_user))
        .route(
            "/api/admin/settings",
            get(list_settings).put(upsert_settings),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}
