//! Agent catalog and admin CRUD.

use crate::models::agents::{Agent, NewAgent, UpdateAgent, AGENT_TYPES, AGENT_TYPE_DEFAULT};
use crate::web::auth_middleware::{require_admin, require_session};
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
}

/// GET /api/agents
async fn list_agents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AgentListResponse>, ApiError> {
    let agents = state.db.list_agents()?;
    Ok(Json(AgentListResponse { agents }))
}

/// GET /api/agents/:id
async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let agent = state
        .db
        .get_agent_by_id(agent_id)?
        .ok_or(ApiError::AgentNotFound)?;
    Ok(Json(json!({ "agent": agent })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAgentRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub agent_type: Option<String>,
}

fn validated_agent_type(agent_type: Option<&str>) -> Result<String, ApiError> {
    match agent_type {
        None => Ok(AGENT_TYPE_DEFAULT.to_string()),
        Some(t) if AGENT_TYPES.contains(&t) => Ok(t.to_string()),
        Some(t) => Err(ApiError::Validation(format!(
            "agent_type must be one of {AGENT_TYPES:?}, got {t:?}"
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/agents
async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // Trim before validating so a whitespace-only name fails the length
    // check like an empty one.
    let body = CreateAgentRequest {
        name: body.name.trim().to_string(),
        ..body
    };
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let agent = state.db.create_agent(NewAgent {
        id: Uuid::new_v4(),
        name: body.name,
        description: non_blank(body.description),
        avatar_url: non_blank(body.avatar_url),
        payload: body.payload.unwrap_or_else(|| json!({})),
        is_active: body.is_active.unwrap_or(true),
        agent_type: validated_agent_type(body.agent_type.as_deref())?,
    })?;

    info!("Created agent {} ({})", agent.name, agent.id);
    Ok((StatusCode::CREATED, Json(json!({ "agent": agent }))))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub payload: Option<Value>,
    pub is_active: Option<bool>,
    pub agent_type: Option<String>,
}

/// PUT /api/agents/:id
async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<Uuid>,
    Json(body): Json<UpdateAgentRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .get_agent_by_id(agent_id)?
        .ok_or(ApiError::AgentNotFound)?;

    let name = match body.name {
        Some(name) => {
            let trimmed = name.trim().to_string();
            if trimmed.is_empty() {
                return Err(ApiError::Validation("name cannot be blank".to_string()));
            }
            Some(trimmed)
        }
        None => None,
    };
    let agent_type = match body.agent_type {
        Some(t) => Some(validated_agent_type(Some(&t))?),
        None => None,
    };

    let agent = state.db.update_agent(
        agent_id,
        UpdateAgent {
            name,
            description: body.description.map(|d| non_blank(Some(d))),
            avatar_url: body.avatar_url.map(|u| non_blank(Some(u))),
            payload: body.payload,
            is_active: body.is_active,
            agent_type,
            updated_at: Some(Utc::now()),
        },
    )?;

    Ok(Json(json!({ "agent": agent })))
}

/// DELETE /api/agents/:id - hard delete; conversations and messages keep
/// their now-dangling agent reference.
async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state.db.delete_agent(agent_id)?;
    if deleted == 0 {
        return Err(ApiError::AgentNotFound);
    }
    info!("Deleted agent {}", agent_id);
    Ok(Json(json!({ "success": true })))
}

pub fn router(state: Arc<AppState>) -> Router {
    let reads = Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:id", get(get_agent))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let writes = Router::new()
        .route("/api/agents", post(create_agent))
        .route("/api/agents/:id", put(update_agent))
        .route("/api/agents/:id", delete(delete_agent))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    reads.merge(writes).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_type_is_validated() {
        assert_eq!(validated_agent_type(None).unwrap(), AGENT_TYPE_DEFAULT);
        assert_eq!(validated_agent_type(Some("advogado")).unwrap(), "advogado");
        assert!(validated_agent_type(Some("piloto")).is_err());
    }

    #[test]
    fn create_request_rejects_blank_names() {
        let blank = CreateAgentRequest {
            name: "   ".trim().to_string(),
            description: None,
            avatar_url: None,
            payload: None,
            is_active: None,
            agent_type: None,
        };
        assert!(blank.validate().is_err());

        let named = CreateAgentRequest {
            name: "Dr. Silva".to_string(),
            ..blank
        };
        assert!(named.validate().is_ok());
    }

    #[test]
    fn non_blank_normalizes_optional_strings() {
        assert_eq!(non_blank(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
