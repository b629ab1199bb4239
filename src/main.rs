use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

mod config;
mod db;
mod jwt;
mod models;
mod realtime;
mod relay;
mod storage;
mod web;

use config::AppConfig;
use db::{setup_db, DBConnection};
use realtime::ChannelHub;
use relay::{AutomationClient, RelayError};
use storage::AttachmentStore;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Agent not found")]
    AgentNotFound,

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal server error")]
    InternalServerError,

    #[error("Automation platform error")]
    Upstream {
        status: Option<u16>,
        details: String,
    },
}

#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AgentNotFound => StatusCode::NOT_FOUND,
            ApiError::ConversationNotFound => StatusCode::NOT_FOUND,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let details = match &self {
            ApiError::Upstream { details, .. } => Some(details.clone()),
            _ => None,
        };
        (
            status,
            Json(ErrorResponse {
                status: status.as_u16(),
                error: self.to_string(),
                details,
            }),
        )
            .into_response()
    }
}

impl From<db::DBError> for ApiError {
    fn from(err: db::DBError) -> Self {
        error!("Database error: {:?}", err);
        ApiError::InternalServerError
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        error!("Relay error: {:?}", err);
        match err {
            RelayError::Upstream { status, body } => ApiError::Upstream {
                status: Some(status),
                details: body,
            },
            RelayError::Request(e) => ApiError::Upstream {
                status: e.status().map(|s| s.as_u16()),
                details: e.to_string(),
            },
        }
    }
}

pub struct AppState {
    pub db: DBConnection,
    pub config: AppConfig,
    pub relay: AutomationClient,
    pub hub: ChannelHub,
    pub storage: AttachmentStore,
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Answers 503 on every route except the health probe while the flag is on.
async fn maintenance_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.maintenance_mode && request.uri().path() != "/health" {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": 503,
                "error": "Em manutenção. Tente novamente em instantes."
            })),
        )
            .into_response();
    }
    next.run(request).await
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let db = match setup_db(&config.database_url) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to the database: {e}");
            std::process::exit(1);
        }
    };

    let relay = match AutomationClient::new(config.n8n_webhook_url.clone()) {
        Ok(relay) => relay,
        Err(e) => {
            error!("Failed to build the automation client: {e}");
            std::process::exit(1);
        }
    };

    let storage = AttachmentStore::new(config.uploads_dir.clone(), config.public_base_url.clone());
    let bind_address = config.bind_address.clone();
    let uploads_dir = config.uploads_dir.clone();

    let app_state = Arc::new(AppState {
        db,
        config,
        relay,
        hub: ChannelHub::new(),
        storage,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(web::session::router(app_state.clone()))
        .merge(web::chat::router(app_state.clone()))
        .merge(web::conversations::router(app_state.clone()))
        .merge(web::agents::router(app_state.clone()))
        .merge(web::admin::router(app_state.clone()))
        .merge(web::attachments::router(app_state.clone()))
        .merge(web::webhooks::router(app_state.clone()))
        .merge(web::realtime_routes::router(app_state.clone()))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            maintenance_gate,
        ))
        .layer(CorsLayer::permissive());

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {e}", bind_address);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", bind_address);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_expected_statuses() {
        let cases = [
            (
                ApiError::Validation("x".to_string()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Unauthorized.into_response(), StatusCode::UNAUTHORIZED),
            (ApiError::AgentNotFound.into_response(), StatusCode::NOT_FOUND),
            (
                ApiError::ConversationNotFound.into_response(),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::InternalServerError.into_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (response, expected) in cases {
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn validation_message_is_preserved() {
        let err = ApiError::Validation("agentId is required".to_string());
        assert_eq!(err.to_string(), "agentId is required");
    }

    #[tokio::test]
    async fn error_body_carries_the_error_field() {
        let response =
            ApiError::Validation("agentId is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "agentId is required");
        assert_eq!(value["status"], 400);
        assert!(value.get("details").is_none());
    }
}
