use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// Shared secret the hosted auth provider signs session tokens with.
    pub session_jwt_secret: String,
    /// Automation platform endpoint user messages are relayed to.
    pub n8n_webhook_url: String,
    /// Optional static bearer token inbound webhook calls must present.
    pub n8n_webhook_secret: Option<String>,
    /// Base URL public attachment links are built from.
    pub public_base_url: String,
    pub uploads_dir: String,
    pub maintenance_mode: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", bind_address))
            .trim_end_matches('/')
            .to_string();

        Ok(AppConfig {
            database_url: require("DATABASE_URL")?,
            bind_address,
            session_jwt_secret: require("SESSION_JWT_SECRET")?,
            n8n_webhook_url: require("N8N_WEBHOOK_URL")?,
            n8n_webhook_secret: env::var("N8N_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            public_base_url,
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            maintenance_mode: flag("MAINTENANCE_MODE"),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn flag(name: &str) -> bool {
    matches!(
        env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parses_common_truthy_values() {
        env::set_var("INSPETOR_TEST_FLAG_ON", "true");
        env::set_var("INSPETOR_TEST_FLAG_OFF", "0");
        assert!(flag("INSPETOR_TEST_FLAG_ON"));
        assert!(!flag("INSPETOR_TEST_FLAG_OFF"));
        assert!(!flag("INSPETOR_TEST_FLAG_UNSET"));
    }
}
