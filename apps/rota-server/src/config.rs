//! Server configuration module.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! # Audit trail (enabled by default)
//! ROTA_AUDIT_ENABLED=true
//!
//! # Base URL of the external join-link service; meetings created without a
//! # link get <base>/<meeting-id>
//! ROTA_MEETING_LINK_BASE=https://meet.example.com
//! ```

use std::env;
use thiserror::Error;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Whether successful writes are recorded to the audit trail.
    pub audit_enabled: bool,
    /// Base URL of the external join-link service, without trailing slash.
    pub meeting_link_base: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
            meeting_link_base: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}. Expected 'true' or 'false'")]
    InvalidFlag(&'static str, String),

    #[error("ROTA_MEETING_LINK_BASE must not be empty when set")]
    EmptyLinkBase,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let audit_enabled = match env::var("ROTA_AUDIT_ENABLED") {
            Ok(v) => match v.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(ConfigError::InvalidFlag("ROTA_AUDIT_ENABLED", v)),
            },
            Err(_) => true, // Enabled by default
        };

        let meeting_link_base = match env::var("ROTA_MEETING_LINK_BASE") {
            Ok(v) => {
                let trimmed = v.trim().trim_end_matches('/');
                if trimmed.is_empty() {
                    return Err(ConfigError::EmptyLinkBase);
                }
                Some(trimmed.to_string())
            }
            Err(_) => None,
        };

        Ok(Self {
            audit_enabled,
            meeting_link_base,
        })
    }
}
