//! Configuration for the Workflow Intake Server
//!
//! This module contains the configuration types and loading functionality.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Backend of the document store, `memory://local` or `github://owner/repo`
    #[serde(default = "default_store_url")]
    pub document_store_url: String,

    /// Token for the hosted repository API
    #[serde(default, skip_serializing)]
    pub github_api_key: Option<String>,

    /// Branch every commit goes to
    #[serde(default = "default_branch")]
    pub github_branch: String,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Host serving the large-file batch API
    #[serde(default = "default_github_lfs_url")]
    pub github_lfs_url: String,

    /// Name recorded as author and committer
    #[serde(default = "default_committer_name")]
    pub committer_name: String,

    #[serde(default = "default_committer_email")]
    pub committer_email: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json_logs: bool,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_store_url() -> String {
    "memory://local".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_lfs_url() -> String {
    "https://github.com".to_string()
}

fn default_committer_name() -> String {
    "workflow-intake".to_string()
}

fn default_committer_email() -> String {
    "intake@example.com".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, starting from the defaults
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.port = port;
            } else {
                warn!("Invalid SERVER_PORT value: {}", port);
            }
        }

        if let Some(host) = lookup("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Some(store_url) = lookup("DOCUMENT_STORE_URL") {
            config.document_store_url = store_url;
        }

        if let Some(api_key) = lookup("GITHUB_API_KEY") {
            if !api_key.trim().is_empty() {
                config.github_api_key = Some(api_key);
            }
        }

        if let Some(branch) = lookup("GITHUB_BRANCH") {
            config.github_branch = branch;
        }

        if let Some(api_url) = lookup("GITHUB_API_URL") {
            config.github_api_url = api_url;
        }

        if let Some(lfs_url) = lookup("GITHUB_LFS_URL") {
            config.github_lfs_url = lfs_url;
        }

        if let Some(name) = lookup("COMMITTER_NAME") {
            config.committer_name = name;
        }

        if let Some(email) = lookup("COMMITTER_EMAIL") {
            config.committer_email = email;
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => config.json_logs = true,
                "text" | "pretty" => config.json_logs = false,
                _ => warn!("Invalid LOG_FORMAT value: {}, using text", format),
            }
        }

        // Validate required fields
        if config.document_store_url.is_empty() {
            return Err(ServerError::ConfigError(
                "Document store URL is required".to_string(),
            ));
        }

        if config.document_store_url.starts_with("github://") && config.github_api_key.is_none() {
            return Err(ServerError::ConfigError(
                "GITHUB_API_KEY is required for a github:// document store".to_string(),
            ));
        }

        if config.github_branch.trim().is_empty() {
            return Err(ServerError::ConfigError("GITHUB_BRANCH must not be empty".to_string()));
        }

        info!("Loaded server configuration");
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            document_store_url: default_store_url(),
            github_api_key: None,
            github_branch: default_branch(),
            github_api_url: default_github_api_url(),
            github_lfs_url: default_github_lfs_url(),
            committer_name: default_committer_name(),
            committer_email: default_committer_email(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> ServerResult<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.document_store_url, "memory://local");
        assert_eq!(config.github_branch, "main");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_overrides_and_invalid_port() {
        let config = load_from(&[
            ("SERVER_PORT", "not-a-port"),
            ("SERVER_HOST", "127.0.0.1"),
            ("LOG_FORMAT", "JSON"),
            ("COMMITTER_NAME", "intake-bot"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert!(config.json_logs);
        assert_eq!(config.committer_name, "intake-bot");
    }

    #[test]
    fn test_github_store_requires_api_key() {
        let result = load_from(&[("DOCUMENT_STORE_URL", "github://acme/workflows")]);
        assert!(matches!(result, Err(ServerError::ConfigError(_))));

        let config = load_from(&[
            ("DOCUMENT_STORE_URL", "github://acme/workflows"),
            ("GITHUB_API_KEY", "ghp_test"),
        ])
        .unwrap();
        assert_eq!(config.github_api_key.as_deref(), Some("ghp_test"));
    }
}
