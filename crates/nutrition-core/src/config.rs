//! Configuration types for the nutrition sync service
//!
//! Uses the `config` crate for layered configuration from defaults, an
//! optional file, and environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{NutritionError, Result};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP façade configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Relational store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Search engine configuration
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Relational store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a caller waits for a pooled connection
    #[serde(with = "humantime_serde", default = "default_acquire_timeout")]
    pub acquire_timeout: Duration,
}

fn default_database_url() -> String {
    "sqlite://food_nutrition.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

// ============================================================================
// Elasticsearch Configuration
// ============================================================================

/// Elasticsearch connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elasticsearch hosts
    #[serde(default = "default_es_hosts")]
    pub hosts: Vec<String>,

    /// Optional username for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Optional password for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Optional API key for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Connection timeout
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Request timeout; an index call exceeding it is abandoned
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Index holding the nutrition documents
    #[serde(default = "default_index_name")]
    pub index: String,
}

fn default_es_hosts() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_index_name() -> String {
    "food_nutritions_idx".to_string()
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            hosts: default_es_hosts(),
            username: None,
            password: None,
            api_key: None,
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            index: default_index_name(),
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// Environment variables use the `NUTRITION` prefix and `__` as the
    /// section separator, e.g. `NUTRITION__DATABASE__URL`.
    pub fn load(path: Option<&str>) -> std::result::Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default values
        builder = builder.add_source(config::Config::try_from(&Self::default())?);

        // Add config file if specified
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("NUTRITION")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("elasticsearch.hosts")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Replace the search host list from a comma-separated string
    pub fn with_es_hosts(mut self, hosts: &str) -> Self {
        self.elasticsearch.hosts = split_hosts(hosts);
        self
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(NutritionError::config("database.url must not be empty"));
        }
        if self.elasticsearch.hosts.is_empty() {
            return Err(NutritionError::config(
                "elasticsearch.hosts must list at least one host",
            ));
        }
        for host in &self.elasticsearch.hosts {
            Url::parse(host).map_err(|e| {
                NutritionError::config(format!("invalid elasticsearch host '{}': {}", host, e))
            })?;
        }
        Ok(())
    }
}

/// Split a comma-separated host list, dropping blanks
pub fn split_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
