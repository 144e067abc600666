//! Layered server configuration.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `config/default.toml`
//! 3. `config/{QUARRY_ENV}.toml`
//! 4. `QUARRY__SECTION__KEY` environment variables (a `.env` file is honoured)

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "QUARRY";
const ENV_SELECTOR: &str = "QUARRY_ENV";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub backend: BackendConfig,
    pub templates: TemplatesConfig,
    pub fixtures: FixturesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_bytes: usize,
    /// Header carrying the authenticated user id, set by the fronting proxy.
    pub identity_header: String,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_request_body_bytes: 64 * 1024,
            identity_header: "x-remote-user".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on rows requested from a backend.
    pub max_results: u64,
    pub default_items_per_page: u64,
    pub slow_query_ms: u64,
    pub very_slow_query_ms: u64,
    /// Only templates below this path may be executed.
    pub search_path_prefix: String,
    pub admin_users: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            default_items_per_page: 25,
            slow_query_ms: 10,
            very_slow_query_ms: 100,
            search_path_prefix: "/var/".to_string(),
            admin_users: vec!["admin".to_string()],
        }
    }
}

impl SearchConfig {
    pub fn slow_query(&self) -> Duration {
        Duration::from_millis(self.slow_query_ms)
    }

    pub fn very_slow_query(&self) -> Duration {
        Duration::from_millis(self.very_slow_query_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Solr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub solr_url: Option<String>,
    pub solr_core: String,
    pub http_method: HttpMethod,
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            solr_url: None,
            solr_core: "quarry".to_string(),
            http_method: HttpMethod::Post,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory of `*.json` template documents. A file at
    /// `<directory>/search/files.json` serves `/var/search/files`.
    pub directory: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("templates"),
        }
    }
}

/// Optional JSON files seeding the in-memory collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    pub documents: Option<PathBuf>,
    pub memberships: Option<PathBuf>,
    pub deleted_paths: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Minutely,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: PathBuf,
    pub file_prefix: String,
    pub file_rotation: LogRotation,
    pub opentelemetry_enabled: bool,
    pub otlp_endpoint: String,
    pub otlp_timeout_seconds: u64,
    pub trace_sample_ratio: f64,
    pub service_name: String,
    pub service_version: Option<String>,
    pub deployment_environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: PathBuf::from("logs"),
            file_prefix: "quarry-server".to_string(),
            file_rotation: LogRotation::Daily,
            opentelemetry_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_timeout_seconds: 10,
            trace_sample_ratio: 1.0,
            service_name: "quarry-server".to_string(),
            service_version: None,
            deployment_environment: "development".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| "development".to_string());

        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("search.admin_users")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.search.max_results == 0 {
            return Err("search.max_results must be greater than 0".into());
        }
        if self.search.default_items_per_page == 0 {
            return Err("search.default_items_per_page must be greater than 0".into());
        }
        if self.search.slow_query_ms > self.search.very_slow_query_ms {
            return Err(format!(
                "search.slow_query_ms ({}) must not exceed search.very_slow_query_ms ({})",
                self.search.slow_query_ms, self.search.very_slow_query_ms
            ));
        }
        if self.search.search_path_prefix.trim().is_empty() {
            return Err("search.search_path_prefix must not be empty".into());
        }
        if self.server.identity_header.trim().is_empty() {
            return Err("server.identity_header must not be empty".into());
        }
        if self.backend.kind == BackendKind::Solr {
            match self.backend.solr_url.as_deref() {
                Some(url) if !url.trim().is_empty() => {
                    url::Url::parse(url)
                        .map_err(|e| format!("backend.solr_url is not a valid URL: {e}"))?;
                }
                _ => return Err("backend.solr_url is required when backend.kind = solr".into()),
            }
        }
        if !(0.0..=1.0).contains(&self.logging.trace_sample_ratio) {
            return Err("logging.trace_sample_ratio must be between 0.0 and 1.0".into());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid server.host {:?}: {e}", self.server.host))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}
