//! Configuration file
//!
//! ```json
//! {
//!   "source": {"kind": "socrata", "endpoint": "https://.../resource/t7ny-aygi.json"},
//!   "engine": {"block_size": 10000},
//!   "http": {"port": 8000},
//!   "sessions": {"max_sessions": 64, "idle_ttl_secs": 1800}
//! }
//! ```
//!
//! Every section and field is optional. A missing file means all defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::args::Overrides;
use super::errors::{CliError, CliResult};
use crate::engine::SessionConfig;
use crate::http_server::HttpServerConfig;
use crate::source::{BlockSource, JsonLinesSource, SocrataConfig, SocrataSource};

/// NYC taxi trip records
pub const DEFAULT_ENDPOINT: &str = "https://data.cityofnewyork.us/resource/t7ny-aygi.json";

pub const DEFAULT_BLOCK_SIZE: u64 = 10_000;

/// Hard ceiling on rows per block, well above what paginated APIs serve
pub const MAX_BLOCK_SIZE: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Socrata,
    Jsonl,
}

/// Where blocks come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default)]
    pub kind: SourceKind,

    /// Remote resource URL (socrata)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// File path (jsonl)
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_require_positive")]
    pub require_positive: bool,

    #[serde(default)]
    pub app_token: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_require_positive() -> bool {
    true
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            endpoint: default_endpoint(),
            path: None,
            timeout_secs: default_timeout_secs(),
            require_positive: default_require_positive(),
            app_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Rows requested per block, fixed for the life of a query
    #[serde(default = "default_block_size")]
    pub block_size: u64,
}

fn default_block_size() -> u64 {
    DEFAULT_BLOCK_SIZE
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

/// Whole-process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub http: HttpServerConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the file if present, otherwise start from defaults
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command line overrides and re-validate
    pub fn apply(mut self, overrides: &Overrides) -> CliResult<Self> {
        if let Some(endpoint) = &overrides.endpoint {
            self.source.kind = SourceKind::Socrata;
            self.source.endpoint = endpoint.clone();
        }
        if let Some(path) = &overrides.jsonl {
            self.source.kind = SourceKind::Jsonl;
            self.source.path = Some(path.clone());
        }
        if let Some(block_size) = overrides.block_size {
            self.engine.block_size = block_size;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> CliResult<()> {
        if self.engine.block_size == 0 {
            return Err(CliError::config_error("engine.block_size must be > 0"));
        }
        if self.engine.block_size > MAX_BLOCK_SIZE {
            return Err(CliError::config_error(format!(
                "engine.block_size must be <= {}",
                MAX_BLOCK_SIZE
            )));
        }
        if self.source.timeout_secs == 0 {
            return Err(CliError::config_error("source.timeout_secs must be > 0"));
        }
        if self.sessions.max_sessions == 0 {
            return Err(CliError::config_error("sessions.max_sessions must be > 0"));
        }

        match self.source.kind {
            SourceKind::Socrata => {
                let endpoint = self.source.endpoint.as_str();
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(CliError::config_error(format!(
                        "source.endpoint must be an http(s) URL, got '{}'",
                        endpoint
                    )));
                }
            }
            SourceKind::Jsonl => {
                if self.source.path.is_none() {
                    return Err(CliError::config_error(
                        "source.path is required when source.kind is 'jsonl'",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Construct the configured block source
    pub fn build_source(&self) -> CliResult<Arc<dyn BlockSource>> {
        match self.source.kind {
            SourceKind::Socrata => {
                let socrata = SocrataConfig {
                    endpoint: self.source.endpoint.clone(),
                    timeout_secs: self.source.timeout_secs,
                    require_positive: self.source.require_positive,
                    app_token: self.source.app_token.clone(),
                };
                let source = SocrataSource::new(socrata)
                    .map_err(|e| CliError::config_error(e.to_string()))?;
                Ok(Arc::new(source))
            }
            SourceKind::Jsonl => {
                let path = self.source.path.clone().ok_or_else(|| {
                    CliError::config_error("source.path is required when source.kind is 'jsonl'")
                })?;
                Ok(Arc::new(JsonLinesSource::new(path)))
            }
        }
    }
}
