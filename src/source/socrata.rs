//! Remote paginated source (Socrata SODA JSON API)
//!
//! Each block is one `GET` with `$limit`/`$offset`. Rows come back as JSON
//! objects whose numeric fields are encoded as strings.
//!
//! ```text
//! GET {endpoint}?$select=fare_amount
//!               &$where=fare_amount > 0
//!               &$order=:id
//!               &$limit=10000
//!               &$offset=20000
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::block::{extract_block, Block};
use super::errors::{SourceError, SourceResult};
use super::{check_limit, BlockSource};

/// Row identifier column, used for stable ordering and column-less counts
const ROW_ID: &str = ":id";

/// Remote source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocrataConfig {
    /// Resource URL (e.g. `https://data.cityofnewyork.us/resource/t7ny-aygi.json`)
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Filter rows with `col > 0` instead of `col IS NOT NULL`
    #[serde(default = "default_require_positive")]
    pub require_positive: bool,

    /// Optional application token sent as `X-App-Token`
    #[serde(default)]
    pub app_token: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_require_positive() -> bool {
    true
}

impl SocrataConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: default_timeout_secs(),
            require_positive: default_require_positive(),
            app_token: None,
        }
    }
}

/// Block source backed by a Socrata resource endpoint
#[derive(Debug, Clone)]
pub struct SocrataSource {
    config: SocrataConfig,
    client: reqwest::Client,
}

impl SocrataSource {
    /// Build the source and its HTTP client
    pub fn new(config: SocrataConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SocrataConfig {
        &self.config
    }

    /// SoQL query parameters for one block
    pub fn query_params(&self, column: Option<&str>, offset: u64, limit: u64) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(5);

        match column {
            Some(col) => {
                params.push(("$select", col.to_string()));
                let filter = if self.config.require_positive {
                    format!("{} > 0", col)
                } else {
                    format!("{} IS NOT NULL", col)
                };
                params.push(("$where", filter));
            }
            None => params.push(("$select", ROW_ID.to_string())),
        }

        params.push(("$order", ROW_ID.to_string()));
        params.push(("$limit", limit.to_string()));
        params.push(("$offset", offset.to_string()));
        params
    }
}

/// Map a non-success response to a source error.
///
/// SODA reports unknown columns as a 400 whose body carries the
/// `no-such-column` error code.
fn classify_failure(status: StatusCode, body: &str, column: Option<&str>) -> SourceError {
    let lower = body.to_ascii_lowercase();
    if status.is_client_error() && (lower.contains("no-such-column") || lower.contains("no such column")) {
        return SourceError::UnknownColumn(column.unwrap_or(ROW_ID).to_string());
    }

    let snippet: String = body.chars().take(200).collect();
    SourceError::Unavailable(format!("HTTP {}: {}", status, snippet))
}

#[async_trait]
impl BlockSource for SocrataSource {
    async fn fetch(&self, column: Option<&str>, offset: u64, limit: u64) -> SourceResult<Block> {
        check_limit(limit)?;

        let mut request = self
            .client
            .get(&self.config.endpoint)
            .query(&self.query_params(column, offset, limit));

        if let Some(token) = &self.config.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, column));
        }

        let rows: Vec<Value> = response.json().await?;
        extract_block(&rows, column)
    }

    fn describe(&self) -> String {
        format!("socrata({})", self.config.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(require_positive: bool) -> SocrataSource {
        let mut config = SocrataConfig::new("https://example.invalid/resource/abcd-1234.json");
        config.require_positive = require_positive;
        SocrataSource::new(config).unwrap()
    }

    #[test]
    fn test_query_params_for_column() {
        let params = source(true).query_params(Some("fare_amount"), 20000, 10000);
        assert_eq!(
            params,
            vec![
                ("$select", "fare_amount".to_string()),
                ("$where", "fare_amount > 0".to_string()),
                ("$order", ":id".to_string()),
                ("$limit", "10000".to_string()),
                ("$offset", "20000".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_params_not_null_filter() {
        let params = source(false).query_params(Some("tip_amount"), 0, 5);
        assert!(params.contains(&("$where", "tip_amount IS NOT NULL".to_string())));
    }

    #[test]
    fn test_query_params_without_column() {
        let params = source(true).query_params(None, 0, 5);
        assert_eq!(params[0], ("$select", ":id".to_string()));
        assert!(!params.iter().any(|(k, _)| *k == "$where"));
    }

    #[test]
    fn test_classify_unknown_column() {
        let body = r#"{"code":"query.soql.no-such-column","error":true,"message":"No such column: nope"}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body, Some("nope"));
        assert_eq!(err, SourceError::UnknownColumn("nope".into()));
    }

    #[test]
    fn test_classify_server_error() {
        let err = classify_failure(StatusCode::SERVICE_UNAVAILABLE, "try later", Some("x"));
        match err {
            SourceError::Unavailable(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: SocrataConfig =
            serde_json::from_str(r#"{"endpoint": "https://x.invalid/r.json"}"#).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.require_positive);
        assert!(config.app_token.is_none());
    }

    #[test]
    fn test_describe() {
        assert!(source(true).describe().starts_with("socrata(https://example.invalid"));
    }
}
