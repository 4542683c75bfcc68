//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;
use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML or JSON file.
///
/// Files ending in `.json` are parsed as JSON; everything else as TOML.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = parse_config(&content, is_json)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_config(content: &str, is_json: bool) -> Result<BalancerConfig, ConfigError> {
    if is_json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let config = parse_config(
            r#"{
                "listener": { "port": 9000 },
                "servers": [{ "url": "http://localhost:5001" }, { "url": "http://localhost:5002", "weight": 3 }],
                "cluster": { "node_id": "lb-a", "is_primary": false }
            }"#,
            true,
        )
        .unwrap();

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.servers[1].weight, 3);
        assert_eq!(config.cluster.node_id, "lb-a");
        assert!(!config.cluster.is_primary);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let path = std::env::temp_dir().join(format!("dispatch-lb-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[retries]\nmax_attempts = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("retries.max_attempts"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        // Flat `port` and `requests_per_second` are not part of the schema
        let err = parse_config(
            r#"{
                "port": 9000,
                "servers": [{ "url": "http://localhost:5001" }]
            }"#,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("port"));

        let err = parse_config("[rate_limit]\nrequests_per_second = 5\n", false).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().contains("requests_per_second"));

        let err = parse_config(
            r#"{ "servers": [{ "url": "http://localhost:5001", "wieght": 2 }] }"#,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("wieght"));
    }

    #[test]
    fn test_load_json_file_rejects_unknown_section() {
        let path = std::env::temp_dir().join(format!("dispatch-lb-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{ "rate_limit": { "requests_per_second": 5 } }"#).unwrap();

        let err = load_config(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/dispatch-lb.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
