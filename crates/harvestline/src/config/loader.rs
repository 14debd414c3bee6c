use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.analysis.organization.trim().is_empty()
        || config.analysis.record_group.trim().is_empty()
    {
        return Err(ConfigError::Validation {
            message: "Analysis organization and record group names must not be empty"
                .to_string(),
        });
    }

    if config.remote.request_timeout_secs == 0 || config.remote.poll_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "Remote timeouts must be positive".to_string(),
        });
    }

    if config.supervisor.poll_interval_secs == 0 || config.supervisor.max_concurrent_polls == 0 {
        return Err(ConfigError::Validation {
            message: "Supervisor poll interval and concurrency must be positive".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_full_config() {
        let config = load_config_from_str(
            r#"{
                "version": "1.0",
                "database": { "path": "/tmp/h.db" },
                "remote": {
                    "base_url": "http://livy:8998",
                    "request_timeout_secs": 5,
                    "poll_timeout_secs": 2,
                    "session": { "kind": "pyspark", "executorMemory": "2g" }
                },
                "search": { "base_url": "http://es:9200" },
                "storage": { "root": "/data/harvestline" },
                "analysis": { "organization": "Hidden", "record_group": "HiddenRG" },
                "supervisor": { "poll_interval_secs": 5, "max_concurrent_polls": 8 },
                "logging": { "level": "debug", "json": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.remote.base_url, "http://livy:8998");
        assert_eq!(config.remote.session["executorMemory"], "2g");
        assert_eq!(config.storage.root, "/data/harvestline");
        assert_eq!(config.analysis.record_group, "HiddenRG");
        assert_eq!(config.supervisor.max_concurrent_polls, 8);
        assert!(config.logging.json);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let err = load_config_from_str(r#"{"version": "2.0"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_schema_rejects_wrong_types() {
        let err = load_config_from_str(
            r#"{"version": "1.0", "supervisor": {"poll_interval_secs": "often"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_missing_version_rejected() {
        assert!(load_config_from_str("{}").is_err());
    }

    #[test]
    fn test_empty_analysis_names_rejected() {
        let err = load_config_from_str(
            r#"{"version": "1.0", "analysis": {"organization": " ", "record_group": "x"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvestline.json");
        std::fs::write(&path, r#"{"version": "1.0"}"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.version, "1.0");

        let missing = load_config(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::ReadFile { .. }));
    }
}
