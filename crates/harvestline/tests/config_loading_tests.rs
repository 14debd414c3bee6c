//! Table-driven tests for configuration loading and validation.

use harvestline::load_config_from_str;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{ "version": "1.0" }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "database": { "path": "/var/lib/harvestline/harvestline.db" },
            "remote": {
                "base_url": "http://livy:8998",
                "request_timeout_secs": 60,
                "poll_timeout_secs": 5,
                "session_name": "pipeline",
                "session": { "kind": "pyspark", "conf": { "spark.driver.memory": "4g" } }
            },
            "search": { "base_url": "http://es:9200", "published_index": "published" },
            "storage": { "root": "/data/harvestline" },
            "analysis": { "organization": "Analysis", "record_group": "Scratch" },
            "supervisor": { "poll_interval_secs": 5, "max_concurrent_polls": 8 },
            "logging": { "level": "debug", "json": true }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "missing_version",
        config_json: r#"{ "storage": { "root": "/data" } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unsupported_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_section",
        config_json: r#"{ "version": "1.0", "workers": 4 }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "zero_poll_timeout",
        config_json: r#"{ "version": "1.0", "remote": { "poll_timeout_secs": 0 } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "blank_analysis_organization",
        config_json: r#"{ "version": "1.0", "analysis": { "organization": "  " } }"#,
        should_succeed: false,
        expected_error: Some("Analysis organization and record group names must not be empty"),
    },
    ConfigTestCase {
        name: "bad_log_level",
        config_json: r#"{ "version": "1.0", "logging": { "level": "verbose" } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "version": "1.0", "#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
];

#[test]
fn test_json_config_loading() {
    for test_case in CONFIG_TESTS {
        let result = load_config_from_str(test_case.config_json);

        if test_case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}': Expected success but got error: {:?}",
                test_case.name,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Test '{}': Expected error but got success",
                test_case.name
            );

            if let Some(expected_error) = test_case.expected_error {
                let error_msg = result.err().unwrap().to_string();
                assert!(
                    error_msg.contains(expected_error),
                    "Test '{}': Expected error containing '{}', got '{}'",
                    test_case.name,
                    expected_error,
                    error_msg
                );
            }
        }
    }
}

#[test]
fn test_defaults_fill_missing_sections() {
    let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
    assert_eq!(config.remote.base_url, "http://localhost:8998");
    assert_eq!(config.remote.session["kind"], "pyspark");
    assert_eq!(config.search.published_index, "published");
    assert_eq!(config.analysis.organization, "AnalysisOrganization");
    assert_eq!(config.analysis.record_group, "AnalysisRecordGroup");
    assert!(config.supervisor.max_concurrent_polls >= 4);
    assert_eq!(config.logging.level, "info");
}
