use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, ENV_VAR_PATTERN};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate config text. Environment variables are expanded first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    // An empty file is a valid, all-defaults config
    let mut config: Config = if yaml_string.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml_string)?
    };

    config.export.output_dir = expand_tilde(&config.export.output_dir);

    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = ENV_VAR_PATTERN
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let api = &config.api;
    if !(api.endpoint.starts_with("http://") || api.endpoint.starts_with("https://")) {
        errors.push(format!(
            "api.endpoint must be an http(s) URL, got '{}'",
            api.endpoint
        ));
    }
    if api.scope.trim().is_empty() {
        errors.push("api.scope cannot be empty (use '*' to match everything)".to_string());
    }
    if api.page_size == 0 {
        errors.push("api.page_size must be greater than 0".to_string());
    }
    if api.timeout.is_zero() {
        errors.push("api.timeout must be greater than 0".to_string());
    }
    if api.time_zone.trim().is_empty() {
        errors.push("api.time_zone cannot be empty".to_string());
    }

    let export = &config.export;
    if export.increment.as_secs() == 0 {
        errors.push("export.increment must be at least 1s".to_string());
    }
    if export.lookback.as_secs() == 0 {
        errors.push("export.lookback must be at least 1s".to_string());
    }
    if export.download_workers == 0 {
        errors.push("export.download_workers must be at least 1".to_string());
    }
    if export.save_workers == 0 {
        errors.push("export.save_workers must be at least 1".to_string());
    }

    if let Some(bucket) = &config.sink.bucket {
        if bucket.trim().is_empty() {
            errors.push("sink.bucket cannot be empty when set".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.api.page_size, 10_000);
        assert_eq!(config.api.retry_interval, Duration::from_secs(1));
        assert_eq!(config.export.download_workers, 10);
        assert_eq!(config.export.save_workers, 5);
        assert!(config.sink.bucket.is_none());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = parse_config(
            r#"
export:
  increment: 15m
  save_workers: 2
"#,
        )
        .unwrap();
        assert_eq!(config.export.increment, Duration::from_secs(900));
        assert_eq!(config.export.save_workers, 2);
        assert_eq!(config.export.download_workers, 10);
        assert_eq!(config.api.time_zone, "UTC");
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let err = parse_config(
            r#"
api:
  endpoint: ftp://example.com
  page_size: 0
export:
  download_workers: 0
"#,
        )
        .unwrap_err();

        match err {
            ConfigError::ValidationList(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].contains("api.endpoint"));
                assert!(errors[1].contains("api.page_size"));
                assert!(errors[2].contains("export.download_workers"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unset_env_var_is_reported() {
        let err = parse_config("sink:\n  bucket: $env{SUMO_EXPORT_TEST_UNSET_BUCKET}\n")
            .unwrap_err();
        assert!(err.to_string().contains("SUMO_EXPORT_TEST_UNSET_BUCKET"));
    }

    #[test]
    fn test_bad_duration_is_a_yaml_error() {
        let err = parse_config("export:\n  increment: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse(_)));
    }

    #[test]
    fn test_overflowing_duration_is_rejected() {
        let err = parse_config("export:\n  increment: 300000000000000d\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse(_)));
        assert!(err.to_string().contains("duration too large"));
    }
}
