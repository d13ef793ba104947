pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# SUMO-EXPORT CONFIGURATION
# =============================================================================
# Every setting below is optional; the values shown are the defaults.
# Command-line flags override what is set here.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/sumo-export/config.yml
#   3. /etc/sumo-export/config.yml
#
# Values may reference environment variables with $env{NAME}.
#
# Credentials are NOT stored here. Run `sumo-export setup` once, or export
# SUMO_ACCESS_ID and SUMO_ACCESS_KEY.

# =============================================================================
# SEARCH JOB API
# =============================================================================
api:
  # Search job endpoint for your deployment region
  endpoint: https://api.sumologic.com/api/v1/search/jobs
  # Search scope; '*' exports everything visible to the access key
  scope: '*'
  # Field projection appended as '| fields a, b, c'
  fields:
    - _messagetime
    - _sourcecategory
    - _sourcehost
    - _sourcename
    - _collector
    - _raw
  time_zone: UTC
  # Messages requested per page
  page_size: 10000
  # Per-request timeout
  timeout: 1m
  # Fixed wait between attempts of a failed request
  retry_interval: 1s

# =============================================================================
# EXPORT
# =============================================================================
export:
  # Length of each search window
  increment: 5m
  # Range exported when --start is omitted
  lookback: 1d
  download_workers: 10
  save_workers: 5
  # Artifacts are written to <output_dir>/exports/<window start>.json.gz
  output_dir: .

# =============================================================================
# SINK
# =============================================================================
# Setting a bucket uploads artifacts to S3 instead of the local directory.
sink:
  # bucket: my-log-archive
  # profile: default
  # region: us-east-1
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_starter_config_matches_defaults() {
        let config = parse_config(&generate_starter_config()).unwrap();
        let defaults = crate::config::Config::default();

        assert_eq!(config.api.endpoint, defaults.api.endpoint);
        assert_eq!(config.api.fields, defaults.api.fields);
        assert_eq!(config.api.timeout, defaults.api.timeout);
        assert_eq!(config.export.increment, defaults.export.increment);
        assert_eq!(config.export.lookback, defaults.export.lookback);
        assert!(config.sink.bucket.is_none());
    }
}
