pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub use parse::{load_config, parse_config, ConfigError};
pub use types::{ApiConfig, Config, ExportConfig, SinkConfig};

/// Matches `$env{VAR_NAME}` where VAR_NAME starts with a letter or underscore.
pub(crate) static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
});

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// Expands tilde (~) in paths to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Per-user directory holding config.yml and credentials.yml.
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("sumo-export"))
}

/// Resolves the config file path based on explicit argument or default locations.
/// Returns the first existing path from:
/// 1. Explicit path (if provided, with tilde expansion)
/// 2. ~/.config/sumo-export/config.yml
/// 3. /etc/sumo-export/config.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(dir) = user_config_dir() {
        let user_config = dir.join("config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/sumo-export/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("SUMO_EXPORT_TEST_VAR", "test_value");
        let result = expand_env_vars("bucket-$env{SUMO_EXPORT_TEST_VAR}");
        assert_eq!(result, "bucket-test_value");
        std::env::remove_var("SUMO_EXPORT_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_unset() {
        let result = expand_env_vars("path/$env{SUMO_EXPORT_NONEXISTENT_VAR}/file");
        assert_eq!(result, "path/$env{SUMO_EXPORT_NONEXISTENT_VAR}/file");
    }

    #[test]
    fn test_expand_env_vars_no_expansion() {
        let result = expand_env_vars("plain/path/without/vars");
        assert_eq!(result, "plain/path/without/vars");
    }

    #[test]
    fn test_expand_tilde_with_path() {
        let expanded = expand_tilde(Path::new("~/exports"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("exports"));
        }
    }

    #[test]
    fn test_expand_tilde_no_expansion() {
        let expanded = expand_tilde(Path::new("/absolute/path"));
        assert_eq!(expanded, Path::new("/absolute/path"));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let resolved = resolve_config_path(Some(Path::new("/tmp/custom.yml")));
        assert_eq!(resolved, Some(PathBuf::from("/tmp/custom.yml")));
    }
}
