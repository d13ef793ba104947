use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ACCESS_ID_ENV: &str = "SUMO_ACCESS_ID";
pub const ACCESS_KEY_ENV: &str = "SUMO_ACCESS_KEY";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(
        "no API credentials found (looked for SUMO_ACCESS_ID/SUMO_ACCESS_KEY and {0}).\n\
         Run `sumo-export setup` once to store an access id and key."
    )]
    Missing(String),

    #[error("credentials file {path} is incomplete: {reason}")]
    Incomplete { path: PathBuf, reason: String },

    #[error("failed to access credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse credentials file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CredentialsError>;

/// Long-lived access id/key pair sent as basic auth on every request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_id: String,
    pub access_key: String,
}

impl Credentials {
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Default location: ~/.config/sumo-export/credentials.yml
pub fn default_credentials_path() -> Option<PathBuf> {
    crate::config::user_config_dir().map(|dir| dir.join("credentials.yml"))
}

/// Load credentials from the environment, falling back to the credentials file.
pub fn load_credentials(path: Option<&Path>) -> Result<Credentials> {
    let from_env = (
        std::env::var(ACCESS_ID_ENV).ok(),
        std::env::var(ACCESS_KEY_ENV).ok(),
    );
    if let (Some(id), Some(key)) = from_env {
        if !id.is_empty() && !key.is_empty() {
            return Ok(Credentials::new(id, key));
        }
    }

    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_credentials_path()
            .ok_or_else(|| CredentialsError::Missing("no home directory".to_string()))?,
    };

    if !path.exists() {
        return Err(CredentialsError::Missing(path.display().to_string()));
    }

    read_credentials_file(&path)
}

pub fn read_credentials_file(path: &Path) -> Result<Credentials> {
    let text = std::fs::read_to_string(path)?;
    let credentials: Credentials = serde_yaml::from_str(&text)?;

    if credentials.access_id.trim().is_empty() {
        return Err(CredentialsError::Incomplete {
            path: path.to_path_buf(),
            reason: "access_id is empty".to_string(),
        });
    }
    if credentials.access_key.trim().is_empty() {
        return Err(CredentialsError::Incomplete {
            path: path.to_path_buf(),
            reason: "access_key is empty".to_string(),
        });
    }

    Ok(credentials)
}

/// Write the credentials file, readable by the owner only on unix.
pub fn write_credentials_file(path: &Path, credentials: &Credentials) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(credentials)?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; an existing file is tightened before the key is written
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(yaml.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.yml");
        let credentials = Credentials::new("suABC", "secret-key");

        write_credentials_file(&path, &credentials).unwrap();
        assert_eq!(read_credentials_file(&path).unwrap(), credentials);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.yml");
        std::fs::write(&path, "access_id: old\naccess_key: old-key-that-is-longer\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let credentials = Credentials::new("suNEW", "k");
        write_credentials_file(&path, &credentials).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(read_credentials_file(&path).unwrap(), credentials);
    }

    #[test]
    fn test_empty_key_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.yml");
        std::fs::write(&path, "access_id: suABC\naccess_key: ''\n").unwrap();

        let err = read_credentials_file(&path).unwrap_err();
        assert!(matches!(err, CredentialsError::Incomplete { .. }));
    }

    #[test]
    fn test_missing_error_mentions_setup() {
        let err = CredentialsError::Missing("/nowhere/credentials.yml".to_string());
        let message = err.to_string();
        assert!(message.contains("sumo-export setup"));
        assert!(message.contains("/nowhere/credentials.yml"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let credentials = Credentials::new("suABC", "secret-key");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("suABC"));
        assert!(!debug.contains("secret-key"));
    }
}
