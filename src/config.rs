//! Runtime configuration, read once at startup and passed down explicitly.

use std::env;
use std::path::PathBuf;

/// Full read/write access to the user's Drive.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

pub const DEFAULT_CLIENT_SECRETS: &str = "credentials.json";
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

const CLIENT_SECRETS_VAR: &str = "DRIVE_CLIENT_SECRETS";
const TOKEN_FILE_VAR: &str = "DRIVE_TOKEN_FILE";
const API_BASE_VAR: &str = "DRIVE_API_BASE";

/// Settings for the credential store.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Where the credential blob is persisted between runs.
    pub token_path: PathBuf,
    /// OAuth client configuration downloaded from the Google Cloud console.
    pub client_secrets_path: PathBuf,
    pub scopes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            client_secrets_path: PathBuf::from(DEFAULT_CLIENT_SECRETS),
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }
}

/// What to download and where, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub target_dir: PathBuf,
    /// Page size requested from the listing; not validated.
    pub file_count: i32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            api_base: DRIVE_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Build the configuration from the environment, falling back to defaults
    /// for anything unset or empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get(CLIENT_SECRETS_VAR) {
            config.auth.client_secrets_path = PathBuf::from(path);
        }
        if let Some(path) = get(TOKEN_FILE_VAR) {
            config.auth.token_path = PathBuf::from(path);
        }
        if let Some(base) = get(API_BASE_VAR) {
            config.api_base = base.trim_end_matches('/').to_string();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.auth.token_path, PathBuf::from("token.json"));
        assert_eq!(config.auth.client_secrets_path, PathBuf::from("credentials.json"));
        assert_eq!(config.auth.scopes, vec![DRIVE_SCOPE.to_string()]);
        assert_eq!(config.api_base, DRIVE_API_BASE);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DRIVE_CLIENT_SECRETS", "/etc/drive/client.json"),
            ("DRIVE_TOKEN_FILE", "/var/lib/drive/token.json"),
            ("DRIVE_API_BASE", "http://127.0.0.1:9000/"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(
            config.auth.client_secrets_path,
            PathBuf::from("/etc/drive/client.json")
        );
        assert_eq!(config.auth.token_path, PathBuf::from("/var/lib/drive/token.json"));
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = Config::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config.auth.token_path, PathBuf::from(DEFAULT_TOKEN_FILE));
    }
}
