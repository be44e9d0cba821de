//! Client configuration and its on-disk storage.
//!
//! A [`ClientConfig`] names the server to talk to, the optional access token,
//! and a few transport settings. [`ConfigStorage`] keeps one serialized config
//! in ~/.pz_config/ so the token does not have to be typed on every run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors building or loading a client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid host '{0}': expected pz, pz-dev, localhost or an http(s) URL")]
    InvalidHost(String),
    #[error("HOME not set")]
    NoHome,
    #[error("Failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Photo-z Server deployment to connect to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServerHost {
    /// "pz": public production server
    #[default]
    Production,
    /// "pz-dev": test environment
    Development,
    /// "localhost": local development stack
    Localhost,
    /// Any other API root URL
    Custom(String),
}

impl ServerHost {
    /// Root URL of the REST API, always ending with '/'.
    pub fn api_url(&self) -> String {
        match self {
            ServerHost::Production => "https://pz-server.linea.org.br/api/".to_string(),
            ServerHost::Development => "https://pz-server-dev.linea.org.br/api/".to_string(),
            ServerHost::Localhost => "http://localhost/api/".to_string(),
            ServerHost::Custom(url) => {
                if url.ends_with('/') {
                    url.clone()
                } else {
                    format!("{url}/")
                }
            }
        }
    }

    /// Short key accepted by [`FromStr`].
    pub fn key(&self) -> &str {
        match self {
            ServerHost::Production => "pz",
            ServerHost::Development => "pz-dev",
            ServerHost::Localhost => "localhost",
            ServerHost::Custom(url) => url,
        }
    }
}

impl FromStr for ServerHost {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "pz" => Ok(ServerHost::Production),
            "pz-dev" => Ok(ServerHost::Development),
            "localhost" => Ok(ServerHost::Localhost),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(ServerHost::Custom(url.to_string()))
            }
            other => Err(ConfigError::InvalidHost(other.to_string())),
        }
    }
}

impl TryFrom<String> for ServerHost {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerHost> for String {
    fn from(host: ServerHost) -> Self {
        host.key().to_string()
    }
}

impl fmt::Display for ServerHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

/// Settings used to build a [`crate::PzServer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub host: ServerHost,
    /// Token generated on the Photo-z Server website; None means public data only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Where `get_product(.., true)` writes the raw file
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Honour HTTP(S)_PROXY and friends
    #[serde(default = "default_true")]
    pub proxy_from_env: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: ServerHost::default(),
            token: None,
            timeout_secs: default_timeout_secs(),
            download_dir: default_download_dir(),
            proxy_from_env: true,
        }
    }
}

impl ClientConfig {
    pub fn new(host: ServerHost) -> Self {
        Self {
            host,
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_proxy_from_env(mut self, enabled: bool) -> Self {
        self.proxy_from_env = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Storage for the client configuration file.
///
/// Defaults to ~/.pz_config/client.json.
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a config storage rooted at ~/.pz_config
    pub fn new() -> Result<Self, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
        Ok(Self {
            root_path: PathBuf::from(home).join(".pz_config"),
        })
    }

    /// Create a config storage with custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn client_config_path(&self) -> PathBuf {
        self.root_path.join("client.json")
    }

    /// Load the stored client configuration.
    ///
    /// Returns Ok(None) if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<ClientConfig>, ConfigError> {
        let path = self.client_config_path();

        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = serde_json::from_str(&contents)
            .map_err(|source| ConfigError::Malformed { path, source })?;
        Ok(Some(config))
    }

    /// Save the client configuration, creating the directory if needed.
    ///
    /// Returns the path written.
    pub fn save(&self, config: &ClientConfig) -> Result<PathBuf, ConfigError> {
        std::fs::create_dir_all(&self.root_path).map_err(|source| ConfigError::Io {
            path: self.root_path.clone(),
            source,
        })?;

        let path = self.client_config_path();
        let contents = serde_json::to_string_pretty(config).map_err(|source| {
            ConfigError::Malformed {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, contents).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Delete the stored configuration.
    ///
    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete(&self) -> Result<bool, ConfigError> {
        let path = self.client_config_path();

        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&path).map_err(|source| ConfigError::Io { path, source })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_host_keys() {
        assert_eq!("pz".parse::<ServerHost>().unwrap(), ServerHost::Production);
        assert_eq!(
            "pz-dev".parse::<ServerHost>().unwrap(),
            ServerHost::Development
        );
        assert_eq!(
            "localhost".parse::<ServerHost>().unwrap().api_url(),
            "http://localhost/api/"
        );
        assert_eq!(ServerHost::default(), ServerHost::Production);
        assert_eq!(ServerHost::default().key(), "pz");
    }

    #[test]
    fn test_custom_host_gets_trailing_slash() {
        let host: ServerHost = "http://127.0.0.1:8000/api".parse().unwrap();
        assert_eq!(host.api_url(), "http://127.0.0.1:8000/api/");

        let host: ServerHost = "https://example.org/api/".parse().unwrap();
        assert_eq!(host.api_url(), "https://example.org/api/");
    }

    #[test]
    fn test_unknown_host_rejected() {
        assert!(matches!(
            "pz-prod".parse::<ServerHost>(),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: ClientConfig = serde_json::from_str(r#"{"host": "pz-dev"}"#).unwrap();
        assert_eq!(config.host, ServerHost::Development);
        assert_eq!(config.token, None);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.proxy_from_env);
    }

    #[test]
    fn test_storage_round_trip_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = ConfigStorage::with_path(dir.path().join("cfg"));

        assert!(storage.load().unwrap().is_none());
        assert!(!storage.delete().unwrap());

        let config = ClientConfig::new(ServerHost::Localhost)
            .with_token("abc")
            .with_timeout(Duration::from_secs(5));
        let path = storage.save(&config).unwrap();
        assert!(path.exists());

        assert_eq!(storage.load().unwrap(), Some(config));
        assert!(storage.delete().unwrap());
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = ConfigStorage::with_path(dir.path().to_path_buf());
        std::fs::write(dir.path().join("client.json"), "{not json").unwrap();

        assert!(matches!(
            storage.load(),
            Err(ConfigError::Malformed { .. })
        ));
    }
}
