//! Application configuration loaded from `config.toml`

use std::fs;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::SchedulerPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid server address {0}")]
    InvalidAddress(String),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Listener address. `host` may be an IP literal or a name such as
    /// `localhost`, which resolves to its first address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        let invalid = || ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port));
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Where decks, cards and activity live; defaults to the platform data dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub server: ServerConfig,
    pub scheduler: SchedulerPolicy,
}

impl AppConfig {
    /// Default config file location (e.g., ~/.config/flashdeck/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("flashdeck").join("config.toml"))
    }

    /// Default data directory (e.g., ~/.local/share/flashdeck)
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("flashdeck"))
            .ok_or(ConfigError::DataDirNotFound)
    }

    /// Load from `path`, or the default location when `None`. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Configured data directory or the platform default
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_data_dir(),
        }
    }
}
