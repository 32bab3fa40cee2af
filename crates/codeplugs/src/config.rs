use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv6Addr::LOCALHOST, 8080)),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot the workspace is loaded from and saved to.
    pub path: PathBuf,

    /// Keep everything in memory and never touch `path`.
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./codeplugs.json"),
            in_memory: false,
        }
    }
}

impl StorageConfig {
    pub fn snapshot_path(&self) -> Option<&Path> {
        (!self.in_memory).then_some(self.path.as_path())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ContactsConfig {
    pub default_page_size: usize,
    pub filter_list_page_size: usize,
}

impl Default for ContactsConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            filter_list_page_size: 100,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub contacts: ContactsConfig,
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let file = std::fs::read_to_string(path)?;
        let config = toml::from_str(&file)?;

        Ok(config)
    }
}
