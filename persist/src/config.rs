use super::Persist;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub server: Url,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: Url::parse(DEFAULT_SERVER).expect("default server url is valid"),
        }
    }
}

impl Persist for Settings {}

#[derive(Clone, Debug)]
pub struct Config {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub credentials_file: PathBuf,
    pub settings: Settings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading or writing config: {0}")]
    IO(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("no config directory available")]
    NoConfigDir,
}

impl Config {
    /// `~/.synctify`
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".synctify"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub async fn open<T: AsRef<Path> + Send + Sync>(config_dir: T) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref().to_owned();
        let config_file = config_dir.join("config.json");
        let credentials_file = config_dir.join("credentials.json");

        tokio::fs::create_dir_all(&config_dir).await?;

        let settings = match Settings::load(&config_file).await {
            Ok(settings) => settings,
            Err(ConfigError::IO(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Settings::default();
                settings.save(&config_file).await?;
                settings
            }
            Err(err) => return Err(err),
        };

        tracing::debug!(dir = %config_dir.display(), server = %settings.server, "loaded config");
        Ok(Self {
            config_dir,
            config_file,
            credentials_file,
            settings,
        })
    }

    pub async fn set_server(&mut self, server: Url) -> Result<(), ConfigError> {
        self.settings.server = server;
        self.settings.save(&self.config_file).await
    }
}
