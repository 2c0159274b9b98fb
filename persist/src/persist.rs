use super::ConfigError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

#[async_trait::async_trait]
pub trait Persist: Serialize + DeserializeOwned + Send + Sync {
    async fn load<P: AsRef<Path> + Send + Sync>(config_file: P) -> Result<Self, ConfigError> {
        let buf = tokio::fs::read_to_string(config_file).await?;
        let deser = serde_json::from_str::<Self>(&buf)?;
        Ok(deser)
    }

    async fn save<P: AsRef<Path> + Send + Sync>(&self, config_file: P) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(&self)?;
        tokio::fs::write(config_file, data).await?;
        Ok(())
    }

    /// Deletes the persisted file, if any.
    async fn remove<P: AsRef<Path> + Send + Sync>(config_file: P) -> Result<(), ConfigError> {
        match tokio::fs::remove_file(config_file).await {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}
