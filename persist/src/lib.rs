mod config;
mod credentials;
mod persist;
pub use config::{Config, ConfigError, Settings, DEFAULT_SERVER};
pub use credentials::Credentials;
pub use persist::Persist;
