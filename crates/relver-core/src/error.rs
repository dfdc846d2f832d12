//! Configuration errors.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source failed to parse or did not match the schema.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// A config file passed explicitly does not exist.
    #[error("config file not found: {0}")]
    MissingFile(Utf8PathBuf),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
