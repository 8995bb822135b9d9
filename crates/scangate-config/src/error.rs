//! Configuration error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}: {message}")]
    InvalidValue {
        var: &'static str,
        value: String,
        message: String,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
