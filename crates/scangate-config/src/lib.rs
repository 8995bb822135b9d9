//! Environment configuration for scangate.
//!
//! All knobs come from the process environment with conservative
//! defaults, so a bare `scangate-server` starts with the in-memory
//! backend and no external services.

pub mod error;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::{Settings, StorageBackend};
