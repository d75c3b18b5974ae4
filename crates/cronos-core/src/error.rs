use thiserror::Error;

#[derive(Debug, Error)]
pub enum CronosError {
    /// cronos.toml (or a CRONOS_* override) could not be read or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),
}

impl CronosError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            CronosError::Config(_) => "CONFIG_ERROR",
            CronosError::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
        }
    }
}

pub type Result<T> = std::result::Result<T, CronosError>;
