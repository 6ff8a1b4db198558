//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Authentication method string is not one of the supported methods.
    #[error("unknown auth_method '{0}' (expected one of: oauth, service-principal, headless)")]
    UnknownAuthMethod(String),

    /// Missing required field.
    #[error("missing required field '{field}' for auth_method '{method}' (set it in config or via {env_var})")]
    MissingField {
        field: &'static str,
        method: String,
        env_var: &'static str,
    },

    /// The configured base URL does not parse.
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}
