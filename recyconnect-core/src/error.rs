/// Structured error types for recyconnect-core.
///
/// The binary (recyconnect-cli) wraps these with `anyhow` context; the
/// server crate keeps its own HTTP-facing error types.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for recyconnect-core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Config could not be rendered back to TOML
    #[error("Failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Hashing failed or a stored hash is not valid bcrypt
    #[error("Password hash error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, CoreError>;
