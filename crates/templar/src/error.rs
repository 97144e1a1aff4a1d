//! Error type for the facade.

use std::path::PathBuf;

use templar_render::RenderError;
use thiserror::Error;

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, Error)]
pub enum TemplarError {
    /// Adaptation, resolution or template I/O failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The `engine` option names an implementation that is not registered.
    #[error("unknown rendering implementation `{0}`")]
    UnknownEngine(String),

    /// The `use` option names a middleware that is not in the catalog.
    #[error("unknown middleware `{0}`")]
    UnknownMiddleware(String),

    /// A middleware rejected the template source.
    #[error("middleware `{name}` failed: {message}")]
    Middleware { name: String, message: String },

    /// A data directory or configuration file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplarError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplarError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, TemplarError>;
