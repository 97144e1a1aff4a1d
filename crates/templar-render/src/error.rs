//! Error types for adaptation and engine resolution.
//!
//! This module provides [`RenderError`], the error type returned by every
//! operation of the uniform contract. Errors raised by a wrapped
//! implementation are carried verbatim inside [`RenderError::Adaptation`];
//! the adapter never rewrites their message.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::implementation::ImplError;

/// Error type for template adaptation and resolution.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No candidate implementation could be selected.
    ///
    /// Callers must surface this as a configuration failure rather than
    /// silently falling back to some default engine.
    #[error("no compatible rendering implementation found{}", for_file(.filename.as_deref()))]
    NoImplementation {
        /// The file the resolution was attempted for, if any.
        filename: Option<PathBuf>,
    },

    /// The wrapped implementation raised an error.
    #[error("{implementation}: {source}")]
    Adaptation {
        /// Name of the implementation that failed.
        implementation: String,
        /// The implementation's own error, unchanged.
        #[source]
        source: ImplError,
    },

    /// A method can be neither found on the implementation nor synthesized.
    #[error("{implementation} cannot {method}: {reason}")]
    CapabilityGap {
        implementation: String,
        method: &'static str,
        reason: String,
    },

    /// Failed to read a template, partial or manifest.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Locals, options or a manifest could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An options document could not be parsed.
    #[error("invalid options: {0}")]
    Options(#[from] serde_yaml::Error),
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn gap(
        implementation: impl Into<String>,
        method: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        RenderError::CapabilityGap {
            implementation: implementation.into(),
            method,
            reason: reason.into(),
        }
    }
}

fn for_file(filename: Option<&Path>) -> String {
    match filename {
        Some(path) => format!(" for {}", path.display()),
        None => String::new(),
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
