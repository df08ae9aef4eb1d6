//! Error types and error classification
//!
//! Two families of errors live here:
//!
//! - [`LayoutError`]: failures of the layout layer itself (partial
//!   discovery, configuration loading, the template engine).
//! - [`DataError`]: failures reported by data providers. These never escape a
//!   request; they are classified with [`classify`] and either shown to the
//!   client through the error key of the view context or only logged.

use std::path::PathBuf;

use thiserror::Error;

/// Layout layer error type
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The partials directory could not be listed
    #[error("failed to list partials in '{}': {source}", path.display())]
    PartialDiscovery {
        /// Directory that was listed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Template lookup or rendering failed inside minijinja
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Any other template engine failure
    #[error("template engine error: {0}")]
    Engine(String),
}

impl From<figment::Error> for LayoutError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Error returned by a data provider
///
/// A provider decides at the point of failure whether the client may see the
/// message. [`DataError::user`] carries an explicit user-facing cause;
/// anything else is internal and is only logged.
///
/// # Examples
///
/// ```rust
/// use acton_layout::error::{classify, Classified, DataError};
///
/// let err = DataError::user("loading dashboard", "A WRAPPED error");
/// assert_eq!(
///     classify(&err),
///     Classified::UserFacing("A wrapped error".to_string())
/// );
/// ```
#[derive(Debug, Error)]
pub enum DataError {
    /// Failure with a message meant for the client
    #[error("{context}: {message}")]
    User {
        /// Internal context, logged only
        context: String,
        /// Cause shown to the client after normalisation
        message: String,
    },

    /// Failure that must never be shown verbatim
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DataError {
    /// Create an error whose `message` is shown to the client
    pub fn user(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::User {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an internal-only error from a message
    pub fn internal(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Internal(anyhow::Error::msg(message))
    }

    /// Adapt an arbitrary error
    ///
    /// An error exposing a `source()` is treated as wrapping a user-facing
    /// cause: the source becomes the message and the outer error the context.
    /// Errors without a source are internal.
    pub fn from_std<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match err.source().map(ToString::to_string) {
            Some(message) => Self::User {
                context: err.to_string(),
                message,
            },
            None => Self::Internal(err.into()),
        }
    }
}

/// Outcome of classifying a [`DataError`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Normalised message for the client
    UserFacing(String),
    /// Raw internal error text, for logs only
    Internal(String),
}

/// Classify a provider error
///
/// User-facing messages are lower-cased and then get their first character
/// upper-cased.
#[must_use]
pub fn classify(err: &DataError) -> Classified {
    match err {
        DataError::User { message, .. } => Classified::UserFacing(capitalize_first(&message.to_lowercase())),
        DataError::Internal(cause) => Classified::Internal(format!("{cause:#}")),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
