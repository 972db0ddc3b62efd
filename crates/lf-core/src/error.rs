//! Unified error type for labelforge.
//!
//! Every crate funnels its failures into [`Error`]. The three domain kinds
//! mirror how a failure should be surfaced: [`Error::Argument`] for bad input
//! from the caller, [`Error::Data`] for malformed annotation or frame data,
//! and [`Error::Scripting`] for an action breaking its contract.

use std::fmt;

/// Unified error type covering all failure modes in labelforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid caller input: bad action registration or malformed run
    /// parameters.
    #[error("Argument error: {0}")]
    Argument(String),

    /// Malformed annotation or frame data encountered while running.
    #[error("Data error: {0}")]
    Data(String),

    /// An action violated the pipeline contract.
    #[error("Scripting error [{action}]: {message}")]
    Scripting {
        /// Name of the offending action.
        action: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Argument`].
    pub fn argument(message: impl fmt::Display) -> Self {
        Error::Argument(message.to_string())
    }

    /// Convenience constructor for [`Error::Data`].
    pub fn data(message: impl fmt::Display) -> Self {
        Error::Data(message.to_string())
    }

    /// Convenience constructor for [`Error::Scripting`].
    pub fn scripting(action: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Scripting {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error kind, used in audit events.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Argument(_) => "argument",
            Error::Data(_) => "data",
            Error::Scripting { .. } => "scripting",
            Error::Io { .. } => "io",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Data(err.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_display() {
        let err = Error::argument("action name must not be empty");
        assert_eq!(
            err.to_string(),
            "Argument error: action name must not be empty"
        );
        assert_eq!(err.kind(), "argument");
    }

    #[test]
    fn data_display() {
        let err = Error::data("frame 12 is out of range");
        assert_eq!(err.to_string(), "Data error: frame 12 is out of range");
        assert_eq!(err.kind(), "data");
    }

    #[test]
    fn scripting_display() {
        let err = Error::scripting("Shift shapes", "emitted a shape for frame 3");
        assert_eq!(
            err.to_string(),
            "Scripting error [Shift shapes]: emitted a shape for frame 3"
        );
        assert_eq!(err.kind(), "scripting");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn json_errors_become_data_errors() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::from(parse);
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);

        fn err_fn() -> Result<i32> {
            Err(Error::Internal("boom".into()))
        }
        assert!(err_fn().is_err());
    }
}
