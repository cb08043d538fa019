//! Unified, `miette`-based error type for the weakspec harness.
//!
//! Every failure a test body can produce is a [`HarnessError`]. At the runner
//! boundary all variants are treated alike: the current case is marked failed
//! and the message is recorded. [`ErrorType`] gives callers a typed way to ask
//! which kind of failure occurred without matching on message strings.
//!
//! Use the [`err_msg!`](crate::err_msg) macro for message-only errors:
//!
//! ```rust
//! use weakspec::{err_msg, ErrorType};
//! let err = err_msg!(InvalidArgument, "WeakRef target must be an object, got {}", "number");
//! assert_eq!(err.error_type(), ErrorType::InvalidArgument);
//! ```

use miette::Diagnostic;
use thiserror::Error;

use crate::value::ObjectId;

/// Type-safe error classification that corresponds to [`HarnessError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorType {
    /// Bad construction input (absent, null or primitive targets).
    InvalidArgument,
    /// An expectation did not hold.
    AssertionFailed,
    /// Any other failure raised inside a test body, panics included.
    UnhandledFailure,
    /// An operation referred to an object the heap does not know.
    Heap,
    /// Configuration could not be read or parsed.
    Config,
    /// Harness invariant violated.
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::InvalidArgument => "InvalidArgument",
            ErrorType::AssertionFailed => "AssertionFailed",
            ErrorType::UnhandledFailure => "UnhandledFailure",
            ErrorType::Heap => "Heap",
            ErrorType::Config => "Config",
            ErrorType::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every failure mode of the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Assertion failed: {message}")]
    AssertionFailed {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("Unhandled failure: {message}")]
    UnhandledFailure { message: String },

    #[error("Heap error: object {object} is not live")]
    Heap { object: ObjectId },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HarnessError {
    /// Returns the type-safe classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            HarnessError::InvalidArgument { .. } => ErrorType::InvalidArgument,
            HarnessError::AssertionFailed { .. } => ErrorType::AssertionFailed,
            HarnessError::UnhandledFailure { .. } => ErrorType::UnhandledFailure,
            HarnessError::Heap { .. } => ErrorType::Heap,
            HarnessError::Config { .. } => ErrorType::Config,
            HarnessError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// Builds an assertion failure carrying both sides of the comparison.
    pub fn mismatch(
        message: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        HarnessError::AssertionFailed {
            message: message.into(),
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
        }
    }

    /// The bare message, without the variant prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            HarnessError::InvalidArgument { message }
            | HarnessError::AssertionFailed { message, .. }
            | HarnessError::UnhandledFailure { message }
            | HarnessError::Config { message, .. }
            | HarnessError::Internal { message } => message.clone(),
            HarnessError::Heap { object } => format!("object {} is not live", object),
        }
    }
}

impl Diagnostic for HarnessError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            HarnessError::InvalidArgument { .. } => "weakspec::invalid_argument",
            HarnessError::AssertionFailed { .. } => "weakspec::assertion",
            HarnessError::UnhandledFailure { .. } => "weakspec::unhandled",
            HarnessError::Heap { .. } => "weakspec::heap",
            HarnessError::Config { .. } => "weakspec::config",
            HarnessError::Internal { .. } => "weakspec::internal",
        };
        Some(Box::new(code) as Box<dyn std::fmt::Display + 'a>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let text = match self {
            HarnessError::AssertionFailed {
                expected: Some(expected),
                actual: Some(actual),
                ..
            } => format!("expected {}, got {}", expected, actual),
            HarnessError::InvalidArgument { .. } => {
                "weak references can only target live heap objects".to_string()
            }
            HarnessError::Config { .. } => {
                "check the YAML config file passed with --config".to_string()
            }
            _ => return None,
        };
        Some(Box::new(text) as Box<dyn std::fmt::Display + 'a>)
    }
}

/// Constructs a [`HarnessError`] variant that carries only a formatted message.
#[macro_export]
macro_rules! err_msg {
    (AssertionFailed, $($arg:tt)+) => {
        $crate::HarnessError::AssertionFailed {
            message: format!($($arg)+),
            expected: None,
            actual: None,
        }
    };
    (Config, $($arg:tt)+) => {
        $crate::HarnessError::Config {
            message: format!($($arg)+),
            source: None,
        }
    };
    ($variant:ident, $($arg:tt)+) => {
        $crate::HarnessError::$variant {
            message: format!($($arg)+),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_tracks_variant() {
        let err = err_msg!(UnhandledFailure, "boom");
        assert_eq!(err.error_type(), ErrorType::UnhandledFailure);
        assert_eq!(err.to_string(), "Unhandled failure: boom");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn mismatch_populates_help() {
        let err = HarnessError::mismatch("values differ", 1, 2);
        let help = err.help().map(|h| h.to_string());
        assert_eq!(help.as_deref(), Some("expected 1, got 2"));
        assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("weakspec::assertion"));
    }

    #[test]
    fn config_macro_arm_has_no_source() {
        let err = err_msg!(Config, "missing {}", "file");
        assert!(matches!(err, HarnessError::Config { source: None, .. }));
        assert_eq!(err.error_type().as_str(), "Config");
    }
}
