//! # Business Error Types
//!
//! This module defines [`BusinessError`], the uniform carrier for business-rule
//! violations across an application. Every instance holds a human-readable
//! message, an optional underlying cause, and a numeric code that callers can
//! branch on (for example, to pick an API response status).
//!
//! ## Codes
//!
//! - `-1` ([`BusinessError::DEFAULT_CODE`]) when no code is supplied
//! - an explicit code passed by the caller
//! - the code of a [`ResultCode`] table entry
//!
//! ## Usage Example
//!
//! ```rust
//! use universal_common::errors::{BusinessError, BusinessResult};
//! use universal_common::response::StatusCode;
//!
//! fn withdraw(balance: i64, amount: i64) -> BusinessResult<i64> {
//!     if amount > balance {
//!         return Err(BusinessError::with_code(4001, "insufficient balance"));
//!     }
//!     if amount <= 0 {
//!         return Err(StatusCode::BadRequest.into());
//!     }
//!     Ok(balance - amount)
//! }
//!
//! let err = withdraw(10, 20).unwrap_err();
//! assert_eq!(err.code(), 4001);
//! assert_eq!(err.to_string(), "insufficient balance");
//! ```

use std::error::Error as StdError;

use thiserror::Error;

use crate::response::{ResultCode, StatusCode};

/// Boxed cause attached to a [`BusinessError`].
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Convenience alias for results that fail with a [`BusinessError`].
pub type BusinessResult<T> = Result<T, BusinessError>;

/// Error raised when a business rule is violated.
///
/// Instances are immutable once constructed. The error is terminal: it is
/// surfaced to the caller as-is and never retried internally.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct BusinessError {
    code: i32,
    message: String,
    #[source]
    source: Option<BoxedCause>,
}

impl BusinessError {
    /// Code assigned when the caller does not supply one.
    pub const DEFAULT_CODE: i32 = -1;

    /// Creates an error with the default code.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(Self::DEFAULT_CODE, message)
    }

    /// Creates an error with the default code that wraps an underlying cause.
    ///
    /// The cause is reachable through [`std::error::Error::source`].
    pub fn with_cause(message: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        Self {
            code: Self::DEFAULT_CODE,
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// Creates an error with an explicit code.
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error whose code and message are copied from a result-code entry.
    pub fn from_result_code<R>(result_code: &R) -> Self
    where
        R: ResultCode + ?Sized,
    {
        Self::with_code(result_code.code(), result_code.message())
    }

    /// Numeric code of this error.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Human-readable message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the error carries [`Self::DEFAULT_CODE`].
    pub fn is_default_code(&self) -> bool {
        self.code == Self::DEFAULT_CODE
    }
}

impl ResultCode for BusinessError {
    fn code(&self) -> i32 {
        self.code
    }

    fn message(&self) -> &str {
        &self.message
    }
}

impl From<StatusCode> for BusinessError {
    fn from(status: StatusCode) -> Self {
        Self::from_result_code(&status)
    }
}

/// Returns early from the enclosing function with a [`BusinessError`].
///
/// The message accepts `format!` arguments. Prefix with `code: <expr>,` to set
/// an explicit code; otherwise the default code is used.
///
/// ```rust
/// use universal_common::bail_business;
/// use universal_common::errors::BusinessResult;
///
/// fn check_age(age: u32) -> BusinessResult<()> {
///     if age < 18 {
///         bail_business!(code: 4030, "age {} is below the minimum", age);
///     }
///     if age > 150 {
///         bail_business!("implausible age {}", age);
///     }
///     Ok(())
/// }
///
/// assert_eq!(check_age(12).unwrap_err().code(), 4030);
/// assert_eq!(check_age(200).unwrap_err().code(), -1);
/// ```
#[macro_export]
macro_rules! bail_business {
    (code: $code:expr, $($arg:tt)+) => {
        return Err($crate::errors::BusinessError::with_code($code, format!($($arg)+)).into())
    };
    ($($arg:tt)+) => {
        return Err($crate::errors::BusinessError::new(format!($($arg)+)).into())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_only_uses_default_code() {
        let err = BusinessError::new("x");
        assert_eq!(err.code(), -1);
        assert_eq!(err.message(), "x");
        assert!(err.is_default_code());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_explicit_code() {
        let err = BusinessError::with_code(42, "y");
        assert_eq!(err.code(), 42);
        assert_eq!(err.to_string(), "y");
        assert!(!err.is_default_code());
    }

    #[test]
    fn test_cause_is_exposed_as_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing row");
        let err = BusinessError::with_cause("lookup failed", io);

        assert_eq!(err.code(), BusinessError::DEFAULT_CODE);
        let source = err.source().expect("cause should be kept");
        assert_eq!(source.to_string(), "missing row");
    }

    #[test]
    fn test_from_status_code() {
        let err: BusinessError = StatusCode::NotFound.into();
        assert_eq!(err.code(), 404);
        assert_eq!(err.message(), StatusCode::NotFound.message());
    }
}
