//! # Universal Common
//!
//! Shared types for signaling business-rule failures across an application.
//!
//! ## Module Organization
//!
//! - [`errors`]: [`BusinessError`], the coded error raised when a business rule is violated
//! - [`response`]: the [`ResultCode`] trait, stock [`StatusCode`]s and the [`ApiResponse`] envelope
//!
//! ## Usage Example
//!
//! ```rust
//! use universal_common::{ApiResponse, BusinessError, StatusCode};
//!
//! let err = BusinessError::from(StatusCode::Forbidden);
//! let resp: ApiResponse<()> = ApiResponse::from(&err);
//!
//! assert_eq!(resp.code, 403);
//! assert_eq!(resp.to_json().unwrap(), r#"{"code":403,"message":"forbidden"}"#);
//! ```

pub mod errors;
pub mod response;

pub use errors::{BoxedCause, BusinessError, BusinessResult};
pub use response::{ApiResponse, ResultCode, StatusCode};
