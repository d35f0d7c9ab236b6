//! Result codes and the API response envelope.

use serde::{Deserialize, Serialize};

use crate::errors::BusinessError;

/// An application-defined (code, message) pair describing a categorized outcome.
pub trait ResultCode {
    /// Numeric code of the outcome.
    fn code(&self) -> i32;

    /// Human-readable description of the outcome.
    fn message(&self) -> &str;
}

/// Stock result codes, aligned with the HTTP status they usually map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Success,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Failed,
}

impl ResultCode for StatusCode {
    fn code(&self) -> i32 {
        match self {
            StatusCode::Success => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::Failed => 500,
        }
    }

    fn message(&self) -> &str {
        match self {
            StatusCode::Success => "success",
            StatusCode::BadRequest => "bad request",
            StatusCode::Unauthorized => "unauthorized",
            StatusCode::Forbidden => "forbidden",
            StatusCode::NotFound => "resource not found",
            StatusCode::Failed => "operation failed",
        }
    }
}

/// Envelope returned to API clients.
///
/// `data` is omitted from the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            code: StatusCode::Success.code(),
            message: StatusCode::Success.message().to_string(),
            data: Some(data),
        }
    }

    /// Response without data, built from any result code (including a [`BusinessError`]).
    pub fn from_code<R>(result_code: &R) -> Self
    where
        R: ResultCode + ?Sized,
    {
        Self {
            code: result_code.code(),
            message: result_code.message().to_string(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success.code()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Serializes the envelope to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<T> From<&BusinessError> for ApiResponse<T> {
    fn from(err: &BusinessError) -> Self {
        Self::from_code(err)
    }
}

impl<T> From<BusinessError> for ApiResponse<T> {
    fn from(err: BusinessError) -> Self {
        Self::from_code(&err)
    }
}
