/// Response envelope
///
/// Every response body, success or error, has the same shape:
///
/// ```json
/// { "status": "success", "message": "Posts retrieved", "data": { ... } }
/// ```
///
/// Endpoints that return sensitive collections replace `data` with the
/// encrypted payload string produced by [`PayloadCipher`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scopegate_shared::crypto::PayloadCipher;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// Uniform body of every response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            message: message.into(),
            data,
        }
    }
}

impl Envelope<()> {
    /// Success with `data: null`
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            message: message.into(),
            data: None,
        }
    }
}

/// Envelope plus HTTP status
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub body: Envelope<T>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// 200 with data
pub fn ok<T>(message: impl Into<String>, data: T) -> ApiResponse<T> {
    ApiResponse {
        status: StatusCode::OK,
        body: Envelope::success(message, data),
    }
}

/// 201 with data
pub fn created<T>(message: impl Into<String>, data: T) -> ApiResponse<T> {
    ApiResponse {
        status: StatusCode::CREATED,
        body: Envelope::success(message, data),
    }
}

/// 200 with `data: null`
pub fn done(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse {
        status: StatusCode::OK,
        body: Envelope::empty(message),
    }
}

/// 200 whose data is `data` serialized and encrypted
pub fn encrypted<T: Serialize + ?Sized>(
    cipher: &PayloadCipher,
    message: impl Into<String>,
    data: &T,
) -> ApiResult<ApiResponse<String>> {
    let payload = cipher.encrypt_json(data)?;
    Ok(ok(message, payload))
}

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}
