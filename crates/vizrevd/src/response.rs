//! Response envelope shared by every route: `{ message, result?, error? }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(message: impl Into<String>, result: Option<T>) -> Self {
        Self {
            message: message.into(),
            result,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            result: None,
            error: Some(error.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A successful reply: status code plus envelope.
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &str, result: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope::success(message, Some(result)),
        }
    }

    pub fn created(message: &str, result: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Envelope::success(message, Some(result)),
        }
    }

    /// A 200 reply that carries only a message.
    pub fn notice(message: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope::success(message, None),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_absent_fields() {
        let json = serde_json::to_value(Envelope::<()>::success("done", None)).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "done" }));

        let json = serde_json::to_value(Envelope::<()>::failure("Release not found.", "missing"))
            .unwrap();
        assert_eq!(json["error"], "missing");
        assert!(json.get("result").is_none());
    }
}
