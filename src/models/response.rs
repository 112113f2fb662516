//! Success response envelope shared by all endpoints.
//!
//! Failures are shaped by `AppError`'s `IntoResponse` impl; this is the
//! matching success side: `{"success": true, "message": ..., "data": ...}`.

use serde::Serialize;

/// JSON envelope for successful responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success with a message and a data payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Success with a data payload and no message.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success with only a message (e.g., deletions).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_only_omits_data_key() {
        let json = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "done");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn ok_carries_payload() {
        let json = serde_json::to_value(ApiResponse::ok("created", 7)).unwrap();
        assert_eq!(json["data"], 7);
    }
}
