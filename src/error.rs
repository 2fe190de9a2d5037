//! Error types for API and identity calls
//!
//! `ApiError` renders as the message a user should see. It is `Clone`
//! because one failed fetch is handed to every caller waiting on it.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

const GENERIC_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server rejected the payload.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(AuthFailure),

    #[error("Not signed in, or the session has expired. Run `crmdesk login`.")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Record has no identifier")]
    MissingId,

    #[error("Invalid relation: {0}")]
    InvalidRelation(String),
}

impl ApiError {
    /// Map a non-success HTTP response to an error.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| extract_detail(&value));

        match status {
            401 => Self::Unauthorized,
            404 => Self::NotFound(detail.unwrap_or_else(|| "resource".to_string())),
            400 | 409 | 422 => {
                Self::Validation(detail.unwrap_or_else(|| format!("Request rejected ({})", status)))
            }
            _ => Self::Server {
                status,
                message: detail
                    .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
                    .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
            },
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Network(GENERIC_MESSAGE.to_string())
        } else {
            Self::Network(message)
        }
    }

    /// Text shown to the user next to the failed action.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// True for failures worth offering a retry for.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Pull a display string out of a `{"detail": ...}` error payload.
///
/// A string detail is used as is. A list of field errors becomes
/// `"field: message"` entries joined by `", "`. Anything else is JSON-encoded.
pub fn extract_detail(payload: &Value) -> Option<String> {
    match payload.get("detail")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(format_field_error)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

fn format_field_error(item: &Value) -> String {
    let field = item
        .get("loc")
        .and_then(Value::as_array)
        .and_then(|loc| loc.last())
        .map(|last| match last {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();
    let message = item
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or("invalid value");
    format!("{}: {}", field, message)
}

/// Identity provider failures, keyed by the provider's error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredential,
    UserNotFound,
    WrongPassword,
    Other(String),
}

impl AuthFailure {
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/invalid-credential" => Self::InvalidCredential,
            "auth/user-not-found" => Self::UserNotFound,
            "auth/wrong-password" => Self::WrongPassword,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidCredential | Self::UserNotFound => {
                "Invalid email or password. Are you sure you've registered?"
            }
            Self::WrongPassword => "The password you entered is incorrect.",
            Self::Other(_) => "Something went wrong. Please try again later.",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        Self::Auth(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_errors_joined() {
        let body = json!({
            "detail": [
                {"loc": ["body", "name"], "msg": "field required", "type": "missing"},
                {"loc": ["body", "email"], "msg": "value is not a valid email address"}
            ]
        })
        .to_string();

        let err = ApiError::from_response(422, &body);
        assert_eq!(
            err.to_string(),
            "name: field required, email: value is not a valid email address"
        );
    }

    #[test]
    fn test_string_detail() {
        let err = ApiError::from_response(400, r#"{"detail": "Company already exists"}"#);
        assert_eq!(err, ApiError::Validation("Company already exists".to_string()));
    }

    #[test]
    fn test_object_detail_is_encoded() {
        let detail = extract_detail(&json!({"detail": {"code": 7}})).unwrap();
        assert_eq!(detail, r#"{"code":7}"#);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from_response(401, ""), ApiError::Unauthorized);
        assert_eq!(
            ApiError::from_response(404, r#"{"detail": "Deal not found"}"#),
            ApiError::NotFound("Deal not found".to_string())
        );
        assert_eq!(
            ApiError::from_response(500, ""),
            ApiError::Server {
                status: 500,
                message: "Something went wrong".to_string()
            }
        );
        assert_eq!(
            ApiError::from_response(502, "Bad Gateway"),
            ApiError::Server {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
    }

    #[test]
    fn test_network_fallback_message() {
        assert_eq!(ApiError::network("").to_string(), "Something went wrong");
        assert_eq!(ApiError::network("connection refused").to_string(), "connection refused");
    }

    #[test]
    fn test_auth_messages() {
        assert_eq!(
            AuthFailure::from_code("auth/user-not-found").message(),
            "Invalid email or password. Are you sure you've registered?"
        );
        assert_eq!(
            AuthFailure::from_code("auth/wrong-password").to_string(),
            "The password you entered is incorrect."
        );
        assert_eq!(
            ApiError::from(AuthFailure::from_code("auth/too-many-requests")).to_string(),
            "Something went wrong. Please try again later."
        );
    }
}
