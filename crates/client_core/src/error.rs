use shared::error::ApiError;
use thiserror::Error;

/// Per-call failure of the remote client binding.
///
/// Every operation returns this as an error value; nothing in the binding
/// panics on a failed call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a service response.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured endpoint URL could not be composed into a request URL.
    #[error("invalid service endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The service answered with a non-success status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation needs an owner but no session is cached.
    #[error("no active session; sign in first")]
    NotSignedIn,
}

/// Extracts a human-readable message from a service error body.
///
/// The auth subsystem and the data API use different envelopes (`msg`,
/// `message`, `error_description`, `error`); unknown bodies fall back to a
/// status-code message.
pub(crate) fn service_error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    format!("service returned status {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_auth_msg_key() {
        let body = r#"{"code":400,"msg":"User already registered"}"#;
        assert_eq!(service_error_message(body, 400), "User already registered");
    }

    #[test]
    fn reads_error_description_envelope() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(service_error_message(body, 400), "Invalid login credentials");
    }

    #[test]
    fn reads_data_api_message() {
        let body = r#"{"message":"permission denied for table todos","code":"42501"}"#;
        assert_eq!(
            service_error_message(body, 403),
            "permission denied for table todos"
        );
    }

    #[test]
    fn falls_back_to_status_for_opaque_bodies() {
        assert_eq!(
            service_error_message("<html>bad gateway</html>", 502),
            "service returned status 502"
        );
        assert_eq!(service_error_message("", 500), "service returned status 500");
    }
}
