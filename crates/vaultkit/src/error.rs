//! Error types for Vault API operations.
//!
//! Errors are categorized so the command line can give the operator
//! something more useful than a raw status code.

use std::fmt;

/// Result type alias for Vault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Vault errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Could not reach the server, or the connection broke.
    Network,
    /// The requested object does not exist.
    NotFound,
    /// The token is missing, expired or lacks capabilities.
    Permission,
    /// The server answered with something we could not decode.
    Format,
    /// The client itself is misconfigured.
    Config,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Could not reach Vault",
            Self::NotFound => "Object not found",
            Self::Permission => "Permission denied",
            Self::Format => "Unexpected response from Vault",
            Self::Config => "Invalid client configuration",
            Self::Other => "Vault rejected the request",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check VAULT_ADDR and that the server is unsealed and reachable",
            Self::NotFound => "Verify the path exists on the target server",
            Self::Permission => "Check that VAULT_TOKEN is valid and its policies allow sys/ access",
            Self::Format => "Check that VAULT_ADDR points at a Vault server",
            Self::Config => "Set VAULT_ADDR and VAULT_TOKEN, or pass --vault-addr/--vault-token",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to Vault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vault answered with a non-success status.
    #[error("{method} {path} returned HTTP {status}: {}", .messages.join("; "))]
    Http {
        /// HTTP method of the request.
        method: &'static str,
        /// API path relative to `/v1/`.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Messages from the `errors` array of the response body.
        messages: Vec<String>,
    },

    /// The request never produced a response.
    #[error("request to {path} failed: {message}")]
    Transport {
        /// API path relative to `/v1/`.
        path: String,
        /// Underlying transport error.
        message: String,
    },

    /// The object does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("invalid response from {path}: {message}")]
    InvalidResponse {
        /// API path relative to `/v1/`.
        path: String,
        /// Decoding error.
        message: String,
    },

    /// The client could not be configured.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create an HTTP status error.
    pub fn http(method: &'static str, path: impl Into<String>, status: u16, messages: Vec<String>) -> Self {
        Self::Http {
            method,
            path: path.into(),
            status,
            messages,
        }
    }

    /// Create a transport error.
    pub fn transport(path: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::Transport {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a decoding error.
    pub fn invalid_response(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get the error category for user feedback.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { status, .. } => match status {
                401 | 403 => ErrorCategory::Permission,
                404 => ErrorCategory::NotFound,
                502..=504 => ErrorCategory::Network,
                _ => ErrorCategory::Other,
            },
            Error::Transport { .. } => ErrorCategory::Network,
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::InvalidResponse { .. } => ErrorCategory::Format,
            Error::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Extract the `errors` array from a Vault error body.
///
/// Falls back to the raw body when it is not the usual JSON shape.
pub(crate) fn error_messages(body: &str) -> Vec<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        errors: Vec<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed.errors,
        Ok(_) => Vec::new(),
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_description() {
        assert!(!ErrorCategory::Network.description().is_empty());
        assert!(!ErrorCategory::Permission.description().is_empty());
        assert!(!ErrorCategory::Config.description().is_empty());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(ErrorCategory::Permission.advice().contains("VAULT_TOKEN"));
        assert!(ErrorCategory::Network.advice().contains("VAULT_ADDR"));
    }

    #[test]
    fn test_http_error_category() {
        let err = Error::http("GET", "sys/auth", 403, vec!["permission denied".into()]);
        assert_eq!(err.category(), ErrorCategory::Permission);

        let err = Error::http("GET", "sys/auth", 503, vec![]);
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = Error::http("POST", "sys/auth/ldap", 400, vec![]);
        assert_eq!(err.category(), ErrorCategory::Other);
    }

    #[test]
    fn test_http_error_display_joins_messages() {
        let err = Error::http(
            "PUT",
            "sys/policy/ops",
            400,
            vec!["failed to parse policy".into(), "line 1".into()],
        );
        let display = err.to_string();
        assert!(display.contains("PUT sys/policy/ops"));
        assert!(display.contains("HTTP 400"));
        assert!(display.contains("failed to parse policy; line 1"));
    }

    #[test]
    fn test_not_found() {
        let err = Error::NotFound("sys/policy/ops".into());
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(!Error::Config("no token".into()).is_not_found());
    }

    #[test]
    fn test_error_messages_from_json() {
        let body = r#"{"errors":["path is already in use at ldap/"]}"#;
        assert_eq!(error_messages(body), vec!["path is already in use at ldap/"]);
    }

    #[test]
    fn test_error_messages_empty_errors() {
        assert!(error_messages(r#"{"errors":[]}"#).is_empty());
        assert!(error_messages("").is_empty());
    }

    #[test]
    fn test_error_messages_plain_text() {
        assert_eq!(error_messages("bad gateway\n"), vec!["bad gateway"]);
    }
}
