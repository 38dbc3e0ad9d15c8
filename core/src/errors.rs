use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur with finding the config or data directories.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Unable to find the config directory for songswap.")]
    Config,
    #[error("Unable to find the data directory for songswap.")]
    Data,
}

/// Errors returned by the remote service (or raised locally before a request is made).
///
/// The variants carry the message the service responded with, so it can be shown to the user verbatim.
#[derive(Error, Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum ServiceError {
    /// Nothing matched the request, e.g. no eligible song left to discover.
    #[error("{0}")]
    NotFound(String),
    /// The request was rejected because of bad input.
    #[error("{0}")]
    Validation(String),
    /// The credential is missing, expired, or invalid.
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// The user is not allowed to do this (e.g. not the creator of a chain).
    #[error("{0}")]
    Forbidden(String),
    /// Network or server failure.
    #[error("Request failed: {0}")]
    Transient(String),
}

impl ServiceError {
    /// The message as sent by the service, without any prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Auth(msg)
            | Self::Forbidden(msg)
            | Self::Transient(msg) => msg,
        }
    }

    /// The message to show the user, falling back to `fallback` when the service gave no text.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.message().trim();
        if message.is_empty() {
            fallback.to_owned()
        } else {
            message.to_owned()
        }
    }

    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Errors that can occur while reading or writing the persisted credential.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Malformed credential file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_str_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::NotFound("No new songs to discover".into()), "No new songs to discover")]
    #[case(ServiceError::Validation("URL is required".into()), "URL is required")]
    #[case(ServiceError::Auth("Unauthorized".into()), "Authentication failed: Unauthorized")]
    #[case(ServiceError::Forbidden("Only the chain creator can remove songs".into()), "Only the chain creator can remove songs")]
    #[case(ServiceError::Transient("connection refused".into()), "Request failed: connection refused")]
    fn test_service_error_display(#[case] input: ServiceError, #[case] expected: &str) {
        assert_str_eq!(input.to_string(), expected);
    }

    #[rstest]
    #[case(ServiceError::Validation("URL is too long\n".into()), "URL is too long")]
    #[case(ServiceError::Transient(String::new()), "Failed to submit")]
    #[case(ServiceError::Validation("   ".into()), "Failed to submit")]
    fn test_user_message(#[case] input: ServiceError, #[case] expected: &str) {
        assert_str_eq!(input.user_message("Failed to submit"), expected);
    }

    #[test]
    fn test_credential_error_from_io() {
        let err = CredentialError::from(std::io::Error::other("test"));
        assert_str_eq!(err.to_string(), "IO error: test");
    }
}
