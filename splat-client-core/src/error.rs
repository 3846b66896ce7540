//! Error taxonomy shared by the upload session, the auth flow and the transports.
//!
//! [`ClientError`] is what a terminal `Failed` session carries and what every
//! backend call can fail with. [`SessionError`] covers the local guards of the
//! session state machine; it never reaches the network.

use thiserror::Error;

/// A form or session precondition that failed before any request was built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("passwords do not match")]
    PasswordMismatch,
}

impl ValidationError {
    /// Text suitable for a toast/notification.
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::MissingField(field) => format!("please enter {field}"),
            ValidationError::PasswordMismatch => "the two passwords do not match".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("network error: {0}")]
    Network(String),

    #[error("server returned status {status}: {}", message.as_deref().unwrap_or("<no message>"))]
    Server {
        status: u16,
        /// The `error` field of the JSON body, when the server sent one.
        message: Option<String>,
    },

    #[error("malformed response: {reason}")]
    MalformedResponse {
        reason: String,
        server_message: Option<String>,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("credential storage failed: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        ClientError::Network(err.to_string())
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        ClientError::MalformedResponse {
            reason: reason.into(),
            server_message: None,
        }
    }

    /// Human readable message for the UI layer. Server supplied text wins over
    /// the generic category message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(v) => v.user_message(),
            ClientError::Network(_) => "network error, please try again later".to_string(),
            ClientError::Server {
                message: Some(m), ..
            } if !m.is_empty() => m.clone(),
            ClientError::Server { status, .. } => {
                format!("request failed with status {status}")
            }
            ClientError::MalformedResponse {
                server_message: Some(m),
                ..
            } if !m.is_empty() => m.clone(),
            ClientError::MalformedResponse { .. } => {
                "the server returned an unexpected response".to_string()
            }
            ClientError::Cancelled => "upload cancelled".to_string(),
            ClientError::Storage(_) => "could not save credentials locally".to_string(),
        }
    }
}

/// Rejections from the session state machine guards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("an upload is already in progress")]
    UploadInProgress,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
