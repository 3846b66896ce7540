//! # contract: interfaces to everything outside the upload core
//!
//! This module defines the traits the core talks through, and the plain data
//! types that cross them:
//!
//! - [`UploadTransport`]: one multipart upload of one file, with progress.
//! - [`CredentialStore`]: the persisted token and user profile.
//! - [`MediaPicker`]: lets the user choose a local media file.
//! - [`AuthApi`]: the login and register JSON calls.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the mocks are exported behind the
//!   `test-export-mocks` feature so dependent crates can use them in their tests.
//!
//! ## Implementations
//! - The CLI crate provides the `reqwest` based transport/auth client and a
//!   file backed credential store. [`crate::credentials::MemoryCredentialStore`]
//!   is the in-process store.
//!
//! Transports return the raw HTTP status and body; deciding what counts as
//! success is the caller's job (see [`crate::session`] and [`crate::auth`]).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientError;

/// Opaque bearer token. Sent verbatim in the `Authorization` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

/// User profile blob returned by login. Its schema belongs to the backend.
pub type UserProfile = serde_json::Value;

/// Raw outcome of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        TransportResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `error` string of a JSON body, if there is one.
    pub fn error_message(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        value.get("error")?.as_str().map(str::to_owned)
    }
}

/// Everything a transport needs to perform one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub endpoint: Url,
    /// Multipart field that carries the file bytes.
    pub field_name: String,
    /// Extra text fields sent alongside the file.
    pub fields: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl UploadRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Receives fractional progress (0.0..=1.0) from a transport.
#[derive(Clone)]
pub struct ProgressSink {
    report: Arc<dyn Fn(f64) + Send + Sync>,
}

impl ProgressSink {
    pub fn new(report: impl Fn(f64) + Send + Sync + 'static) -> Self {
        ProgressSink {
            report: Arc::new(report),
        }
    }

    pub fn noop() -> Self {
        ProgressSink::new(|_| {})
    }

    pub fn report(&self, fraction: f64) {
        (self.report)(fraction)
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressSink")
    }
}

/// Performs a single multipart upload.
///
/// Implementations report zero or more progress values through the sink and
/// then return exactly once. Any HTTP response, whatever its status, is
/// `Ok`; `Err` is reserved for the request never completing (unreachable host,
/// unreadable file, cancellation). Implementations must not retry.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, ClientError>;
}

/// Process-wide persisted authentication state.
///
/// There is no expiry handling: a token the server has invalidated is only
/// discovered when a request using it is rejected.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;

    fn set(&self, credential: Credential) -> Result<(), ClientError>;

    fn profile(&self) -> Option<UserProfile>;

    fn set_profile(&self, profile: UserProfile) -> Result<(), ClientError>;

    /// Forget both the token and the profile.
    fn clear(&self) -> Result<(), ClientError>;
}

/// Lets the user select one local media file. `None` means the user cancelled.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MediaPicker: Send + Sync {
    async fn pick(&self) -> Option<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// The two JSON account calls. Like [`UploadTransport`], only a failed
/// exchange is an `Err`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, req: LoginRequest) -> Result<TransportResponse, ClientError>;

    async fn register(&self, req: RegisterRequest) -> Result<TransportResponse, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_does_not_leak_token() {
        let c = Credential::new("eyJhbGciOi.secret");
        assert!(!format!("{c:?}").contains("secret"));
    }

    #[test]
    fn error_message_reads_json_error_field() {
        let resp = TransportResponse::new(409, r#"{"error":"username taken"}"#);
        assert_eq!(resp.error_message().as_deref(), Some("username taken"));
        assert_eq!(TransportResponse::new(500, "oops").error_message(), None);
    }
}
