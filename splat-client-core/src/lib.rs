#![doc = "splat-client-core: upload session logic and backend contracts for splat-client."]

//! This crate holds everything that does not need a network stack:
//! the upload session state machine and its async driver, the login/register
//! flow, work URL construction, configuration types and the traits the CLI
//! crate implements with real HTTP and filesystem code.
//!
//! # Usage
//! Build an [`manager::UploadSessionManager`] with an [`contract::UploadTransport`]
//! and a [`contract::CredentialStore`], select a file, then `start_upload`.

pub mod auth;
pub mod config;
pub mod contract;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod session;
pub mod work;

pub use error::{ClientError, SessionError, ValidationError};
