//! Login and registration.
//!
//! Forms are validated locally first; a validation failure never reaches the
//! [`AuthApi`]. Responses are classified here rather than in the HTTP client,
//! so the rules below hold for any transport:
//!
//! - login succeeds only on `200` with a non-empty `token`; `200` without one is
//!   a [`ClientError::MalformedResponse`] (the server accepted the request but
//!   the answer is unusable), anything else is a [`ClientError::Server`];
//! - register succeeds only on `201`.
//!
//! A successful login persists the token, and the `user` profile when present.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::contract::{
    AuthApi, Credential, CredentialStore, LoginRequest, RegisterRequest, TransportResponse,
    UserProfile,
};
use crate::error::{ClientError, ValidationError};

pub const LOGIN_OK: u16 = 200;
pub const REGISTER_OK: u16 = 201;

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, ValidationError> {
        if self.identifier.is_empty() {
            return Err(ValidationError::MissingField("identifier"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password"));
        }
        Ok(LoginRequest {
            identifier: self.identifier.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// The confirmation is checked here and never sent.
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        let required = [
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
            ("confirm_password", &self.confirm_password),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(ValidationError::MissingField(*field));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(RegisterRequest {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub token: Credential,
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct RegisterBody {
    #[serde(default)]
    message: Option<String>,
}

pub fn classify_login(response: &TransportResponse) -> Result<LoginOutcome, ClientError> {
    if response.status != LOGIN_OK {
        return Err(ClientError::Server {
            status: response.status,
            message: response.error_message(),
        });
    }
    let body: LoginBody =
        serde_json::from_str(&response.body).map_err(|e| ClientError::malformed(e.to_string()))?;
    match body.token {
        Some(token) if !token.is_empty() => Ok(LoginOutcome {
            token: Credential::new(token),
            user: body.user.filter(|u| !u.is_null()),
        }),
        _ => Err(ClientError::MalformedResponse {
            reason: "login response carries no token".to_string(),
            server_message: body.error,
        }),
    }
}

pub fn classify_register(response: &TransportResponse) -> Result<RegisterOutcome, ClientError> {
    if response.status != REGISTER_OK {
        return Err(ClientError::Server {
            status: response.status,
            message: response.error_message(),
        });
    }
    // The message is informational only; an odd body does not undo the registration.
    let message = serde_json::from_str::<RegisterBody>(&response.body)
        .ok()
        .and_then(|b| b.message);
    Ok(RegisterOutcome { message })
}

pub async fn login<A, S>(api: &A, store: &S, form: &LoginForm) -> Result<LoginOutcome, ClientError>
where
    A: AuthApi + ?Sized,
    S: CredentialStore + ?Sized,
{
    let request = form.validate()?;
    info!(identifier = %request.identifier, "Logging in");

    let response = api.login(request).await.map_err(|e| {
        error!(error = %e, "Login request failed");
        e
    })?;
    let outcome = classify_login(&response).map_err(|e| {
        error!(status = response.status, error = %e, "Login rejected");
        e
    })?;

    store.set(outcome.token.clone())?;
    match &outcome.user {
        Some(user) => store.set_profile(user.clone())?,
        None => warn!("Login response has no user profile"),
    }
    info!("Login succeeded, token stored");
    Ok(outcome)
}

pub async fn register<A>(api: &A, form: &RegisterForm) -> Result<RegisterOutcome, ClientError>
where
    A: AuthApi + ?Sized,
{
    let request = form.validate()?;
    info!(username = %request.username, email = %request.email, "Registering account");

    let response = api.register(request).await.map_err(|e| {
        error!(error = %e, "Register request failed");
        e
    })?;
    let outcome = classify_register(&response).map_err(|e| {
        error!(status = response.status, error = %e, "Registration rejected");
        e
    })?;
    info!(message = ?outcome.message, "Registration succeeded");
    Ok(outcome)
}

pub fn logout<S: CredentialStore + ?Sized>(store: &S) -> Result<(), ClientError> {
    store.clear()?;
    info!("Credentials cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_form_names_first_missing_field() {
        let form = LoginForm::default();
        assert_eq!(
            form.validate().unwrap_err(),
            ValidationError::MissingField("identifier")
        );
        let form = LoginForm {
            identifier: "alice".into(),
            ..Default::default()
        };
        assert_eq!(
            form.validate().unwrap_err(),
            ValidationError::MissingField("password")
        );
    }

    #[test]
    fn register_form_checks_confirmation() {
        let form = RegisterForm {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "hunter2".into(),
            confirm_password: "hunter3".into(),
        };
        assert_eq!(form.validate().unwrap_err(), ValidationError::PasswordMismatch);

        let form = RegisterForm {
            email: String::new(),
            ..form
        };
        assert_eq!(
            form.validate().unwrap_err(),
            ValidationError::MissingField("email")
        );
    }

    #[test]
    fn login_200_without_token_is_malformed_not_rejected() {
        let resp = TransportResponse::new(200, r#"{"error":"token generation failed"}"#);
        let err = classify_login(&resp).unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse { .. }));
        assert_eq!(err.user_message(), "token generation failed");
    }

    #[test]
    fn login_401_is_server_error() {
        let resp = TransportResponse::new(401, r#"{"error":"wrong password"}"#);
        assert_eq!(
            classify_login(&resp).unwrap_err(),
            ClientError::Server {
                status: 401,
                message: Some("wrong password".into())
            }
        );
    }

    #[test]
    fn register_requires_201() {
        let ok = TransportResponse::new(201, r#"{"message":"created"}"#);
        assert_eq!(
            classify_register(&ok).unwrap().message.as_deref(),
            Some("created")
        );
        let conflict = TransportResponse::new(409, r#"{"error":"email taken"}"#);
        assert_eq!(classify_register(&conflict).unwrap_err().user_message(), "email taken");
        // 200 is not the documented success status.
        assert!(classify_register(&TransportResponse::new(200, "{}")).is_err());
    }
}
