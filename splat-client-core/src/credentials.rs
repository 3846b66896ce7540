use std::sync::{Mutex, PoisonError};

use crate::contract::{Credential, CredentialStore, UserProfile};
use crate::error::ClientError;

/// Keeps the token and profile for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Stored>,
}

#[derive(Debug, Default)]
struct Stored {
    token: Option<Credential>,
    profile: Option<UserProfile>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.lock().token = Some(Credential::new(token));
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Stored> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.lock().token.clone()
    }

    fn set(&self, credential: Credential) -> Result<(), ClientError> {
        self.lock().token = Some(credential);
        Ok(())
    }

    fn profile(&self) -> Option<UserProfile> {
        self.lock().profile.clone()
    }

    fn set_profile(&self, profile: UserProfile) -> Result<(), ClientError> {
        self.lock().profile = Some(profile);
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.lock() = Stored::default();
        Ok(())
    }
}
