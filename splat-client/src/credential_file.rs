//! File backed credential store.
//!
//! Token and profile are kept in one small JSON document under the fixed keys
//! `token` and `userInfo`, so a login survives process restarts. Writes go to a
//! temporary file in the same directory which is then renamed over the target.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use splat_client_core::contract::{Credential, CredentialStore, UserProfile};
use splat_client_core::ClientError;

pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<Credential>,
    #[serde(rename = "userInfo", default, skip_serializing_if = "Option::is_none")]
    user_info: Option<UserProfile>,
}

pub struct FileCredentialStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<config dir>/splat-client/credentials.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("splat-client").join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoredCredentials {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoredCredentials::default(),
            Err(e) => {
                warn!(error = ?e, path = ?self.path, "Cannot read credentials file");
                return StoredCredentials::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(error = ?e, path = ?self.path, "Ignoring unreadable credentials file");
            StoredCredentials::default()
        })
    }

    fn save(&self, stored: &StoredCredentials) -> Result<(), ClientError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| storage_error(&self.path, e))?;

        let json = serde_json::to_vec_pretty(stored).map_err(|e| storage_error(&self.path, e))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| storage_error(&self.path, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| storage_error(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| storage_error(&self.path, e.error))?;
        debug!(path = ?self.path, "Credentials file written");
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut StoredCredentials)) -> Result<(), ClientError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stored = self.load();
        f(&mut stored);
        self.save(&stored)
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> ClientError {
    error!(error = %e, ?path, "Failed to write credentials file");
    ClientError::Storage(format!("{}: {e}", path.display()))
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.load().token.filter(|t| !t.is_empty())
    }

    fn set(&self, credential: Credential) -> Result<(), ClientError> {
        self.update(|s| s.token = Some(credential))
    }

    fn profile(&self) -> Option<UserProfile> {
        self.load().user_info
    }

    fn set_profile(&self, profile: UserProfile) -> Result<(), ClientError> {
        self.update(|s| s.user_info = Some(profile))
    }

    fn clear(&self) -> Result<(), ClientError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }
}
