//! Upload session manager: drives one [`UploadSession`] through a transport.
//!
//! The manager owns the session behind a mutex. Every transition happens
//! synchronously under that lock, so two events can never interleave, and the
//! lock is never held across an await. The only suspension point is the
//! transport call itself.
//!
//! # Guarantees
//! - At most one attempt is `Uploading` at a time. A second [`start_upload`]
//!   while one is in flight is rejected before any transport call.
//! - Progress shown to listeners never goes backwards within an attempt.
//! - Events from a cancelled or superseded attempt are dropped (checked by
//!   [`AttemptId`], not by status alone).
//! - The transport is invoked once per `start_upload`; there are no retries.
//!
//! # Listeners
//! Listeners registered with [`add_listener`] are called, in registration
//! order and under the session lock, after each accepted transition. They must
//! not call back into the manager.
//!
//! [`start_upload`]: UploadSessionManager::start_upload
//! [`add_listener`]: UploadSessionManager::add_listener

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{ClientConfig, UploadSettings};
use crate::contract::{
    CredentialStore, MediaPicker, ProgressSink, TransportResponse, UploadRequest, UploadTransport,
};
use crate::error::{ClientError, SessionError};
use crate::session::{AttemptId, SessionStatus, UploadOutcome, UploadSession};

pub type SessionListener = Arc<dyn Fn(&UploadSession) + Send + Sync>;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Default)]
struct State {
    session: UploadSession,
    cancel: Option<CancellationToken>,
    listeners: Vec<SessionListener>,
}

impl State {
    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.session);
        }
    }

    fn settled(&mut self, changed: bool) -> bool {
        if changed {
            if self.session.status() != SessionStatus::Uploading {
                self.cancel = None;
            }
            self.notify();
        }
        changed
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking listener must not wedge the session.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct UploadSessionManager<T> {
    transport: T,
    credentials: Arc<dyn CredentialStore>,
    endpoint: Url,
    settings: UploadSettings,
    shared: Arc<Shared>,
}

impl<T: UploadTransport> UploadSessionManager<T> {
    pub fn new(
        transport: T,
        credentials: Arc<dyn CredentialStore>,
        endpoint: Url,
        settings: UploadSettings,
    ) -> Self {
        UploadSessionManager {
            transport,
            credentials,
            endpoint,
            settings,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Manager uploading to the config's `/user/upload` endpoint.
    pub fn from_config(
        transport: T,
        credentials: Arc<dyn CredentialStore>,
        config: &ClientConfig,
    ) -> Result<Self, url::ParseError> {
        let endpoint = config.endpoints().upload()?;
        Ok(Self::new(
            transport,
            credentials,
            endpoint,
            config.upload.clone(),
        ))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn add_listener(&self, listener: impl Fn(&UploadSession) + Send + Sync + 'static) {
        self.shared.lock().listeners.push(Arc::new(listener));
    }

    pub fn snapshot(&self) -> UploadSession {
        self.shared.lock().session.clone()
    }

    pub fn select_file(&self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let mut state = self.shared.lock();
        state.session.select_file(path.into())?;
        state.notify();
        Ok(())
    }

    /// Ask the picker for a file. Returns `Ok(false)` when the user cancelled
    /// the picker; the session is left as it was.
    pub async fn select_from<P>(&self, picker: &P) -> Result<bool, SessionError>
    where
        P: MediaPicker + ?Sized,
    {
        match picker.pick().await {
            Some(path) => {
                self.select_file(path)?;
                Ok(true)
            }
            None => {
                debug!("Media picker cancelled");
                Ok(false)
            }
        }
    }

    /// Upload the selected file and wait for the terminal outcome.
    ///
    /// The outer `Err` means the call was rejected by a guard and nothing was
    /// sent. The inner result is what the session ended with.
    pub async fn start_upload(&self) -> Result<UploadOutcome, SessionError> {
        let (attempt, path, cancel) = {
            let mut state = self.shared.lock();
            let (attempt, path) = state.session.begin().map_err(|e| {
                warn!(error = %e, "Upload not started");
                e
            })?;
            let cancel = CancellationToken::new();
            state.cancel = Some(cancel.clone());
            state.notify();
            (attempt, path, cancel)
        };

        info!(%attempt, file = ?path, endpoint = %self.endpoint, "Starting upload");
        let request = self.build_request(path);
        let sink = {
            let shared = Arc::clone(&self.shared);
            ProgressSink::new(move |fraction| {
                let mut state = shared.lock();
                let changed = state.session.record_progress(attempt, fraction);
                state.settled(changed);
            })
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.transport.upload(request, sink) => result,
        };

        // Decide the outcome under the same guard that applies it; once the
        // lock is released a new selection may overwrite the session result.
        let outcome = {
            let mut state = self.shared.lock();
            let applied = match result {
                Ok(response) => state.session.complete(attempt, &response),
                Err(reason) => state.session.fail(attempt, reason),
            };
            match applied {
                Some(outcome) => {
                    state.settled(true);
                    outcome
                }
                None => {
                    debug!(%attempt, "Attempt was settled before the transport returned");
                    match (state.session.attempt(), state.session.result()) {
                        (Some(current), Some(outcome)) if current == attempt => outcome.clone(),
                        _ => Err(ClientError::Cancelled),
                    }
                }
            }
        };
        match &outcome {
            Ok(_) => info!(%attempt, "Upload succeeded"),
            Err(e) => error!(%attempt, error = %e, "Upload failed"),
        }
        Ok(outcome)
    }

    /// Feed a progress value for `attempt`. Returns whether it was applied.
    pub fn on_progress(&self, attempt: AttemptId, fraction: f64) -> bool {
        let mut state = self.shared.lock();
        let changed = state.session.record_progress(attempt, fraction);
        state.settled(changed)
    }

    pub fn on_complete(&self, attempt: AttemptId, response: &TransportResponse) -> bool {
        let mut state = self.shared.lock();
        let changed = state.session.complete(attempt, response).is_some();
        state.settled(changed)
    }

    pub fn on_failure(&self, attempt: AttemptId, reason: ClientError) -> bool {
        let mut state = self.shared.lock();
        let changed = state.session.fail(attempt, reason).is_some();
        state.settled(changed)
    }

    /// Cancel the in-flight upload. Returns `false` if nothing was uploading.
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.lock();
        let Some(attempt) = state.session.cancel() else {
            return false;
        };
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        info!(%attempt, "Upload cancelled");
        state.notify();
        true
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        let mut state = self.shared.lock();
        state.session.clear()?;
        state.notify();
        Ok(())
    }

    fn build_request(&self, file_path: PathBuf) -> UploadRequest {
        let mut headers = Vec::new();
        match self.credentials.get() {
            Some(token) if !token.is_empty() => {
                headers.push((AUTHORIZATION_HEADER.to_string(), token.as_str().to_string()));
            }
            _ => warn!("No stored credential, uploading without an Authorization header"),
        }
        let fields = self
            .settings
            .title
            .iter()
            .map(|title| ("title".to_string(), title.clone()))
            .collect();
        UploadRequest {
            file_path,
            endpoint: self.endpoint.clone(),
            field_name: self.settings.field_name.clone(),
            fields,
            headers,
        }
    }
}
