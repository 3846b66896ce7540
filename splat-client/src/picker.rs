use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use splat_client_core::contract::MediaPicker;

/// Picks a file given on the command line. Anything that is not a regular
/// file counts as the user backing out of the picker.
pub struct PathPicker {
    path: PathBuf,
}

impl PathPicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PathPicker { path: path.into() }
    }
}

#[async_trait]
impl MediaPicker for PathPicker {
    async fn pick(&self) -> Option<PathBuf> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Some(self.path.clone()),
            Ok(_) => {
                warn!(path = ?self.path, "Not a regular file, nothing selected");
                None
            }
            Err(e) => {
                warn!(error = ?e, path = ?self.path, "Cannot access file, nothing selected");
                None
            }
        }
    }
}
