// splat-client-core/src/config.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_UPLOAD_FIELD: &str = "video";

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const UPLOAD_PATH: &str = "/user/upload";
pub const WORK_PATH: &str = "/user/work/get/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: Url,
    #[serde(default)]
    pub upload: UploadSettings,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        ClientConfig {
            base_url,
            upload: UploadSettings::default(),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.base_url.clone())
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            field_name = %self.upload.field_name,
            "Loaded ClientConfig"
        );
        debug!(?self, "ClientConfig loaded (full debug)");
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL");
        ClientConfig::new(base_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_field_name")]
    pub field_name: String,
    /// Sent as the `title` form field when set.
    #[serde(default)]
    pub title: Option<String>,
}

fn default_field_name() -> String {
    DEFAULT_UPLOAD_FIELD.to_string()
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            field_name: default_field_name(),
            title: None,
        }
    }
}

/// Absolute URLs of the backend calls, resolved against one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: Url) -> Self {
        Endpoints { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn login(&self) -> Result<Url, url::ParseError> {
        self.base.join(LOGIN_PATH)
    }

    pub fn register(&self) -> Result<Url, url::ParseError> {
        self.base.join(REGISTER_PATH)
    }

    pub fn upload(&self) -> Result<Url, url::ParseError> {
        self.base.join(UPLOAD_PATH)
    }
}
