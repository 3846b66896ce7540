/// `load_config` module: reads the optional YAML config file and applies
/// environment overrides, producing the [`CliConfig`] the commands run with.
///
/// # Schema
/// ```yaml
/// server:
///   base_url: http://127.0.0.1:8080
/// upload:
///   field_name: video
///   title: my clip
/// credentials:
///   path: ~/.config/splat-client/credentials.json
/// ```
/// Every section is optional.
///
/// # Environment
/// - `SPLAT_BASE_URL` replaces `server.base_url`
/// - `SPLAT_CREDENTIALS_PATH` replaces `credentials.path`
///
/// Errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::Result;
use serde::Deserialize;
use splat_client_core::config::{ClientConfig, UploadSettings, DEFAULT_BASE_URL};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use url::Url;

use crate::credential_file::{FileCredentialStore, CREDENTIALS_FILE};

pub const BASE_URL_ENV: &str = "SPLAT_BASE_URL";
pub const CREDENTIALS_PATH_ENV: &str = "SPLAT_CREDENTIALS_PATH";

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub client: ClientConfig,
    pub credentials_path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    upload: UploadSettings,
    #[serde(default)]
    credentials: CredentialsSection,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    base_url: Option<Url>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsSection {
    path: Option<PathBuf>,
}

/// Loads a YAML config file and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty document is a valid "all defaults" config.
    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    finish(raw)
}

/// Config for a run: the given file if any, otherwise built-in defaults.
/// Environment overrides apply in both cases.
pub fn resolve_config(path: Option<PathBuf>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            info!("No config file given, using defaults");
            finish(RawConfig::default())
        }
    }
}

fn finish(raw: RawConfig) -> Result<CliConfig> {
    let base_url = match std::env::var(BASE_URL_ENV) {
        Ok(value) if !value.is_empty() => Url::parse(&value).map_err(|e| {
            error!(error = ?e, env = BASE_URL_ENV, "Invalid base URL in environment");
            anyhow::anyhow!("Invalid {BASE_URL_ENV} {value:?}: {e}")
        })?,
        _ => match raw.server.base_url {
            Some(url) => url,
            None => ClientConfig::default().base_url,
        },
    };

    if base_url.cannot_be_a_base() {
        error!(%base_url, "Base URL cannot carry a path");
        return Err(anyhow::anyhow!(
            "Invalid base URL {base_url}: expected something like {}",
            DEFAULT_BASE_URL
        ));
    }

    let credentials_path = match std::env::var_os(CREDENTIALS_PATH_ENV) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => raw
            .credentials
            .path
            .or_else(FileCredentialStore::default_path)
            .unwrap_or_else(|| {
                warn!("No config directory on this platform, keeping credentials in the working directory");
                PathBuf::from(CREDENTIALS_FILE)
            }),
    };

    let client = ClientConfig {
        base_url,
        upload: raw.upload,
    };
    client.trace_loaded();
    info!(credentials_path = ?credentials_path, "Credentials location resolved");

    Ok(CliConfig {
        client,
        credentials_path,
    })
}
