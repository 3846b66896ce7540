use serial_test::serial;
use splat_client::load_config::{load_config, resolve_config, BASE_URL_ENV, CREDENTIALS_PATH_ENV};
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var(BASE_URL_ENV);
    env::remove_var(CREDENTIALS_PATH_ENV);
}

fn config_file(yaml: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), yaml).unwrap();
    config_file
}

#[test]
#[serial]
fn test_load_config_reads_all_sections() {
    clear_env();
    let config_file = config_file(
        r#"
server:
  base_url: "http://videos.example.com:9000"
upload:
  field_name: clip
  title: holiday
credentials:
  path: /tmp/splat/creds.json
"#,
    );

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.client.base_url.as_str(), "http://videos.example.com:9000/");
    assert_eq!(config.client.upload.field_name, "clip");
    assert_eq!(config.client.upload.title.as_deref(), Some("holiday"));
    assert_eq!(config.credentials_path, PathBuf::from("/tmp/splat/creds.json"));
}

#[test]
#[serial]
fn test_load_config_missing_sections_use_defaults() {
    clear_env();
    let config_file = config_file("upload:\n  title: only-title\n");

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.client.base_url.as_str(), "http://127.0.0.1:8080/");
    assert_eq!(config.client.upload.field_name, "video");
    assert_eq!(config.client.upload.title.as_deref(), Some("only-title"));
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let config_file = config_file(
        "server:\n  base_url: http://from-file:1\ncredentials:\n  path: /from/file.json\n",
    );
    env::set_var(BASE_URL_ENV, "http://from-env:2");
    env::set_var(CREDENTIALS_PATH_ENV, "/from/env.json");

    let config = load_config(config_file.path()).expect("Config should load");
    clear_env();

    assert_eq!(config.client.base_url.as_str(), "http://from-env:2/");
    assert_eq!(config.credentials_path, PathBuf::from("/from/env.json"));
}

#[test]
#[serial]
fn test_resolve_without_file_uses_defaults() {
    clear_env();
    let config = resolve_config(None).expect("Defaults should load");
    assert_eq!(config.client.base_url.as_str(), "http://127.0.0.1:8080/");
    assert!(config.credentials_path.ends_with("credentials.json"));
}

#[test]
#[serial]
fn test_invalid_env_url_is_an_error() {
    clear_env();
    env::set_var(BASE_URL_ENV, "not a url");
    let err = resolve_config(None).unwrap_err();
    clear_env();
    assert!(err.to_string().contains(BASE_URL_ENV), "got: {err}");
}

#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let config_file = config_file("not-yaml: [:::");

    let err = load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    clear_env();
    let err = load_config("/no/such/splat.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_base_url_without_path_is_rejected() {
    clear_env();
    let config_file = config_file("server:\n  base_url: \"mailto:ops@example.com\"\n");

    let err = load_config(config_file.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid base URL"), "got: {err}");

    env::set_var(BASE_URL_ENV, "data:text/plain,hi");
    let err = resolve_config(None).unwrap_err();
    clear_env();
    assert!(err.to_string().contains("Invalid base URL"), "got: {err}");
}
