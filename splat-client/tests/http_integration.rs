use std::io::Write;
use std::sync::{Arc, Mutex};

use serde_json::json;
use splat_client::http::HttpClient;
use splat_client_core::auth::{self, LoginForm, RegisterForm};
use splat_client_core::config::ClientConfig;
use splat_client_core::contract::{AuthApi, CredentialStore, ProgressSink, UploadRequest, UploadTransport};
use splat_client_core::credentials::MemoryCredentialStore;
use splat_client_core::manager::UploadSessionManager;
use splat_client_core::session::SessionStatus;
use splat_client_core::ClientError;
use tempfile::NamedTempFile;
use url::Url;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(Url::parse(&server.uri()).unwrap())
}

fn video_file(content: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    file.write_all(content).unwrap();
    file
}

#[tokio::test]
async fn upload_streams_file_as_multipart_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/upload"))
        .and(header("Authorization", "tok-1"))
        .and(body_string_contains("name=\"video\""))
        .and(body_string_contains("fake video bytes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"video_id": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let transport = HttpClient::new(&config).unwrap();
    let store = Arc::new(MemoryCredentialStore::with_token("tok-1"));
    let manager = UploadSessionManager::from_config(transport, store, &config).unwrap();

    let file = video_file(b"fake video bytes");
    manager.select_file(file.path()).unwrap();
    let outcome = manager.start_upload().await.unwrap();

    assert_eq!(outcome, Ok(json!({"video_id": 3})));
    let session = manager.snapshot();
    assert_eq!(session.status(), SessionStatus::Succeeded);
    assert_eq!(session.progress(), 1.0);
}

#[tokio::test]
async fn upload_without_token_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/upload"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Authorization header is required"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let transport = HttpClient::new(&config).unwrap();
    let manager =
        UploadSessionManager::from_config(transport, Arc::new(MemoryCredentialStore::new()), &config)
            .unwrap();

    let file = video_file(b"x");
    manager.select_file(file.path()).unwrap();
    let err = manager.start_upload().await.unwrap().unwrap_err();

    assert_eq!(err.user_message(), "Authorization header is required");
    assert_eq!(manager.snapshot().status(), SessionStatus::Failed);
    assert_eq!(manager.snapshot().progress(), 0.0);
}

#[tokio::test]
async fn transport_reports_progress_up_to_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/upload"))
        .and(body_string_contains("name=\"title\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = HttpClient::new(&config).unwrap();
    let file = video_file(&vec![7u8; 64 * 1024]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        ProgressSink::new(move |f| seen.lock().unwrap().push(f))
    };
    let request = UploadRequest {
        file_path: file.path().to_path_buf(),
        endpoint: config.endpoints().upload().unwrap(),
        field_name: "video".to_string(),
        fields: vec![("title".to_string(), "clip".to_string())],
        headers: vec![],
    };

    let response = client.upload(request, sink).await.unwrap();

    assert_eq!(response.status, 200);
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.last().unwrap(), 1.0);
}

#[tokio::test]
async fn unreadable_file_is_a_network_failure() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    let client = HttpClient::new(&config).unwrap();
    let request = UploadRequest {
        file_path: "/definitely/not/here.mp4".into(),
        endpoint: config.endpoints().upload().unwrap(),
        field_name: "video".to_string(),
        fields: vec![],
        headers: vec![],
    };

    let err = client.upload(request, ProgressSink::noop()).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}

#[tokio::test]
async fn login_posts_identifier_and_stores_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(json!({"identifier": "alice", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-9",
            "user": {"id": 1, "username": "alice"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&config_for(&server)).unwrap();
    let store = MemoryCredentialStore::new();
    let form = LoginForm {
        identifier: "alice".into(),
        password: "pw".into(),
    };

    auth::login(&client, &store, &form).await.unwrap();

    assert_eq!(store.get().unwrap().as_str(), "tok-9");
    assert_eq!(store.profile(), Some(json!({"id": 1, "username": "alice"})));
}

#[tokio::test]
async fn rejected_login_surfaces_server_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid credentials"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&config_for(&server)).unwrap();
    let store = MemoryCredentialStore::new();
    let form = LoginForm {
        identifier: "alice".into(),
        password: "wrong".into(),
    };

    let err = auth::login(&client, &store, &form).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Server {
            status: 401,
            message: Some("invalid credentials".into())
        }
    );
    assert!(store.get().is_none());
}

#[tokio::test]
async fn register_expects_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .and(body_partial_json(json!({"username": "bob", "email": "b@x.io", "password": "pw"})))
        .and(|req: &Request| !String::from_utf8_lossy(&req.body).contains("confirm"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "user created"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&config_for(&server)).unwrap();
    let form = RegisterForm {
        username: "bob".into(),
        email: "b@x.io".into(),
        password: "pw".into(),
        confirm_password: "pw".into(),
    };

    let outcome = auth::register(&client, &form).await.unwrap();
    assert_eq!(outcome.message.as_deref(), Some("user created"));
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    // Nothing listens on the port once the server is dropped.
    let config = {
        let server = MockServer::start().await;
        config_for(&server)
    };
    let client = HttpClient::new(&config).unwrap();

    let err = client
        .login(splat_client_core::contract::LoginRequest {
            identifier: "a".into(),
            password: "b".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert_eq!(err.user_message(), "network error, please try again later");
}
