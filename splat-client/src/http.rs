#![doc = "HTTP client for the splat backend: implements the core upload and auth contracts with reqwest."]
//
//! # HTTP client (CLI <-> backend)
//!
//! [`HttpClient`] is the networked implementation of
//! [`splat_client_core::contract::UploadTransport`] and
//! [`splat_client_core::contract::AuthApi`].
//!
//! - Uploads are `multipart/form-data`; the file is streamed from disk and
//!   progress is reported as the body is consumed.
//! - Any HTTP response is returned as-is (status + body text). Deciding what a
//!   status means is left to the core crate.
//! - Only failures to complete the exchange (connect, I/O, TLS) become
//!   [`ClientError::Network`]. Nothing is retried.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;
use url::Url;

use splat_client_core::config::ClientConfig;
use splat_client_core::contract::{
    AuthApi, LoginRequest, ProgressSink, RegisterRequest, TransportResponse, UploadRequest,
    UploadTransport,
};
use splat_client_core::ClientError;

pub struct HttpClient {
    client: Client,
    login_url: Url,
    register_url: Url,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let endpoints = config.endpoints();
        let client = Client::builder().build().map_err(|e| {
            tracing::error!(error = ?e, "Failed to build HTTP client");
            e
        })?;
        let http = HttpClient {
            client,
            login_url: endpoints.login()?,
            register_url: endpoints.register()?,
        };
        tracing::info!(base_url = %config.base_url, "Initialised HttpClient");
        Ok(http)
    }

    async fn post_json<B: serde::Serialize + Sync>(
        &self,
        url: &Url,
        body: &B,
    ) -> Result<TransportResponse, ClientError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, %url, "Request did not complete");
                ClientError::network(e)
            })?;
        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<TransportResponse, ClientError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| {
        tracing::error!(error = ?e, status, "Failed to read response body");
        ClientError::network(e)
    })?;
    tracing::debug!(status, body_len = body.len(), "Received response");
    Ok(TransportResponse { status, body })
}

#[async_trait]
impl UploadTransport for HttpClient {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, ClientError> {
        let file = tokio::fs::File::open(&request.file_path).await.map_err(|e| {
            tracing::error!(error = ?e, file = ?request.file_path, "Cannot open file for upload");
            ClientError::Network(format!("cannot read {}: {e}", request.file_path.display()))
        })?;
        let total = file
            .metadata()
            .await
            .map_err(|e| ClientError::Network(format!("cannot stat file: {e}")))?
            .len();
        let file_name = request
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.field_name.clone());

        tracing::info!(
            file = %file_name,
            bytes = total,
            endpoint = %request.endpoint,
            "Uploading file"
        );

        let mut sent: u64 = 0;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                if total > 0 {
                    progress.report(sent as f64 / total as f64);
                }
            }
            chunk
        });
        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(ClientError::network)?;

        let mut form = Form::new();
        for (name, value) in request.fields {
            form = form.text(name, value);
        }
        let form = form.part(request.field_name, part);

        let mut builder = self.client.post(request.endpoint.clone()).multipart(form);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = ?e, endpoint = %request.endpoint, "Upload did not complete");
            ClientError::network(e)
        })?;
        read_response(response).await
    }
}

#[async_trait]
impl AuthApi for HttpClient {
    async fn login(&self, req: LoginRequest) -> Result<TransportResponse, ClientError> {
        tracing::info!(identifier = %req.identifier, url = %self.login_url, "POST login");
        self.post_json(&self.login_url, &req).await
    }

    async fn register(&self, req: RegisterRequest) -> Result<TransportResponse, ClientError> {
        tracing::info!(username = %req.username, url = %self.register_url, "POST register");
        self.post_json(&self.register_url, &req).await
    }
}
