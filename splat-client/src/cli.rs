/// # splat-client CLI Interface (Module)
///
/// Command parsing and orchestration for the `splat-client` binary. Session
/// logic, validation and response handling live in `splat-client-core`; this
/// module wires them to the HTTP client, the credential file and the terminal.
///
/// ## How To Use
/// - From a shell: `splat-client --help`.
/// - From tests: build a [`Cli`] and call [`run`].
use crate::credential_file::FileCredentialStore;
use crate::http::HttpClient;
use crate::load_config::{resolve_config, CliConfig};
use crate::picker::PathPicker;
use anyhow::Result;
use clap::{Parser, Subcommand};
use splat_client_core::auth::{self, LoginForm, RegisterForm};
use splat_client_core::contract::CredentialStore;
use splat_client_core::manager::UploadSessionManager;
use splat_client_core::session::SessionStatus;
use splat_client_core::work::resolve_work_id;
use splat_client_core::ClientError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// CLI for the splat backend: account, video upload and work links.
#[derive(Parser)]
#[clap(
    name = "splat-client",
    version,
    about = "Log in, register, upload videos and build work links for a splat server"
)]
pub struct Cli {
    /// Path to an optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a username or email and store the returned token
    Login {
        #[clap(long, default_value = "")]
        identifier: String,
        #[clap(long, default_value = "")]
        password: String,
    },
    /// Create an account
    Register {
        #[clap(long, default_value = "")]
        username: String,
        #[clap(long, default_value = "")]
        email: String,
        #[clap(long, default_value = "")]
        password: String,
        #[clap(long, default_value = "")]
        confirm_password: String,
    },
    /// Upload a video with the stored token
    Upload {
        /// File to upload
        #[clap(long)]
        file: PathBuf,
        /// Overrides `upload.title` from the config
        #[clap(long)]
        title: Option<String>,
    },
    /// Forget the stored token and profile
    Logout,
    /// Print the page URL of a work
    WorkUrl {
        #[clap(long, conflicts_with = "query")]
        work_id: Option<String>,
        /// Query string to read `work_id` from, e.g. "?work_id=42"
        #[clap(long)]
        query: Option<String>,
    },
}

/// Async CLI entrypoint shared by main() and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = resolve_config(cli.config)?;

    match cli.command {
        Commands::Login {
            identifier,
            password,
        } => {
            tracing::info!(command = "login", "Starting login");
            let api = HttpClient::new(&config.client)?;
            let store = FileCredentialStore::new(&config.credentials_path);
            let form = LoginForm {
                identifier,
                password,
            };
            let outcome = auth::login(&api, &store, &form).await.map_err(report)?;
            println!("login succeeded");
            if let Some(user) = outcome.user {
                println!("{user}");
            }
            Ok(())
        }
        Commands::Register {
            username,
            email,
            password,
            confirm_password,
        } => {
            tracing::info!(command = "register", "Starting registration");
            let api = HttpClient::new(&config.client)?;
            let form = RegisterForm {
                username,
                email,
                password,
                confirm_password,
            };
            let outcome = auth::register(&api, &form).await.map_err(report)?;
            println!(
                "{}",
                outcome.message.as_deref().unwrap_or("registration succeeded")
            );
            Ok(())
        }
        Commands::Upload { file, title } => upload(config, file, title).await,
        Commands::Logout => {
            tracing::info!(command = "logout", "Clearing credentials");
            let store = FileCredentialStore::new(&config.credentials_path);
            auth::logout(&store).map_err(report)?;
            println!("logged out");
            Ok(())
        }
        Commands::WorkUrl { work_id, query } => {
            let work_id =
                work_id.unwrap_or_else(|| resolve_work_id(query.as_deref().unwrap_or_default()));
            let url = config.client.endpoints().work(&work_id).map_err(report)?;
            tracing::info!(command = "work-url", %url, "Resolved work URL");
            println!("{url}");
            Ok(())
        }
    }
}

async fn upload(mut config: CliConfig, file: PathBuf, title: Option<String>) -> Result<()> {
    tracing::info!(command = "upload", file = ?file, "Starting upload");
    if title.is_some() {
        config.client.upload.title = title;
    }

    let transport = HttpClient::new(&config.client)?;
    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(&config.credentials_path));
    if store.get().is_none() {
        tracing::warn!("No stored token, uploading anonymously; run `splat-client login` first");
    }
    let manager = UploadSessionManager::from_config(transport, store, &config.client)?;

    let last_percent = AtomicI64::new(-1);
    manager.add_listener(move |session| {
        if session.status() != SessionStatus::Uploading {
            return;
        }
        let percent = (session.progress() * 100.0).floor() as i64;
        if percent > last_percent.swap(percent, Ordering::Relaxed) {
            println!("progress: {percent}%");
        }
    });

    if !manager.select_from(&PathPicker::new(&file)).await? {
        anyhow::bail!("no file selected: {} is not a readable file", file.display());
    }

    let upload = manager.start_upload();
    tokio::pin!(upload);
    let outcome = tokio::select! {
        outcome = &mut upload => outcome?,
        Ok(()) = tokio::signal::ctrl_c() => {
            manager.cancel();
            upload.await?
        }
    };

    match outcome {
        Ok(payload) => {
            println!("upload succeeded");
            println!("{payload}");
            Ok(())
        }
        Err(e) => Err(report(e)),
    }
}

/// Logs the full failure and returns the user-facing text as the exit error,
/// which main() prints once.
fn report(e: ClientError) -> anyhow::Error {
    tracing::error!(error = %e, "Command failed");
    anyhow::anyhow!(e.user_message())
}
