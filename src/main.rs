//! Cloud Hooks command line client
//!
//! Drives the provider, hooks and upload tracker against a live platform.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cloud_hooks::config::{ClientConfig, ConnectionArgs};
use cloud_hooks::hooks::{Auth, Webhook};
use cloud_hooks::sdk::http::HttpSdkFactory;
use cloud_hooks::sdk::{CallOptions, Credentials, FileHandle, UploadOptions, WebhookRequest};
use cloud_hooks::{AppProvider, ProviderPhase, Store, UploadStatus, Uploader, UploaderConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload files and wait for the batch to finish
    Upload {
        /// Files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Target folder
        #[arg(long)]
        folder: Option<String>,
        /// Make the files publicly readable
        #[arg(long)]
        public: bool,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CLOUD_HOOKS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the user the configured token resolves to
    Whoami,
    /// Call a webhook
    Webhook {
        id: String,
        /// JSON body
        #[arg(long)]
        body: Option<String>,
        /// HTTP method
        #[arg(long)]
        method: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();

    // Initialize tracing (M-LOG-STRUCTURED)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }

    let config = ClientConfig::load_with(&cli.connection).context("loading configuration")?;
    info!(
        name: "client.config.loaded",
        app = %config.connection.app,
        api_url = %config.connection.api_url,
        "Client configuration loaded"
    );

    let factory = Arc::new(HttpSdkFactory::new(config.upload.clone()));
    let mut provider = AppProvider::new(config.provider_props(), factory);
    provider.mount().await;
    let store = match provider.phase() {
        ProviderPhase::Failed(reason) => bail!("SDK initialization failed: {reason}"),
        _ => provider
            .store()
            .ok_or_else(|| anyhow!("SDK is not ready"))?
            .clone(),
    };

    match cli.command {
        Command::Upload {
            paths,
            folder,
            public,
        } => upload(&store, paths, UploadOptions { folder, public, metadata: None }).await,
        Command::Login { email, password } => {
            let session = Auth::new(&store)
                .login(&Credentials { email, password }, CallOptions::default())
                .await?;
            println!("{}", serde_json::to_string_pretty(&session.user)?);
            Ok(())
        }
        Command::Whoami => {
            match Auth::new(&store).authorize(CallOptions::default()).await? {
                Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
                None => println!("not signed in"),
            }
            Ok(())
        }
        Command::Webhook { id, body, method } => {
            let body = body
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("--body must be valid JSON")?;
            let request = WebhookRequest {
                method,
                body,
                ..WebhookRequest::default()
            };
            let response = Webhook::new(&store)
                .call(&id, request, CallOptions::default())
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

async fn upload(store: &Store, paths: Vec<PathBuf>, options: UploadOptions) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(
            FileHandle::from_path(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
        );
    }

    let (done_tx, done_rx) = oneshot::channel();
    let done_tx = Arc::new(std::sync::Mutex::new(Some(done_tx)));
    let on_success_tx = Arc::clone(&done_tx);
    let on_failed_tx = Arc::clone(&done_tx);

    let uploader = Uploader::new(
        store,
        UploaderConfig::default()
            .options(options)
            .on_update(|files| {
                for record in files {
                    if let UploadStatus::Progress { progress, .. } = record.status {
                        info!(name: "upload.progress", file = %record.file_name, progress, "Uploading");
                    }
                }
            })
            .on_success(move |files| {
                if let Some(tx) = on_success_tx.lock().ok().and_then(|mut tx| tx.take()) {
                    let _ = tx.send(Ok(files.to_vec()));
                }
            })
            .on_failed(move |files| {
                if let Some(tx) = on_failed_tx.lock().ok().and_then(|mut tx| tx.take()) {
                    let _ = tx.send(Err(files.to_vec()));
                }
            }),
    );

    uploader.submit(files)?;

    match done_rx.await.context("upload tracker dropped")? {
        Ok(records) => {
            for record in records {
                println!("{}\t{}", record.file_name, record.file_url().unwrap_or_default());
            }
            Ok(())
        }
        Err(records) => {
            for record in &records {
                match record.error() {
                    Some(error) => warn!(file = %record.file_name, error = %error, "Upload failed"),
                    None => println!("{}\t{}", record.file_name, record.file_url().unwrap_or_default()),
                }
            }
            bail!("one or more uploads failed")
        }
    }
}
