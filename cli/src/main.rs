//! pursls - PureScript language server binary.
//!
//! # Architecture
//!
//! The binary bridges the LSP stdio transport ([`lsp_server`]) and the
//! session core in [`pursls_lsp`].
//!
//! ```text
//! stdin -> io thread -> reader thread -> mpsc -> Server::handle -> Session
//!                                                      |
//!                                                      v
//!                                    LspClient -> io thread -> stdout
//! ```
//!
//! Every inbound message is handled to completion before the next is read,
//! so session state is only ever touched by one handler at a time.

mod client;
mod documents;
mod handlers;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result};
use lsp_server::{Connection, Message};
use lsp_types::{
    CodeActionProviderCapability, ExecuteCommandOptions, InitializeParams, SaveOptions,
    ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions,
};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pursls_config::Settings;
use pursls_lsp::{ALL_COMMANDS, PursIde, Session, protocol::file_uri_to_path};

use crate::client::LspClient;
use crate::handlers::{Flow, Server};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // stdout carries the protocol; stderr is the only other safe sink.
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    // ~/.cache/pursls/pursls.log on Linux
    dirs::cache_dir()
        .map(|dir| dir.join("pursls").join("pursls.log"))
        .into_iter()
        .collect()
}

fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                will_save: None,
                will_save_wait_until: None,
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
            },
        )),
        code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: ALL_COMMANDS.iter().map(ToString::to_string).collect(),
            ..ExecuteCommandOptions::default()
        }),
        ..ServerCapabilities::default()
    }
}

/// Project root from the first workspace folder, the root URI, or the
/// working directory.
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    let from_folders = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .and_then(|folder| file_uri_to_path(&folder.uri));
    #[allow(deprecated)]
    let from_root_uri = params.root_uri.as_ref().and_then(file_uri_to_path);

    from_folders
        .or(from_root_uri)
        .or_else(|| std::env::current_dir().ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pursls starting");

    let (connection, io_threads) = Connection::stdio();
    let server_capabilities = serde_json::to_value(capabilities())?;

    let (connection, initialize_params) = tokio::task::spawn_blocking(move || {
        let params = connection.initialize(server_capabilities)?;
        Ok::<_, anyhow::Error>((connection, params))
    })
    .await
    .context("initialize task panicked")??;
    let initialize_params: InitializeParams = serde_json::from_value(initialize_params)?;

    let root = workspace_root(&initialize_params);
    tracing::info!(root = ?root, "Workspace root");
    let settings = Settings::resolve(
        initialize_params.initialization_options.as_ref(),
        root.as_deref(),
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let receiver = connection.receiver.clone();
    let reader = std::thread::spawn(move || {
        for message in receiver {
            if tx.send(message).is_err() {
                break;
            }
        }
    });

    let client = LspClient::new(connection.sender.clone());
    let mut server = Server::new(Session::new(PursIde, settings, root), client);
    server.initialized().await;

    while let Some(message) = rx.recv().await {
        if server.handle(message).await == Flow::Exit {
            break;
        }
    }

    tracing::info!("pursls shutting down");
    drop(server);
    drop(rx);
    drop(connection);
    io_threads.join()?;
    if reader.join().is_err() {
        tracing::warn!("Message reader thread panicked");
    }

    Ok(())
}
