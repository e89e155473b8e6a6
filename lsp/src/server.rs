//! IDE daemon backend: owns the `purs ide server` child process and speaks
//! its socket protocol.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use pursls_config::Settings;
use pursls_types::PscResult;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use crate::codec::{LineReader, LineWriter};
use crate::error::IdeError;
use crate::protocol::{IdeRequest, IdeResponse, ImportOutcome, ImportRequest};
use crate::types::Candidate;

const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

/// Release capability for a started daemon.
///
/// `quit` consumes the handle, so a daemon is released at most once. A
/// handle for a daemon this server did not spawn releases nothing.
#[derive(Debug)]
pub struct ServerHandle {
    port: u16,
    child: Option<Child>,
    /// Polls left before a scripted daemon reports that it exited.
    #[cfg(test)]
    scripted_exit: Option<(usize, String)>,
}

impl ServerHandle {
    fn new(port: u16, child: Option<Child>) -> Self {
        Self {
            port,
            child,
            #[cfg(test)]
            scripted_exit: None,
        }
    }

    #[must_use]
    pub fn spawned(port: u16, child: Child) -> Self {
        Self::new(port, Some(child))
    }

    /// A daemon somebody else started and owns.
    #[must_use]
    pub fn external(port: u16) -> Self {
        Self::new(port, None)
    }

    /// A daemon that is alive for `polls` exit checks and then exits with `status`.
    #[cfg(test)]
    pub(crate) fn exiting_after(port: u16, polls: usize, status: &str) -> Self {
        Self {
            scripted_exit: Some((polls, status.to_string())),
            ..Self::new(port, None)
        }
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Exit status if the owned process has already terminated.
    pub fn exit_status(&mut self) -> Option<String> {
        #[cfg(test)]
        if let Some((polls, status)) = self.scripted_exit.as_mut() {
            if *polls == 0 {
                return Some(status.clone());
            }
            *polls -= 1;
        }
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(e) => Some(e.to_string()),
        }
    }

    pub async fn quit(mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.start_kill() {
            tracing::debug!("IDE server already gone: {e}");
        }
        let waited = tokio::time::timeout(
            Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
            child.wait(),
        )
        .await;
        if waited.is_err() {
            tracing::warn!(port = self.port, "IDE server did not exit in time");
        }
    }
}

/// Everything the pipeline needs from the IDE daemon.
///
/// [`PursIde`] is the real implementation; tests substitute a scripted one.
pub trait IdeBackend: Send + Sync {
    /// Launch a daemon listening on `port`. Returns as soon as the process exists.
    fn spawn(&self, settings: &Settings, root: &Path, port: u16) -> Result<ServerHandle, IdeError>;

    /// Choose a port for a new daemon.
    fn pick_port(&self) -> Result<u16, IdeError> {
        free_port()
    }

    /// Working directory the daemon serves. Also the readiness check.
    fn cwd(&self, port: u16) -> impl Future<Output = Result<String, IdeError>> + Send;

    /// Load every module from the output directory.
    fn load(&self, port: u16) -> impl Future<Output = Result<String, IdeError>> + Send;

    fn rebuild(
        &self,
        port: u16,
        file: &Path,
        codegen: Option<&[String]>,
    ) -> impl Future<Output = Result<PscResult, IdeError>> + Send;

    fn loaded_modules(&self, port: u16)
    -> impl Future<Output = Result<Vec<String>, IdeError>> + Send;

    fn add_import(
        &self,
        port: u16,
        file: &Path,
        request: &ImportRequest,
    ) -> impl Future<Output = Result<ImportOutcome, IdeError>> + Send;

    fn complete(
        &self,
        port: u16,
        search: &str,
        current_module: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Candidate>, IdeError>> + Send;
}

/// `purs ide server` over localhost TCP, one connection per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct PursIde;

impl PursIde {
    async fn send(&self, port: u16, request: &IdeRequest<'_>) -> Result<IdeResponse, IdeError> {
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .with_context(|| format!("connecting to IDE server on port {port}"))?;
        let (read_half, write_half) = stream.into_split();

        let mut writer = LineWriter::new(write_half);
        writer.write_value(request).await?;

        let mut reader = LineReader::new(read_half);
        let value = reader
            .read_value()
            .await?
            .context("IDE server closed the connection without answering")?;
        IdeResponse::decode(value)
    }
}

impl IdeBackend for PursIde {
    fn spawn(&self, settings: &Settings, root: &Path, port: u16) -> Result<ServerHandle, IdeError> {
        let search_path = search_path(root, settings.add_npm_path);
        let program = &settings.purs_exe;
        let resolved = resolve_program(program, search_path.as_ref(), root).map_err(|source| {
            IdeError::NotFound {
                program: program.clone(),
                source,
            }
        })?;

        let mut cmd = Command::new(&resolved);
        cmd.args(server_args(settings, port))
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(path) = &search_path {
            cmd.env("PATH", path);
        }

        tracing::info!(port, exe = %resolved.display(), "Spawning IDE server");
        let child = cmd.spawn().map_err(|source| IdeError::Spawn {
            program: program.clone(),
            source,
        })?;
        Ok(ServerHandle::spawned(port, child))
    }

    async fn cwd(&self, port: u16) -> Result<String, IdeError> {
        self.send(port, &IdeRequest::Cwd).await?.into_success()
    }

    async fn load(&self, port: u16) -> Result<String, IdeError> {
        let response = self.send(port, &IdeRequest::load_all()).await?;
        // The success message is informational; an unexpected shape still means success.
        match response {
            IdeResponse::Success(value) => Ok(value
                .as_str()
                .map_or_else(|| value.to_string(), String::from)),
            error @ IdeResponse::Error(_) => error.into_success(),
        }
    }

    async fn rebuild(
        &self,
        port: u16,
        file: &Path,
        codegen: Option<&[String]>,
    ) -> Result<PscResult, IdeError> {
        let file = file.to_string_lossy();
        let request = IdeRequest::Rebuild {
            file: &file,
            codegen,
        };
        self.send(port, &request).await?.into_rebuild_result()
    }

    async fn loaded_modules(&self, port: u16) -> Result<Vec<String>, IdeError> {
        self.send(port, &IdeRequest::loaded_modules())
            .await?
            .into_success()
    }

    async fn add_import(
        &self,
        port: u16,
        file: &Path,
        request: &ImportRequest,
    ) -> Result<ImportOutcome, IdeError> {
        let file = file.to_string_lossy();
        self.send(port, &IdeRequest::import(&file, request))
            .await?
            .into_success()
    }

    async fn complete(
        &self,
        port: u16,
        search: &str,
        current_module: Option<&str>,
    ) -> Result<Vec<Candidate>, IdeError> {
        self.send(port, &IdeRequest::complete(search, current_module))
            .await?
            .into_success()
    }
}

/// An unused localhost port, found by binding port 0.
pub fn free_port() -> Result<u16, IdeError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .context("binding a free localhost port")?;
    let port = listener
        .local_addr()
        .context("reading the bound port")?
        .port();
    Ok(port)
}

/// Command line for `purs ide server`, excluding the executable.
pub(crate) fn server_args(settings: &Settings, port: u16) -> Vec<String> {
    let mut args = vec![
        String::from("ide"),
        String::from("server"),
        String::from("--port"),
        port.to_string(),
    ];
    if let Some(dir) = &settings.output_directory {
        args.push(String::from("--output-directory"));
        args.push(dir.clone());
    }
    if let Some(level) = &settings.psc_ide_log_level {
        args.push(String::from("--log-level"));
        args.push(level.clone());
    }
    if settings.polling {
        args.push(String::from("--polling"));
    }
    if settings.editor_mode {
        args.push(String::from("--editor-mode"));
    }
    if settings.no_watch {
        args.push(String::from("--no-watch"));
    }
    args.extend(settings.source_globs.iter().cloned());
    args
}

/// `PATH` with `<root>/node_modules/.bin` prepended, when enabled.
pub(crate) fn search_path(root: &Path, add_npm_path: bool) -> Option<OsString> {
    if !add_npm_path {
        return None;
    }
    let mut dirs = vec![root.join("node_modules").join(".bin")];
    if let Some(existing) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&existing));
    }
    match std::env::join_paths(dirs) {
        Ok(joined) => Some(joined),
        Err(e) => {
            tracing::warn!("Cannot add npm bin directory to PATH: {e}");
            None
        }
    }
}

/// Resolve an executable against `search_path` (or the inherited `PATH`).
pub(crate) fn resolve_program(
    program: &str,
    search_path: Option<&OsString>,
    root: &Path,
) -> Result<PathBuf, which::Error> {
    match search_path {
        Some(paths) => which::which_in(program, Some(paths), root),
        None => which::which(program),
    }
}
