//! Lifecycle of the `purs ide server` daemon.
//!
//! The supervisor holds the [`ServerHandle`] of the running daemon. Holding a
//! handle is what "running" means; `stop` consumes it.

use std::path::Path;

use pursls_config::Settings;

use crate::error::IdeError;
use crate::protocol::normalize_path;
use crate::retry::{RetryConfig, calculate_retry_delay};
use crate::server::{IdeBackend, ServerHandle};
use crate::types::{Client, Notice};

#[derive(Debug, Default)]
pub struct Supervisor {
    handle: Option<ServerHandle>,
    retry: RetryConfig,
}

impl Supervisor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_retry(retry: RetryConfig) -> Self {
        Self {
            handle: None,
            retry,
        }
    }

    /// Port of the running daemon.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.handle.as_ref().map(ServerHandle::port)
    }

    /// Start a daemon for `root`, stopping any running one first.
    ///
    /// Every outcome is reported through `client`; failure leaves no port.
    pub async fn start<B: IdeBackend>(
        &mut self,
        backend: &B,
        settings: &Settings,
        root: &Path,
        client: &dyn Client,
    ) -> Option<u16> {
        if self.handle.is_some() {
            self.stop(client).await;
        }

        match self.launch(backend, settings, root, client).await {
            Ok(handle) => {
                let port = handle.port();
                self.handle = Some(handle);
                match backend.load(port).await {
                    Ok(message) => client.log(Notice::Info, &message),
                    Err(e) => client.log(Notice::Warning, &format!("Loading modules failed: {e}")),
                }
                Some(port)
            }
            Err(e) => {
                tracing::warn!("IDE server start failed: {e}");
                client.log(Notice::Error, &format!("Failed to start IDE server: {e}"));
                None
            }
        }
    }

    async fn launch<B: IdeBackend>(
        &self,
        backend: &B,
        settings: &Settings,
        root: &Path,
        client: &dyn Client,
    ) -> Result<ServerHandle, IdeError> {
        let port = match settings.psc_ide_port {
            Some(port) => {
                if let Ok(cwd) = backend.cwd(port).await {
                    return reuse_existing(port, &cwd, root, client);
                }
                port
            }
            None => backend.pick_port()?,
        };

        client.log(Notice::Info, &format!("Starting IDE server on port {port}"));
        let mut handle = backend.spawn(settings, root, port)?;

        let attempts = self.retry.max_attempts;
        for attempt in 0..attempts {
            tokio::time::sleep(calculate_retry_delay(attempt, &self.retry)).await;

            if let Some(status) = handle.exit_status() {
                handle.quit().await;
                return Err(IdeError::Exited { status });
            }

            match backend.cwd(port).await {
                Ok(_) => {
                    tracing::info!(port, attempt, "IDE server ready");
                    client.log(
                        Notice::Success,
                        &format!("Started IDE server on port {port}"),
                    );
                    return Ok(handle);
                }
                Err(e) if attempt + 1 < attempts => {
                    tracing::debug!(port, attempt, "IDE server not ready: {e}");
                    client.log(
                        Notice::Warning,
                        &format!(
                            "IDE server not ready, retrying ({}/{attempts})",
                            attempt + 1
                        ),
                    );
                }
                Err(e) => tracing::debug!(port, attempt, "IDE server not ready: {e}"),
            }
        }

        handle.quit().await;
        Err(IdeError::ProcessStartFailure { attempts })
    }

    /// Release the running daemon, if any.
    pub async fn stop(&mut self, client: &dyn Client) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let port = handle.port();
        handle.quit().await;
        client.log(Notice::Info, &format!("Stopped IDE server on port {port}"));
    }

    pub async fn restart<B: IdeBackend>(
        &mut self,
        backend: &B,
        settings: &Settings,
        root: &Path,
        client: &dyn Client,
    ) -> Option<u16> {
        self.stop(client).await;
        self.start(backend, settings, root, client).await
    }
}

fn reuse_existing(
    port: u16,
    cwd: &str,
    root: &Path,
    client: &dyn Client,
) -> Result<ServerHandle, IdeError> {
    let served = normalize_path(Path::new(cwd));
    if served != normalize_path(root) {
        return Err(IdeError::RootMismatch {
            port,
            actual: served,
        });
    }
    client.log(
        Notice::Success,
        &format!("Using existing IDE server on port {port}"),
    );
    Ok(ServerHandle::external(port))
}
