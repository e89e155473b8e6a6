//! Full project build through the configured build tool.

use std::path::Path;
use std::process::Stdio;

use pursls_config::Settings;
use pursls_types::PscResult;
use tokio::process::Command;

use crate::error::BuildError;
use crate::parser::parse_build_output;
use crate::server::{resolve_program, search_path};

/// Run the build command in `root` and parse its JSON result from stderr.
///
/// No timeout: the build finishes when the process exits.
pub async fn run_build(settings: &Settings, root: &Path) -> Result<PscResult, BuildError> {
    let (program, args) = settings
        .build_command_parts()
        .ok_or(BuildError::EmptyCommand)?;

    let search_path = search_path(root, settings.add_npm_path);
    let resolved = resolve_program(program, search_path.as_ref(), root).map_err(|source| {
        BuildError::NotFound {
            program: program.to_string(),
            source,
        }
    })?;

    let mut cmd = Command::new(&resolved);
    cmd.args(&args)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(path) = &search_path {
        cmd.env("PATH", path);
    }

    tracing::info!(command = %settings.build_command, root = %root.display(), "Running build");
    let output = cmd.output().await.map_err(|source| BuildError::Spawn {
        program: program.to_string(),
        source,
    })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        tracing::debug!(line, "build stdout");
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output.status.code();
    tracing::info!(?code, "Build finished");
    parse_build_output(code, &stderr)
}
