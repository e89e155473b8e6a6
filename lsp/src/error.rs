//! Error types for the build pipeline and the IDE daemon client.

use std::path::PathBuf;

/// The compiler's JSON result could not be extracted from its output.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("compiler output contains no JSON result line")]
    NoStructuredOutput,
    #[error("compiler JSON result is malformed: {0}")]
    MalformedOutput(#[source] serde_json::Error),
}

/// A full build could not produce a result.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build requires a running IDE server and a project root")]
    MissingPrerequisite,
    #[error("build command is empty")]
    EmptyCommand,
    #[error("{program} not found in PATH")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("spawning {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("build process exited abnormally ({})", exit_label(*.code))]
    AbnormalExit { code: Option<i32> },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

fn exit_label(code: Option<i32>) -> String {
    code.map_or_else(|| String::from("terminated by signal"), |c| format!("code {c}"))
}

/// A request to `purs ide server`, or its startup, failed.
#[derive(Debug, thiserror::Error)]
pub enum IdeError {
    #[error("IDE server did not answer after {attempts} attempts")]
    ProcessStartFailure { attempts: u32 },
    #[error("{program} not found in PATH")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("spawning {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IDE server exited during startup ({status})")]
    Exited { status: String },
    #[error("IDE server on port {port} serves {}, not this project", actual.display())]
    RootMismatch { port: u16, actual: PathBuf },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
    #[error("IDE server returned an error: {0}")]
    Command(String),
    #[error("unexpected IDE server response: {0}")]
    Protocol(#[source] serde_json::Error),
}
