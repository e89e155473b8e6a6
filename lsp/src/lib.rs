//! Diagnostics, builds and quick fixes for PureScript projects.
//!
//! [`Session`] owns the `purs ide` daemon, the per-file diagnostic cache and
//! the loaded-modules listing. Editor plumbing is abstracted behind
//! [`Client`] and [`Documents`] so the host decides how messages travel.

pub mod actions;
pub mod build;
pub mod codec;
pub mod commands;
pub mod diagnostics;
pub mod edits;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod retry;
pub mod server;
pub mod session;
pub mod supervisor;
pub mod text;
pub mod types;

#[cfg(test)]
mod testing;

pub use commands::{ALL_COMMANDS, ServerCommand};
pub use diagnostics::{DiagnosticCache, FileDiagnostic, FullBuildDelta};
pub use error::{BuildError, IdeError, ParseError};
pub use protocol::{ImportOutcome, ImportRequest};
pub use server::{IdeBackend, PursIde, ServerHandle};
pub use session::{ModulesCache, Session};
pub use supervisor::Supervisor;
pub use types::{Candidate, Client, CommandOutcome, DocumentSnapshot, Documents, Notice};
