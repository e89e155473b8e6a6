//! Compiler output types for pursls.
//!
//! This crate describes what `purs` and `purs ide server` report: positions,
//! rebuild errors with their suggestions, and build results. Pure data types,
//! no IO and no async, usable from any layer of the server.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod codes;
mod position;
mod rebuild;

pub use codes::{
    HOLE_INFERRED_TYPE, MODULE_NOT_FOUND, is_import_code, is_unknown_token_code,
    suggestion_title,
};
pub use position::CompilerPosition;
pub use rebuild::{BuildResult, HoleCompletion, IdeInfo, PscResult, RebuildError, Suggestion};
