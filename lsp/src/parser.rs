//! Extraction of the compiler's JSON result from mixed process output.
//!
//! The compiler prints free-form progress text and, on its own line, exactly
//! one JSON object `{"errors": [...], "warnings": [...]}`. Only that line is
//! decoded; everything else is noise.

use pursls_types::PscResult;

use crate::error::{BuildError, ParseError};

/// Decode the first line that starts with `{"`.
pub fn parse(raw: &str) -> Result<PscResult, ParseError> {
    let mut candidate = None;
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("{\"") {
            candidate = Some(trimmed);
            break;
        }
        if !trimmed.is_empty() {
            tracing::debug!(line = trimmed, "compiler output");
        }
    }

    let line = candidate.ok_or(ParseError::NoStructuredOutput)?;
    serde_json::from_str(line).map_err(ParseError::MalformedOutput)
}

/// Interpret a finished full build.
///
/// Exit code 0 (clean) and 1 (compiled with errors) both carry a result.
/// Anything else, including death by signal, is an abnormal exit and the
/// output is not looked at.
pub fn parse_build_output(exit_code: Option<i32>, raw: &str) -> Result<PscResult, BuildError> {
    match exit_code {
        Some(0 | 1) => Ok(parse(raw)?),
        code => Err(BuildError::AbnormalExit { code }),
    }
}
