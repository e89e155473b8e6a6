//! Errors, warnings and build results as the compiler reports them.
//!
//! Field names follow the compiler's `--json-errors` output, so these types
//! deserialize directly from both `purs compile` and `purs ide server rebuild`.

use serde::{Deserialize, Serialize};

use crate::CompilerPosition;

/// A suggested fix attached to an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    replacement: String,
    #[serde(default)]
    replace_range: Option<CompilerPosition>,
}

impl Suggestion {
    #[must_use]
    pub fn new(replacement: impl Into<String>, replace_range: Option<CompilerPosition>) -> Self {
        Self {
            replacement: replacement.into(),
            replace_range,
        }
    }

    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Span to replace. When absent, the error's own position is the target.
    #[must_use]
    pub fn replace_range(&self) -> Option<CompilerPosition> {
        self.replace_range
    }
}

/// One candidate the compiler offers for a typed hole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleCompletion {
    pub identifier: String,
    #[serde(rename = "type")]
    pub type_info: String,
    #[serde(default)]
    pub module: Option<String>,
}

/// IDE-specific payload the compiler attaches to some errors (`pursIde`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeInfo {
    pub name: String,
    #[serde(default)]
    pub completions: Vec<HoleCompletion>,
}

/// A single compiler error or warning.
///
/// Fields are private; a parsed error is never mutated. The `with_*`
/// builders exist for constructing errors outside of deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildError {
    error_code: String,
    message: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    position: Option<CompilerPosition>,
    #[serde(default)]
    suggestion: Option<Suggestion>,
    #[serde(default)]
    error_link: Option<String>,
    #[serde(default)]
    module_name: Option<String>,
    #[serde(default, rename = "pursIde")]
    extra_info: Option<IdeInfo>,
}

impl RebuildError {
    #[must_use]
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            filename: None,
            position: None,
            suggestion: None,
            error_link: None,
            module_name: None,
            extra_info: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_position(mut self, position: CompilerPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn with_extra_info(mut self, extra_info: IdeInfo) -> Self {
        self.extra_info = Some(extra_info);
        self
    }

    #[must_use]
    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    #[must_use]
    pub fn position(&self) -> Option<CompilerPosition> {
        self.position
    }

    #[must_use]
    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.suggestion.as_ref()
    }

    #[must_use]
    pub fn error_link(&self) -> Option<&str> {
        self.error_link.as_deref()
    }

    #[must_use]
    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    #[must_use]
    pub fn extra_info(&self) -> Option<&IdeInfo> {
        self.extra_info.as_ref()
    }

    /// The span a suggestion applies to: its own replace range, else the error position.
    #[must_use]
    pub fn suggestion_span(&self) -> Option<CompilerPosition> {
        self.suggestion
            .as_ref()
            .and_then(Suggestion::replace_range)
            .or(self.position)
    }
}

/// The structured payload of one compiler invocation.
///
/// Both arrays are required: a JSON object missing either is not a compiler result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PscResult {
    pub errors: Vec<RebuildError>,
    pub warnings: Vec<RebuildError>,
}

impl PscResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Outcome of a build.
///
/// `success` means different things per build kind:
/// - incremental rebuild: always `true` once the daemon answered, errors or not;
/// - full build: `false` only when the build process itself failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub errors: Vec<RebuildError>,
    pub warnings: Vec<RebuildError>,
    pub success: bool,
}

impl BuildResult {
    /// A daemon rebuild that produced a structured answer.
    #[must_use]
    pub fn incremental(result: PscResult) -> Self {
        Self {
            errors: result.errors,
            warnings: result.warnings,
            success: true,
        }
    }

    /// A full build whose process exited with 0 or 1 and printed a result.
    #[must_use]
    pub fn completed(result: PscResult) -> Self {
        Self {
            errors: result.errors,
            warnings: result.warnings,
            success: true,
        }
    }

    /// A full build whose process failed outright.
    #[must_use]
    pub fn failed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_psc_result(self) -> PscResult {
        PscResult {
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}
