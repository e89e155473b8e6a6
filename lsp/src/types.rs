//! Public types shared between the pipeline and its host.
//!
//! The host (the binary) provides the editor connection as a [`Client`] and
//! the open-document store as [`Documents`]; everything in this crate talks
//! to the editor through those two seams.

use lsp_types::{Diagnostic, Url, WorkspaceEdit};
use serde::{Deserialize, Serialize};

/// Level of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Outbound editor connection.
pub trait Client: Send + Sync {
    /// Replace the diagnostics shown for `uri`. An empty list clears them.
    fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);

    fn log(&self, level: Notice, message: &str);

    /// Ask the editor to apply an edit. Best effort; the answer is not awaited.
    fn apply_edit(&self, edit: WorkspaceEdit);
}

/// Live text of an open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub version: i32,
    pub text: String,
}

impl DocumentSnapshot {
    #[must_use]
    pub fn new(version: i32, text: impl Into<String>) -> Self {
        Self {
            version,
            text: text.into(),
        }
    }
}

/// Read access to the documents the editor has open.
pub trait Documents: Send + Sync {
    fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot>;
}

/// A module identifier found by the daemon's search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub identifier: String,
    pub module: String,
    #[serde(rename = "type", default)]
    pub type_info: String,
}

/// What executing a command hands back to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandOutcome {
    /// Done, or nothing to do.
    #[default]
    None,
    /// Several replacements matched the identifier under the cursor.
    Candidates(Vec<Candidate>),
    /// The import could come from several modules; the caller picks one.
    AmbiguousResolution(Vec<Candidate>),
}

impl CommandOutcome {
    /// JSON result for `workspace/executeCommand`.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::None => serde_json::Value::Null,
            Self::Candidates(items) | Self::AmbiguousResolution(items) => {
                serde_json::to_value(items).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_error_notice_is_error() {
        assert!(Notice::Error.is_error());
        assert!(!Notice::Warning.is_error());
        assert!(!Notice::Success.is_error());
    }

    #[test]
    fn test_outcome_json() {
        assert!(CommandOutcome::None.into_json().is_null());

        let outcome = CommandOutcome::AmbiguousResolution(vec![
            Candidate {
                identifier: "fromMaybe".into(),
                module: "Data.Maybe".into(),
                type_info: "forall a. a -> Maybe a -> a".into(),
            },
            Candidate {
                identifier: "fromMaybe".into(),
                module: "Data.Maybe.Extra".into(),
                type_info: String::new(),
            },
        ]);
        let json = outcome.into_json();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[1]["module"], "Data.Maybe.Extra");
        assert_eq!(json[0]["type"], "forall a. a -> Maybe a -> a");
    }
}
