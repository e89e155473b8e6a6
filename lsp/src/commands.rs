//! Commands the server advertises through `workspace/executeCommand`.
//!
//! Every command carries at most one argument, a JSON object decoded into a
//! typed payload. Anything that does not decode is rejected as a whole.

use lsp_types::{Command, Range, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::edits::Replacement;
use crate::protocol::ImportRequest;

pub const BUILD: &str = "purescript.build";
pub const REPLACE_SUGGESTION: &str = "purescript.replaceSuggestion";
pub const REPLACE_ALL_SUGGESTIONS: &str = "purescript.replaceAllSuggestions";
pub const FILL_TYPED_HOLE: &str = "purescript.fillTypedHole";
pub const FIX_TYPO: &str = "purescript.fixTypo";
pub const ADD_COMPLETION_IMPORT: &str = "purescript.addCompletionImport";
pub const START_PSC_IDE: &str = "purescript.startPscIde";
pub const STOP_PSC_IDE: &str = "purescript.stopPscIde";
pub const RESTART_PSC_IDE: &str = "purescript.restartPscIde";

/// Every command name, for the `executeCommandProvider` capability.
pub const ALL_COMMANDS: &[&str] = &[
    BUILD,
    REPLACE_SUGGESTION,
    REPLACE_ALL_SUGGESTIONS,
    FILL_TYPED_HOLE,
    FIX_TYPO,
    ADD_COMPLETION_IMPORT,
    START_PSC_IDE,
    STOP_PSC_IDE,
    RESTART_PSC_IDE,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ReplaceSuggestionArgs {
    uri: Url,
    #[serde(flatten)]
    replacement: Replacement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ReplaceAllSuggestionsArgs {
    uri: Url,
    replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FillTypedHoleArgs {
    uri: Url,
    range: Range,
    replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FixTypoArgs {
    uri: Url,
    line: u32,
    column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AddCompletionImportArgs {
    uri: Url,
    #[serde(flatten)]
    import: ImportRequest,
}

/// A decoded command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Build,
    ReplaceSuggestion {
        uri: Url,
        replacement: Replacement,
    },
    ReplaceAllSuggestions {
        uri: Url,
        replacements: Vec<Replacement>,
    },
    FillTypedHole {
        uri: Url,
        range: Range,
        replacement: String,
    },
    /// `line` and `column` are the 0-based editor position of the unknown identifier.
    FixTypo {
        uri: Url,
        line: u32,
        column: u32,
    },
    AddCompletionImport {
        uri: Url,
        import: ImportRequest,
    },
    StartIde,
    StopIde,
    RestartIde,
}

impl ServerCommand {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Build => BUILD,
            Self::ReplaceSuggestion { .. } => REPLACE_SUGGESTION,
            Self::ReplaceAllSuggestions { .. } => REPLACE_ALL_SUGGESTIONS,
            Self::FillTypedHole { .. } => FILL_TYPED_HOLE,
            Self::FixTypo { .. } => FIX_TYPO,
            Self::AddCompletionImport { .. } => ADD_COMPLETION_IMPORT,
            Self::StartIde => START_PSC_IDE,
            Self::StopIde => STOP_PSC_IDE,
            Self::RestartIde => RESTART_PSC_IDE,
        }
    }

    /// Decode `workspace/executeCommand` parameters. `None` for unknown
    /// commands and malformed payloads.
    #[must_use]
    pub fn decode(name: &str, arguments: &[serde_json::Value]) -> Option<Self> {
        let command = match name {
            BUILD => Self::Build,
            START_PSC_IDE => Self::StartIde,
            STOP_PSC_IDE => Self::StopIde,
            RESTART_PSC_IDE => Self::RestartIde,
            REPLACE_SUGGESTION => {
                let args: ReplaceSuggestionArgs = payload(name, arguments)?;
                Self::ReplaceSuggestion {
                    uri: args.uri,
                    replacement: args.replacement,
                }
            }
            REPLACE_ALL_SUGGESTIONS => {
                let args: ReplaceAllSuggestionsArgs = payload(name, arguments)?;
                Self::ReplaceAllSuggestions {
                    uri: args.uri,
                    replacements: args.replacements,
                }
            }
            FILL_TYPED_HOLE => {
                let args: FillTypedHoleArgs = payload(name, arguments)?;
                Self::FillTypedHole {
                    uri: args.uri,
                    range: args.range,
                    replacement: args.replacement,
                }
            }
            FIX_TYPO => {
                let args: FixTypoArgs = payload(name, arguments)?;
                Self::FixTypo {
                    uri: args.uri,
                    line: args.line,
                    column: args.column,
                }
            }
            ADD_COMPLETION_IMPORT => {
                let args: AddCompletionImportArgs = payload(name, arguments)?;
                Self::AddCompletionImport {
                    uri: args.uri,
                    import: args.import,
                }
            }
            _ => {
                tracing::warn!(command = name, "Unknown command");
                return None;
            }
        };
        Some(command)
    }

    /// The argument list this command is sent with.
    #[must_use]
    pub fn arguments(&self) -> Option<Vec<serde_json::Value>> {
        let value = match self {
            Self::Build | Self::StartIde | Self::StopIde | Self::RestartIde => return None,
            Self::ReplaceSuggestion { uri, replacement } => {
                serde_json::to_value(ReplaceSuggestionArgs {
                    uri: uri.clone(),
                    replacement: replacement.clone(),
                })
            }
            Self::ReplaceAllSuggestions { uri, replacements } => {
                serde_json::to_value(ReplaceAllSuggestionsArgs {
                    uri: uri.clone(),
                    replacements: replacements.clone(),
                })
            }
            Self::FillTypedHole {
                uri,
                range,
                replacement,
            } => serde_json::to_value(FillTypedHoleArgs {
                uri: uri.clone(),
                range: *range,
                replacement: replacement.clone(),
            }),
            Self::FixTypo { uri, line, column } => serde_json::to_value(FixTypoArgs {
                uri: uri.clone(),
                line: *line,
                column: *column,
            }),
            Self::AddCompletionImport { uri, import } => {
                serde_json::to_value(AddCompletionImportArgs {
                    uri: uri.clone(),
                    import: import.clone(),
                })
            }
        };
        match value {
            Ok(value) => Some(vec![value]),
            Err(e) => {
                tracing::warn!(command = self.name(), "Cannot encode command arguments: {e}");
                None
            }
        }
    }

    /// An LSP command that invokes this one when chosen.
    #[must_use]
    pub fn to_lsp(&self, title: impl Into<String>) -> Command {
        Command {
            title: title.into(),
            command: self.name().to_string(),
            arguments: self.arguments(),
        }
    }
}

fn payload<T: DeserializeOwned>(name: &str, arguments: &[serde_json::Value]) -> Option<T> {
    let Some(first) = arguments.first() else {
        tracing::warn!(command = name, "Command is missing its argument");
        return None;
    };
    match serde_json::from_value(first.clone()) {
        Ok(args) => Some(args),
        Err(e) => {
            tracing::warn!(command = name, "Malformed command argument: {e}");
            None
        }
    }
}
