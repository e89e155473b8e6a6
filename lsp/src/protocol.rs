//! `purs ide server` request and response serde types, plus file URI helpers.

use std::path::{Component, Path, PathBuf};

use lsp_types::Url;
use pursls_types::{PscResult, RebuildError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::IdeError;
use crate::types::Candidate;

const MAX_COMPLETIONS: u32 = 50;

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

/// One request line sent to the daemon.
#[derive(Debug, Serialize)]
#[serde(tag = "command", content = "params", rename_all = "camelCase")]
pub(crate) enum IdeRequest<'a> {
    Cwd,
    /// An empty module list loads every module in the output directory.
    Load { modules: Vec<String> },
    Rebuild {
        file: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        codegen: Option<&'a [String]>,
    },
    List {
        #[serde(rename = "type")]
        kind: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Import {
        file: &'a str,
        filters: Vec<Filter<'a>>,
        import_command: ImportCommand<'a>,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        filters: Vec<Filter<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_module: Option<&'a str>,
        options: CompleteOptions,
    },
}

impl<'a> IdeRequest<'a> {
    pub fn load_all() -> Self {
        Self::Load {
            modules: Vec::new(),
        }
    }

    pub fn loaded_modules() -> Self {
        Self::List {
            kind: "loadedModules",
        }
    }

    pub fn import(file: &'a str, request: &'a ImportRequest) -> Self {
        let filters = request
            .module
            .as_deref()
            .map(|module| {
                vec![Filter::Modules {
                    modules: vec![module],
                }]
            })
            .unwrap_or_default();
        Self::Import {
            file,
            filters,
            import_command: ImportCommand {
                import_command: "addImport",
                identifier: &request.identifier,
                qualifier: request.qualifier.as_deref(),
            },
        }
    }

    pub fn complete(search: &'a str, current_module: Option<&'a str>) -> Self {
        Self::Complete {
            filters: vec![Filter::Flex { search }],
            current_module,
            options: CompleteOptions {
                max_results: MAX_COMPLETIONS,
                group_reexports: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "filter", content = "params", rename_all = "camelCase")]
pub(crate) enum Filter<'a> {
    Modules { modules: Vec<&'a str> },
    Flex { search: &'a str },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportCommand<'a> {
    import_command: &'static str,
    identifier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    qualifier: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompleteOptions {
    max_results: u32,
    group_reexports: bool,
}

/// An identifier to import into a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// Answer to an `import` request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ImportOutcome {
    /// The rewritten file, one entry per line.
    Lines(Vec<String>),
    /// Several modules export the identifier.
    Ambiguous(Vec<Candidate>),
}

/// One response line from the daemon.
#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub(crate) enum IdeResponse {
    Success(serde_json::Value),
    Error(serde_json::Value),
}

impl IdeResponse {
    pub fn decode(value: serde_json::Value) -> Result<Self, IdeError> {
        serde_json::from_value(value).map_err(IdeError::Protocol)
    }

    /// The success payload, or the daemon's error message.
    pub fn into_success<T: DeserializeOwned>(self) -> Result<T, IdeError> {
        match self {
            Self::Success(value) => serde_json::from_value(value).map_err(IdeError::Protocol),
            Self::Error(value) => Err(IdeError::Command(error_text(&value))),
        }
    }

    /// Decode a `rebuild` answer.
    ///
    /// The daemon reports warnings as a success and errors as an error; a
    /// non-list error payload means the rebuild itself could not run.
    pub fn into_rebuild_result(self) -> Result<PscResult, IdeError> {
        match self {
            Self::Success(value) => Ok(PscResult {
                errors: Vec::new(),
                warnings: decode_errors(value)?,
            }),
            Self::Error(value) if value.is_array() => Ok(PscResult {
                errors: decode_errors(value)?,
                warnings: Vec::new(),
            }),
            Self::Error(value) => Err(IdeError::Command(error_text(&value))),
        }
    }
}

fn decode_errors(value: serde_json::Value) -> Result<Vec<RebuildError>, IdeError> {
    serde_json::from_value(value).map_err(IdeError::Protocol)
}

fn error_text(value: &serde_json::Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), String::from)
}

pub fn path_to_file_uri(path: &Path) -> Result<Url, PathToUriError> {
    Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

pub fn file_uri_to_path(uri: &Url) -> Option<PathBuf> {
    if uri.scheme() != "file" {
        return None;
    }
    uri.to_file_path().ok()
}

/// Lexically resolve `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for c in path.components() {
        match c {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Absolute path of a compiler-reported filename, which is relative to the project root.
pub fn resolve_filename(root: &Path, filename: &str) -> PathBuf {
    normalize_path(&root.join(filename))
}
