//! Settings for the PureScript language server.
//!
//! Settings come from three places, highest priority first:
//!
//! 1. the editor (`initializationOptions` or `workspace/didChangeConfiguration`),
//!    read from the `purescript` section when present;
//! 2. a `purs-ls.toml` file at the project root;
//! 3. built-in defaults.
//!
//! Keys are camelCase in every source so a snippet can move between the editor
//! configuration and the project file unchanged:
//!
//! ```toml
//! pursExe = "${HOME}/.local/bin/purs"
//! buildCommand = "spago build --purs-args --json-errors"
//! censorWarnings = ["ShadowedName"]
//! fullBuildOnSave = true
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Project settings file name, looked up at the project root.
pub const PROJECT_FILE_NAME: &str = "purs-ls.toml";

/// Section of the editor configuration that holds our settings.
const EDITOR_SECTION: &str = "purescript";

/// Keys recognised when the editor sends the section itself.
const SETTING_KEYS: &[&str] = &[
    "pursExe",
    "addNpmPath",
    "buildCommand",
    "censorWarnings",
    "autoStartPscIde",
    "pscIdePort",
    "outputDirectory",
    "sourceGlobs",
    "pscIdeLogLevel",
    "polling",
    "editorMode",
    "noWatch",
    "fullBuildOnSave",
    "codegenTargets",
];

const DEFAULT_BUILD_COMMAND: &str = "spago build --purs-args --json-errors";

fn default_source_globs() -> Vec<String> {
    vec![
        "src/**/*.purs".to_string(),
        ".spago/*/*/src/**/*.purs".to_string(),
        "test/**/*.purs".to_string(),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid editor settings: {0}")]
    Editor(#[from] serde_json::Error),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Editor(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Compiler executable used to launch `purs ide server`.
    pub purs_exe: String,
    /// Prepend `<root>/node_modules/.bin` to PATH for the compiler and the build.
    pub add_npm_path: bool,
    /// Whitespace-separated full build command. Must print `--json-errors` output.
    pub build_command: String,
    /// Warning codes that are never reported.
    pub censor_warnings: Vec<String>,
    /// Start the IDE server when the session initialises.
    pub auto_start_psc_ide: bool,
    /// Fixed IDE server port. A free port is picked when absent.
    pub psc_ide_port: Option<u16>,
    pub output_directory: Option<String>,
    /// Source globs passed to the IDE server.
    pub source_globs: Vec<String>,
    /// `--log-level` for the IDE server (`all`, `debug`, `perf`, `none`).
    pub psc_ide_log_level: Option<String>,
    pub polling: bool,
    pub editor_mode: bool,
    pub no_watch: bool,
    /// Run the full build command on save instead of a single-file rebuild.
    pub full_build_on_save: bool,
    /// Codegen targets for single-file rebuilds (e.g. `["js"]`).
    pub codegen_targets: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            purs_exe: "purs".to_string(),
            add_npm_path: false,
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
            censor_warnings: Vec::new(),
            auto_start_psc_ide: true,
            psc_ide_port: None,
            output_directory: None,
            source_globs: default_source_globs(),
            psc_ide_log_level: None,
            polling: false,
            editor_mode: false,
            no_watch: false,
            full_build_on_save: false,
            codegen_targets: Vec::new(),
        }
    }
}

impl Settings {
    /// Parse settings pushed by the editor.
    ///
    /// Accepts either the whole configuration object (reading its `purescript`
    /// section) or the section itself. `Ok(None)` when neither is present,
    /// including `null`, `{}` and objects holding only other sections.
    pub fn from_editor(value: &serde_json::Value) -> Result<Option<Self>, ConfigError> {
        let section = match value.get(EDITOR_SECTION) {
            Some(section) => section,
            None if is_bare_section(value) => value,
            None => return Ok(None),
        };
        if section.is_null() {
            return Ok(None);
        }
        let settings: Settings = serde_json::from_value(section.clone())?;
        Ok(Some(settings.expanded()))
    }

    /// Load `purs-ls.toml` from the project root, if there is one.
    pub fn load_project(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = root.join(PROJECT_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read settings at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        match toml::from_str::<Settings>(&content) {
            Ok(settings) => Ok(Some(settings.expanded())),
            Err(err) => {
                tracing::warn!("Failed to parse settings at {:?}: {}", path, err);
                Err(ConfigError::Parse { path, source: err })
            }
        }
    }

    /// Resolve the effective settings from every source.
    ///
    /// Broken sources are logged and skipped; this never fails.
    #[must_use]
    pub fn resolve(editor: Option<&serde_json::Value>, root: Option<&Path>) -> Self {
        if let Some(value) = editor {
            match Self::from_editor(value) {
                Ok(Some(settings)) => return settings,
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring editor settings: {e}"),
            }
        }

        if let Some(root) = root {
            match Self::load_project(root) {
                Ok(Some(settings)) => {
                    tracing::info!(root = %root.display(), "Using {PROJECT_FILE_NAME}");
                    return settings;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(path = ?e.path(), "Ignoring project settings: {e}"),
            }
        }

        Self::default()
    }

    fn expanded(mut self) -> Self {
        self.purs_exe = expand_env_vars(&self.purs_exe);
        self.build_command = expand_env_vars(&self.build_command);
        self
    }

    /// Whether warnings with this code are suppressed.
    #[must_use]
    pub fn censors(&self, code: &str) -> bool {
        self.censor_warnings.iter().any(|c| c == code)
    }

    /// Split the build command into program and arguments.
    ///
    /// Returns `None` when the command is blank.
    #[must_use]
    pub fn build_command_parts(&self) -> Option<(&str, Vec<&str>)> {
        let mut parts = self.build_command.split_whitespace();
        let program = parts.next()?;
        Some((program, parts.collect()))
    }
}

fn is_bare_section(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.keys().any(|key| SETTING_KEYS.contains(&key.as_str())))
}

/// Replace `${VAR}` references with environment values. Unset variables become empty.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if var.is_empty() {
            out.push_str("${}");
        } else {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // expand_env_vars tests

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("spago build"), "spago build");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            std::env::set_var("PURSLS_TEST_BIN", "/opt/purs/bin");
        }
        assert_eq!(
            expand_env_vars("${PURSLS_TEST_BIN}/purs"),
            "/opt/purs/bin/purs"
        );
        unsafe {
            std::env::remove_var("PURSLS_TEST_BIN");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            std::env::remove_var("PURSLS_MISSING_VAR");
        }
        assert_eq!(expand_env_vars("a${PURSLS_MISSING_VAR}b"), "ab");
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("purs ${UNCLOSED"), "purs ${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_var_name_preserved() {
        assert_eq!(expand_env_vars("x${}y"), "x${}y");
    }

    // Settings parsing tests

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.purs_exe, "purs");
        assert!(settings.auto_start_psc_ide);
        assert_eq!(
            settings.build_command_parts(),
            Some((
                "spago",
                vec!["build", "--purs-args", "--json-errors"]
            ))
        );
        assert_eq!(settings.source_globs.len(), 3);
    }

    #[test]
    fn from_editor_reads_purescript_section() {
        let value = serde_json::json!({
            "purescript": {
                "pursExe": "purs-0.15",
                "censorWarnings": ["ShadowedName", "UnusedImport"],
                "pscIdePort": 4242,
                "fullBuildOnSave": true
            }
        });
        let settings = Settings::from_editor(&value).unwrap().unwrap();
        assert_eq!(settings.purs_exe, "purs-0.15");
        assert_eq!(settings.psc_ide_port, Some(4242));
        assert!(settings.full_build_on_save);
        assert!(settings.censors("ShadowedName"));
        assert!(!settings.censors("TypesDoNotUnify"));
        // Unspecified keys keep their defaults
        assert_eq!(settings.build_command, DEFAULT_BUILD_COMMAND);
    }

    #[test]
    fn from_editor_accepts_bare_section() {
        let value = serde_json::json!({ "addNpmPath": true });
        let settings = Settings::from_editor(&value).unwrap().unwrap();
        assert!(settings.add_npm_path);
    }

    #[test]
    fn from_editor_null_is_none() {
        assert!(
            Settings::from_editor(&serde_json::Value::Null)
                .unwrap()
                .is_none()
        );
        let value = serde_json::json!({ "purescript": null });
        assert!(Settings::from_editor(&value).unwrap().is_none());
    }

    #[test]
    fn from_editor_wrong_type_is_error() {
        let value = serde_json::json!({ "purescript": { "pscIdePort": "not a port" } });
        assert!(matches!(
            Settings::from_editor(&value),
            Err(ConfigError::Editor(_))
        ));
    }

    #[test]
    fn blank_build_command_has_no_parts() {
        let settings = Settings {
            build_command: "   ".to_string(),
            ..Settings::default()
        };
        assert!(settings.build_command_parts().is_none());
    }

    #[test]
    fn load_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE_NAME),
            r#"
buildCommand = "spago build --json-errors"
sourceGlobs = ["src/**/*.purs"]
codegenTargets = ["js", "corefn"]
"#,
        )
        .unwrap();

        let settings = Settings::load_project(dir.path()).unwrap().unwrap();
        assert_eq!(settings.build_command, "spago build --json-errors");
        assert_eq!(settings.source_globs, vec!["src/**/*.purs"]);
        assert_eq!(settings.codegen_targets, vec!["js", "corefn"]);
    }

    #[test]
    fn load_project_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load_project(dir.path()).unwrap().is_none());
    }

    #[test]
    fn load_project_parse_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE_NAME), "pursExe = [").unwrap();
        let err = Settings::load_project(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Some(dir.path().join(PROJECT_FILE_NAME).as_path()));
    }

    #[test]
    fn resolve_prefers_editor_then_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE_NAME), "pursExe = \"from-file\"").unwrap();

        let editor = serde_json::json!({ "purescript": { "pursExe": "from-editor" } });
        assert_eq!(
            Settings::resolve(Some(&editor), Some(dir.path())).purs_exe,
            "from-editor"
        );
        assert_eq!(
            Settings::resolve(None, Some(dir.path())).purs_exe,
            "from-file"
        );
        assert_eq!(Settings::resolve(None, None).purs_exe, "purs");
    }

    #[test]
    fn resolve_falls_through_editor_without_our_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE_NAME), "pursExe = \"from-file\"").unwrap();

        let empty = serde_json::json!({});
        let foreign = serde_json::json!({ "haskell": { "formattingProvider": "ormolu" } });
        for editor in [empty, foreign] {
            assert!(Settings::from_editor(&editor).unwrap().is_none());
            assert_eq!(
                Settings::resolve(Some(&editor), Some(dir.path())).purs_exe,
                "from-file"
            );
        }
    }

    #[test]
    fn resolve_skips_broken_editor_settings() {
        let editor = serde_json::json!({ "purescript": { "polling": "yes" } });
        assert_eq!(Settings::resolve(Some(&editor), None), Settings::default());
    }
}
