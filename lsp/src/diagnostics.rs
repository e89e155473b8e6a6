//! Conversion of compiler results into editor diagnostics, and the
//! per-file cache they are reconciled into.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use lsp_types::{
    CodeDescription, Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range, Url,
};
use pursls_config::Settings;
use pursls_types::{PscResult, RebuildError};

use crate::protocol::resolve_filename;

/// `source` label on every published diagnostic.
pub const SOURCE: &str = "PureScript";

/// Range used when the compiler reports no position: the whole first line.
#[must_use]
pub fn dummy_range() -> Range {
    Range::new(Position::new(0, 0), Position::new(1, 0))
}

/// A compiler error together with the diagnostic published for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDiagnostic {
    error: RebuildError,
    diagnostic: Diagnostic,
}

impl FileDiagnostic {
    #[must_use]
    pub fn new(error: RebuildError, diagnostic: Diagnostic) -> Self {
        Self { error, diagnostic }
    }

    #[must_use]
    pub fn error(&self) -> &RebuildError {
        &self.error
    }

    #[must_use]
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }
}

/// Output of [`convert`].
#[derive(Debug, Default)]
pub struct Conversion {
    /// Every retained error and warning, errors first, including those without a file.
    pub psc_errors: Vec<RebuildError>,
    /// Entries grouped by absolute path, in reporting order within each file.
    pub by_file: BTreeMap<PathBuf, Vec<FileDiagnostic>>,
}

impl Conversion {
    /// Take one file's entries, leaving the rest.
    pub fn take_file(&mut self, path: &Path) -> Vec<FileDiagnostic> {
        self.by_file.remove(path).unwrap_or_default()
    }
}

/// Turn a compiler result into per-file diagnostics.
///
/// Warnings whose code is censored in `settings` are dropped; errors never are.
#[must_use]
pub fn convert(root: &Path, settings: &Settings, result: PscResult) -> Conversion {
    let errors = result
        .errors
        .into_iter()
        .map(|e| (e, DiagnosticSeverity::ERROR));
    let warnings = result
        .warnings
        .into_iter()
        .filter(|w| !settings.censors(w.error_code()))
        .map(|w| (w, DiagnosticSeverity::WARNING));

    let mut conversion = Conversion::default();
    for (error, severity) in errors.chain(warnings) {
        if let Some(filename) = error.filename() {
            let path = resolve_filename(root, filename);
            let diagnostic = to_diagnostic(&error, severity);
            conversion
                .by_file
                .entry(path)
                .or_default()
                .push(FileDiagnostic::new(error.clone(), diagnostic));
        }
        conversion.psc_errors.push(error);
    }
    conversion
}

fn to_diagnostic(error: &RebuildError, severity: DiagnosticSeverity) -> Diagnostic {
    let range = match error.position() {
        Some(position) if position.is_ordered() => position.to_range(),
        Some(position) => {
            tracing::debug!(code = error.error_code(), ?position, "Reversed position");
            dummy_range()
        }
        None => dummy_range(),
    };
    let code_description = error
        .error_link()
        .and_then(|link| Url::parse(link).ok())
        .map(|href| CodeDescription { href });

    Diagnostic {
        range,
        severity: Some(severity),
        code: Some(NumberOrString::String(error.error_code().to_string())),
        code_description,
        source: Some(SOURCE.to_string()),
        message: error.message().to_string(),
        ..Diagnostic::default()
    }
}

/// Files a full build touched: fresh diagnostics and files to clear.
#[derive(Debug, Default, PartialEq)]
pub struct FullBuildDelta {
    pub publish: Vec<(PathBuf, Vec<Diagnostic>)>,
    pub clear: Vec<PathBuf>,
}

/// Last known diagnostics per file, keyed by absolute path.
#[derive(Debug, Default)]
pub struct DiagnosticCache {
    files: HashMap<PathBuf, Vec<FileDiagnostic>>,
}

impl DiagnosticCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entries for a file; empty when unknown or cleared.
    #[must_use]
    pub fn get(&self, path: &Path) -> &[FileDiagnostic] {
        self.files.get(path).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Replace one file's entries after an incremental rebuild.
    pub fn replace_file(&mut self, path: PathBuf, entries: Vec<FileDiagnostic>) {
        tracing::debug!(path = %path.display(), count = entries.len(), "Diagnostics cached");
        self.files.insert(path, entries);
    }

    /// Forget a file's entries. The key stays so a later full build clears it in the editor.
    pub fn clear_file(&mut self, path: &Path) {
        if let Some(entries) = self.files.get_mut(path) {
            entries.clear();
        }
    }

    /// Replace the whole cache with a full build's result.
    ///
    /// Every previously known file absent from the new result is reported in
    /// [`FullBuildDelta::clear`] once and then forgotten.
    pub fn apply_full_build(
        &mut self,
        by_file: BTreeMap<PathBuf, Vec<FileDiagnostic>>,
    ) -> FullBuildDelta {
        let mut clear: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| !by_file.contains_key(*path))
            .cloned()
            .collect();
        clear.sort();

        let publish = by_file
            .iter()
            .map(|(path, entries)| {
                let diagnostics = entries.iter().map(|e| e.diagnostic.clone()).collect();
                (path.clone(), diagnostics)
            })
            .collect();

        self.files = by_file.into_iter().collect();
        tracing::debug!(
            files = self.files.len(),
            cleared = clear.len(),
            "Diagnostics cache rebuilt"
        );

        FullBuildDelta { publish, clear }
    }
}
