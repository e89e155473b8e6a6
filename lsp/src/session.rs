//! Session facade: the single owner of all per-connection state.
//!
//! The host drives every editor event through one `Session` sequentially, so
//! no handler observes another's half-applied state.

use std::path::{Path, PathBuf};

use lsp_types::{
    Command, Diagnostic, DocumentChanges, OneOf, OptionalVersionedTextDocumentIdentifier, Position,
    Range, TextDocumentEdit, TextEdit, Url, WorkspaceEdit,
};
use pursls_config::Settings;
use pursls_types::BuildResult;

use crate::actions;
use crate::build::run_build;
use crate::commands::ServerCommand;
use crate::diagnostics::{DiagnosticCache, FullBuildDelta, convert};
use crate::edits::{self, Replacement};
use crate::protocol::{
    ImportOutcome, ImportRequest, file_uri_to_path, normalize_path, path_to_file_uri,
};
use crate::server::IdeBackend;
use crate::supervisor::Supervisor;
use crate::text;
use crate::types::{Client, CommandOutcome, DocumentSnapshot, Documents, Notice};

const BUILD_PREREQUISITE_MESSAGE: &str = "Error parsing build command";

/// Validity of the loaded-modules listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModulesCache {
    #[default]
    Invalid,
    Valid { file: Url, modules: Vec<String> },
}

impl ModulesCache {
    pub fn invalidate(&mut self) {
        *self = Self::Invalid;
    }

    /// Cached modules, when the listing was made for `file`.
    #[must_use]
    pub fn get(&self, file: &Url) -> Option<&[String]> {
        match self {
            Self::Valid {
                file: cached,
                modules,
            } if cached == file => Some(modules),
            _ => None,
        }
    }
}

pub struct Session<B> {
    backend: B,
    supervisor: Supervisor,
    settings: Settings,
    root: Option<PathBuf>,
    diagnostics: DiagnosticCache,
    modules: ModulesCache,
}

impl<B: IdeBackend> Session<B> {
    pub fn new(backend: B, settings: Settings, root: Option<PathBuf>) -> Self {
        Self::with_supervisor(backend, Supervisor::new(), settings, root)
    }

    pub fn with_supervisor(
        backend: B,
        supervisor: Supervisor,
        settings: Settings,
        root: Option<PathBuf>,
    ) -> Self {
        Self {
            backend,
            supervisor,
            settings,
            root: root.map(|r| normalize_path(&r)),
            diagnostics: DiagnosticCache::new(),
            modules: ModulesCache::Invalid,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.supervisor.port()
    }

    #[must_use]
    pub fn modules_cache(&self) -> &ModulesCache {
        &self.modules
    }

    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticCache {
        &self.diagnostics
    }

    // ── daemon lifecycle ──

    pub async fn start_ide(&mut self, client: &dyn Client) -> Option<u16> {
        let Some(root) = self.root.clone() else {
            client.log(Notice::Warning, "No project root, IDE server not started");
            return None;
        };
        let port = self
            .supervisor
            .start(&self.backend, &self.settings, &root, client)
            .await;
        self.modules.invalidate();
        port
    }

    pub async fn stop_ide(&mut self, client: &dyn Client) {
        self.supervisor.stop(client).await;
        self.modules.invalidate();
    }

    pub async fn restart_ide(&mut self, client: &dyn Client) -> Option<u16> {
        let Some(root) = self.root.clone() else {
            client.log(Notice::Warning, "No project root, IDE server not started");
            return None;
        };
        let port = self
            .supervisor
            .restart(&self.backend, &self.settings, &root, client)
            .await;
        self.modules.invalidate();
        port
    }

    // ── builds ──

    /// Rebuild one file through the daemon and publish its diagnostics.
    ///
    /// Without a daemon or a project root this is a silent no-op.
    pub async fn get_diagnostics(&mut self, uri: &Url, client: &dyn Client) -> Vec<Diagnostic> {
        self.rebuild_file(uri, client).await.unwrap_or_default()
    }

    async fn rebuild_file(&mut self, uri: &Url, client: &dyn Client) -> Option<Vec<Diagnostic>> {
        let (Some(port), Some(root)) = (self.port(), self.root.clone()) else {
            return None;
        };
        let path = normalize_path(&file_uri_to_path(uri)?);

        let codegen = (!self.settings.codegen_targets.is_empty())
            .then_some(self.settings.codegen_targets.as_slice());
        let result = match self.backend.rebuild(port, &path, codegen).await {
            Ok(result) => BuildResult::incremental(result),
            Err(e) => {
                client.log(
                    Notice::Warning,
                    &format!("Rebuild of {} failed: {e}", path.display()),
                );
                return None;
            }
        };

        let mut conversion = convert(&root, &self.settings, result.into_psc_result());
        let entries = conversion.take_file(&path);
        let published: Vec<Diagnostic> = entries.iter().map(|e| e.diagnostic().clone()).collect();
        self.diagnostics.replace_file(path, entries);
        client.publish_diagnostics(uri.clone(), published.clone(), None);
        Some(published)
    }

    /// Build the whole project, publish every affected file and reload the daemon.
    pub async fn full_build(&mut self, client: &dyn Client) -> FullBuildDelta {
        let (Some(port), Some(root)) = (self.port(), self.root.clone()) else {
            client.log(Notice::Error, BUILD_PREREQUISITE_MESSAGE);
            return FullBuildDelta::default();
        };
        if self.settings.build_command_parts().is_none() {
            client.log(Notice::Error, BUILD_PREREQUISITE_MESSAGE);
            return FullBuildDelta::default();
        }

        client.log(Notice::Info, "Building project");
        let result = match run_build(&self.settings, &root).await {
            Ok(result) => BuildResult::completed(result),
            Err(e) => {
                tracing::warn!("Build failed: {e}");
                client.log(Notice::Error, &format!("Build failed: {e}"));
                return FullBuildDelta::default();
            }
        };
        let error_count = result.errors.len();
        let warning_count = result.warnings.len();

        let conversion = convert(&root, &self.settings, result.into_psc_result());
        let delta = self.diagnostics.apply_full_build(conversion.by_file);
        for (path, diagnostics) in &delta.publish {
            publish_path(client, path, diagnostics.clone());
        }
        for path in &delta.clear {
            publish_path(client, path, Vec::new());
        }
        client.log(
            Notice::Info,
            &format!("Build finished: {error_count} errors, {warning_count} warnings"),
        );

        client.log(Notice::Info, "Reloading modules");
        match self.backend.load(port).await {
            Ok(message) => client.log(Notice::Success, &message),
            Err(e) => client.log(Notice::Warning, &format!("Reloading modules failed: {e}")),
        }
        self.modules.invalidate();
        delta
    }

    // ── document events ──

    /// Drop the file's cached diagnostics; their ranges no longer match the text.
    pub fn on_did_change(&mut self, uri: &Url) {
        if let Some(path) = file_uri_to_path(uri) {
            self.diagnostics.clear_file(&normalize_path(&path));
        }
        self.modules.invalidate();
    }

    pub async fn on_did_save(&mut self, uri: &Url, client: &dyn Client) {
        if self.settings.full_build_on_save {
            self.full_build(client).await;
        } else if self.rebuild_file(uri, client).await.is_some() {
            self.modules.invalidate();
        }
    }

    // ── code actions ──

    #[must_use]
    pub fn code_actions(&self, uri: &Url, range: Range) -> Vec<Command> {
        let Some(path) = file_uri_to_path(uri) else {
            return Vec::new();
        };
        actions::get_actions(uri, self.diagnostics.get(&normalize_path(&path)), range)
    }

    /// Modules the daemon has loaded, reusing the listing while it is valid for `uri`.
    pub async fn loaded_modules(&mut self, uri: &Url) -> Vec<String> {
        if let Some(modules) = self.modules.get(uri) {
            return modules.to_vec();
        }
        let Some(port) = self.port() else {
            return Vec::new();
        };
        match self.backend.loaded_modules(port).await {
            Ok(modules) => {
                self.modules = ModulesCache::Valid {
                    file: uri.clone(),
                    modules: modules.clone(),
                };
                modules
            }
            Err(e) => {
                tracing::warn!("Listing loaded modules failed: {e}");
                Vec::new()
            }
        }
    }

    // ── commands ──

    pub async fn execute_command(
        &mut self,
        command: ServerCommand,
        documents: &dyn Documents,
        client: &dyn Client,
    ) -> CommandOutcome {
        match command {
            ServerCommand::Build => {
                self.full_build(client).await;
            }
            ServerCommand::ReplaceSuggestion { uri, replacement } => {
                apply_replacements(&uri, &[replacement], documents, client);
            }
            ServerCommand::ReplaceAllSuggestions { uri, replacements } => {
                apply_replacements(&uri, &replacements, documents, client);
            }
            ServerCommand::FillTypedHole {
                uri,
                range,
                replacement,
            } => {
                if let Some(doc) = open_document(&uri, documents) {
                    let edit = TextEdit {
                        range,
                        new_text: replacement,
                    };
                    client.apply_edit(versioned_edit(uri, doc.version, vec![edit]));
                }
            }
            ServerCommand::FixTypo { uri, line, column } => {
                return self
                    .fix_typo(&uri, line, column, documents, client)
                    .await;
            }
            ServerCommand::AddCompletionImport { uri, import } => {
                return self.add_import(&uri, &import, documents, client).await;
            }
            ServerCommand::StartIde => {
                self.start_ide(client).await;
            }
            ServerCommand::StopIde => self.stop_ide(client).await,
            ServerCommand::RestartIde => {
                self.restart_ide(client).await;
            }
        }
        CommandOutcome::None
    }

    async fn fix_typo(
        &mut self,
        uri: &Url,
        line: u32,
        column: u32,
        documents: &dyn Documents,
        client: &dyn Client,
    ) -> CommandOutcome {
        let Some(port) = self.port() else {
            return CommandOutcome::None;
        };
        let Some(doc) = open_document(uri, documents) else {
            return CommandOutcome::None;
        };
        let position = Position::new(line, column);
        let Some((word, range)) = text::identifier_at(&doc.text, position) else {
            tracing::debug!(line, column, "No identifier under cursor");
            return CommandOutcome::None;
        };

        let current_module = text::module_name(&doc.text);
        let candidates = match self.backend.complete(port, &word, current_module).await {
            Ok(candidates) => candidates,
            Err(e) => {
                client.log(Notice::Warning, &format!("Searching for {word} failed: {e}"));
                return CommandOutcome::None;
            }
        };

        match candidates.as_slice() {
            [] => {
                client.log(Notice::Info, &format!("No suggestions for {word}"));
                CommandOutcome::None
            }
            [only] => {
                let edit = TextEdit {
                    range,
                    new_text: only.identifier.clone(),
                };
                client.apply_edit(versioned_edit(uri.clone(), doc.version, vec![edit]));
                CommandOutcome::None
            }
            _ => CommandOutcome::Candidates(candidates),
        }
    }

    async fn add_import(
        &mut self,
        uri: &Url,
        import: &ImportRequest,
        documents: &dyn Documents,
        client: &dyn Client,
    ) -> CommandOutcome {
        let (Some(port), Some(path)) = (self.port(), file_uri_to_path(uri)) else {
            return CommandOutcome::None;
        };
        let Some(doc) = open_document(uri, documents) else {
            return CommandOutcome::None;
        };

        match self.backend.add_import(port, &path, import).await {
            Ok(ImportOutcome::Lines(lines)) => {
                let edit = whole_document_edit(&doc, &lines);
                client.apply_edit(versioned_edit(uri.clone(), doc.version, vec![edit]));
                CommandOutcome::None
            }
            Ok(ImportOutcome::Ambiguous(candidates)) => {
                CommandOutcome::AmbiguousResolution(candidates)
            }
            Err(e) => {
                client.log(
                    Notice::Warning,
                    &format!("Adding import for {} failed: {e}", import.identifier),
                );
                CommandOutcome::None
            }
        }
    }
}

fn open_document(uri: &Url, documents: &dyn Documents) -> Option<DocumentSnapshot> {
    let doc = documents.snapshot(uri);
    if doc.is_none() {
        tracing::warn!(%uri, "Command targets a document that is not open");
    }
    doc
}

fn publish_path(client: &dyn Client, path: &Path, diagnostics: Vec<Diagnostic>) {
    match path_to_file_uri(path) {
        Ok(uri) => client.publish_diagnostics(uri, diagnostics, None),
        Err(e) => tracing::warn!("Skipping diagnostics publish: {e}"),
    }
}

/// Resolve every replacement against the same snapshot and send one edit.
fn apply_replacements(
    uri: &Url,
    replacements: &[Replacement],
    documents: &dyn Documents,
    client: &dyn Client,
) {
    let Some(doc) = open_document(uri, documents) else {
        return;
    };
    let mut resolved: Vec<TextEdit> = Vec::with_capacity(replacements.len());
    for replacement in replacements {
        let edit = edits::resolve(&doc.text, replacement);
        if !resolved.contains(&edit) {
            resolved.push(edit);
        }
    }
    if !resolved.is_empty() {
        client.apply_edit(versioned_edit(uri.clone(), doc.version, resolved));
    }
}

fn whole_document_edit(doc: &DocumentSnapshot, lines: &[String]) -> TextEdit {
    let mut new_text = lines.join("\n");
    if doc.text.ends_with('\n') {
        new_text.push('\n');
    }
    TextEdit {
        range: Range::new(Position::new(0, 0), text::end_position(&doc.text)),
        new_text,
    }
}

fn versioned_edit(uri: Url, version: i32, edits: Vec<TextEdit>) -> WorkspaceEdit {
    WorkspaceEdit {
        document_changes: Some(DocumentChanges::Edits(vec![TextDocumentEdit {
            text_document: OptionalVersionedTextDocumentIdentifier {
                uri,
                version: Some(version),
            },
            edits: edits.into_iter().map(OneOf::Left).collect(),
        }])),
        ..WorkspaceEdit::default()
    }
}
