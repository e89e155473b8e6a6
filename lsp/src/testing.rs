//! Scripted collaborators for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lsp_types::{Diagnostic, Url, WorkspaceEdit};
use pursls_config::Settings;
use pursls_types::PscResult;

use crate::error::IdeError;
use crate::protocol::{ImportOutcome, ImportRequest};
use crate::server::{IdeBackend, ServerHandle};
use crate::types::{Candidate, Client, DocumentSnapshot, Documents, Notice};

#[derive(Default)]
struct BackendState {
    cwd_failures_left: usize,
    fail_spawn: bool,
    exit_after_polls: Option<usize>,
    cwd_calls: usize,
    load_calls: usize,
    list_calls: usize,
    spawned_ports: Vec<u16>,
    rebuilds: Vec<PathBuf>,
    codegens: Vec<Option<Vec<String>>>,
    rebuild_result: Option<PscResult>,
    loaded_modules: Vec<String>,
    import_outcome: Option<ImportOutcome>,
    imports: Vec<ImportRequest>,
    completions: Vec<Candidate>,
    searches: Vec<String>,
}

/// An IDE backend answering from a script instead of a daemon.
pub(crate) struct FakeBackend {
    root: PathBuf,
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub const PORT: u16 = 15_123;

    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            state: Mutex::new(BackendState::default()),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut BackendState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn fail_cwd_times(&self, n: usize) {
        self.with(|s| s.cwd_failures_left = n);
    }

    pub fn fail_spawn(&self) {
        self.with(|s| s.fail_spawn = true);
    }

    /// Spawned daemons pass `polls` exit checks and then report that they exited.
    pub fn exit_after_polls(&self, polls: usize) {
        self.with(|s| s.exit_after_polls = Some(polls));
    }

    pub fn set_rebuild_result(&self, result: PscResult) {
        self.with(|s| s.rebuild_result = Some(result));
    }

    pub fn set_loaded_modules(&self, modules: &[&str]) {
        self.with(|s| s.loaded_modules = modules.iter().map(ToString::to_string).collect());
    }

    pub fn set_import_outcome(&self, outcome: ImportOutcome) {
        self.with(|s| s.import_outcome = Some(outcome));
    }

    pub fn set_completions(&self, completions: Vec<Candidate>) {
        self.with(|s| s.completions = completions);
    }

    pub fn cwd_calls(&self) -> usize {
        self.with(|s| s.cwd_calls)
    }

    pub fn load_calls(&self) -> usize {
        self.with(|s| s.load_calls)
    }

    pub fn list_calls(&self) -> usize {
        self.with(|s| s.list_calls)
    }

    pub fn spawn_calls(&self) -> usize {
        self.with(|s| s.spawned_ports.len())
    }

    pub fn spawned_ports(&self) -> Vec<u16> {
        self.with(|s| s.spawned_ports.clone())
    }

    pub fn rebuilds(&self) -> Vec<PathBuf> {
        self.with(|s| s.rebuilds.clone())
    }

    pub fn codegens(&self) -> Vec<Option<Vec<String>>> {
        self.with(|s| s.codegens.clone())
    }

    pub fn imports(&self) -> Vec<ImportRequest> {
        self.with(|s| s.imports.clone())
    }

    pub fn searches(&self) -> Vec<String> {
        self.with(|s| s.searches.clone())
    }
}

fn refused() -> IdeError {
    IdeError::Transport(anyhow::anyhow!("connection refused"))
}

impl IdeBackend for FakeBackend {
    fn spawn(&self, _: &Settings, _: &Path, port: u16) -> Result<ServerHandle, IdeError> {
        self.with(|s| {
            if s.fail_spawn {
                return Err(IdeError::Spawn {
                    program: String::from("purs"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            s.spawned_ports.push(port);
            Ok(match s.exit_after_polls {
                Some(polls) => ServerHandle::exiting_after(port, polls, "exit status: 1"),
                None => ServerHandle::external(port),
            })
        })
    }

    fn pick_port(&self) -> Result<u16, IdeError> {
        Ok(Self::PORT)
    }

    async fn cwd(&self, _: u16) -> Result<String, IdeError> {
        self.with(|s| {
            s.cwd_calls += 1;
            if s.cwd_failures_left > 0 {
                s.cwd_failures_left -= 1;
                Err(refused())
            } else {
                Ok(self.root.to_string_lossy().into_owned())
            }
        })
    }

    async fn load(&self, _: u16) -> Result<String, IdeError> {
        self.with(|s| {
            s.load_calls += 1;
            Ok(String::from("Loaded 3 modules and 0 failed"))
        })
    }

    async fn rebuild(
        &self,
        _: u16,
        file: &Path,
        codegen: Option<&[String]>,
    ) -> Result<PscResult, IdeError> {
        self.with(|s| {
            s.rebuilds.push(file.to_path_buf());
            s.codegens.push(codegen.map(<[String]>::to_vec));
            s.rebuild_result.clone().ok_or_else(refused)
        })
    }

    async fn loaded_modules(&self, _: u16) -> Result<Vec<String>, IdeError> {
        self.with(|s| {
            s.list_calls += 1;
            Ok(s.loaded_modules.clone())
        })
    }

    async fn add_import(
        &self,
        _: u16,
        _: &Path,
        request: &ImportRequest,
    ) -> Result<ImportOutcome, IdeError> {
        self.with(|s| {
            s.imports.push(request.clone());
            s.import_outcome
                .clone()
                .ok_or_else(|| IdeError::Command(String::from("no import scripted")))
        })
    }

    async fn complete(
        &self,
        _: u16,
        search: &str,
        _: Option<&str>,
    ) -> Result<Vec<Candidate>, IdeError> {
        self.with(|s| {
            s.searches.push(search.to_string());
            Ok(s.completions.clone())
        })
    }
}

/// A client that records everything sent to the editor.
#[derive(Default)]
pub(crate) struct RecordingClient {
    published: Mutex<Vec<(Url, Vec<Diagnostic>)>>,
    notices: Mutex<Vec<(Notice, String)>>,
    edits: Mutex<Vec<WorkspaceEdit>>,
}

impl RecordingClient {
    pub fn published(&self) -> Vec<(Url, Vec<Diagnostic>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn notices_at(&self, level: Notice) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn edits(&self) -> Vec<WorkspaceEdit> {
        self.edits.lock().unwrap().clone()
    }
}

impl Client for RecordingClient {
    fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, _: Option<i32>) {
        self.published.lock().unwrap().push((uri, diagnostics));
    }

    fn log(&self, level: Notice, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }

    fn apply_edit(&self, edit: WorkspaceEdit) {
        self.edits.lock().unwrap().push(edit);
    }
}

#[derive(Default)]
pub(crate) struct FakeDocuments {
    docs: HashMap<Url, DocumentSnapshot>,
}

impl FakeDocuments {
    pub fn with(mut self, uri: &Url, version: i32, text: &str) -> Self {
        self.docs
            .insert(uri.clone(), DocumentSnapshot::new(version, text));
        self
    }
}

impl Documents for FakeDocuments {
    fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot> {
        self.docs.get(uri).cloned()
    }
}
