//! [`Client`] implementation that writes LSP messages to the connection.

use std::sync::atomic::{AtomicI32, Ordering};

use crossbeam_channel::Sender;
use lsp_server::{Message, Notification, Request, RequestId};
use lsp_types::notification::{
    LogMessage, Notification as LspNotification, PublishDiagnostics, ShowMessage,
};
use lsp_types::request::{ApplyWorkspaceEdit, Request as LspRequest};
use lsp_types::{
    ApplyWorkspaceEditParams, Diagnostic, LogMessageParams, MessageType, PublishDiagnosticsParams,
    ShowMessageParams, Url, WorkspaceEdit,
};
use pursls_lsp::{Client, Notice};

pub struct LspClient {
    sender: Sender<Message>,
    next_id: AtomicI32,
}

impl LspClient {
    pub fn new(sender: Sender<Message>) -> Self {
        Self {
            sender,
            next_id: AtomicI32::new(1),
        }
    }

    pub fn send(&self, message: Message) {
        if let Err(e) = self.sender.send(message) {
            tracing::warn!("Connection closed, dropping message: {e}");
        }
    }

    fn notify<N: LspNotification>(&self, params: N::Params) {
        self.send(Message::Notification(Notification::new(
            N::METHOD.to_string(),
            params,
        )));
    }
}

fn message_type(level: Notice) -> MessageType {
    match level {
        Notice::Success | Notice::Info => MessageType::INFO,
        Notice::Warning => MessageType::WARNING,
        Notice::Error => MessageType::ERROR,
    }
}

impl Client for LspClient {
    fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        tracing::debug!(%uri, count = diagnostics.len(), "Publishing diagnostics");
        self.notify::<PublishDiagnostics>(PublishDiagnosticsParams {
            uri,
            diagnostics,
            version,
        });
    }

    fn log(&self, level: Notice, message: &str) {
        let typ = message_type(level);
        self.notify::<LogMessage>(LogMessageParams {
            typ,
            message: message.to_string(),
        });
        if level.is_error() {
            self.notify::<ShowMessage>(ShowMessageParams {
                typ,
                message: message.to_string(),
            });
        }
    }

    fn apply_edit(&self, edit: WorkspaceEdit) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(
            RequestId::from(format!("pursls/{id}")),
            ApplyWorkspaceEdit::METHOD.to_string(),
            ApplyWorkspaceEditParams { label: None, edit },
        );
        self.send(Message::Request(request));
    }
}
