//! Dispatch of inbound LSP messages onto the session.
//!
//! One [`Server`] owns the session and the document store. Messages are
//! handled one at a time, each to completion.

use std::path::PathBuf;

use lsp_server::{ErrorCode, Message, Notification, Request, Response};
use lsp_types::notification::{
    DidChangeConfiguration, DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument,
    DidSaveTextDocument, Exit, Notification as LspNotification,
};
use lsp_types::request::{CodeActionRequest, ExecuteCommand, Request as LspRequest, Shutdown};
use lsp_types::{CodeActionOrCommand, CodeActionParams, ExecuteCommandParams};
use pursls_config::Settings;
use pursls_lsp::{IdeBackend, ServerCommand, Session};
use serde::de::DeserializeOwned;

use crate::client::LspClient;
use crate::documents::DocumentStore;

/// Whether the message loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Server<B> {
    session: Session<B>,
    documents: DocumentStore,
    client: LspClient,
    shutdown_requested: bool,
}

impl<B: IdeBackend> Server<B> {
    pub fn new(session: Session<B>, client: LspClient) -> Self {
        Self {
            session,
            documents: DocumentStore::default(),
            client,
            shutdown_requested: false,
        }
    }

    /// Start the daemon when the settings ask for it.
    pub async fn initialized(&mut self) {
        if self.session.settings().auto_start_psc_ide {
            self.session.start_ide(&self.client).await;
        } else {
            tracing::info!("Automatic IDE server start disabled");
        }
    }

    pub async fn handle(&mut self, message: Message) -> Flow {
        match message {
            Message::Request(request) => {
                let response = self.handle_request(request).await;
                self.client.send(Message::Response(response));
                Flow::Continue
            }
            Message::Response(response) => {
                if let Some(error) = response.error {
                    tracing::debug!(id = ?response.id, "Client rejected request: {}", error.message);
                }
                Flow::Continue
            }
            Message::Notification(notification) => self.handle_notification(notification).await,
        }
    }

    async fn handle_request(&mut self, request: Request) -> Response {
        let id = request.id.clone();
        if self.shutdown_requested {
            return Response::new_err(
                id,
                ErrorCode::InvalidRequest as i32,
                String::from("Shutdown already requested"),
            );
        }

        match request.method.as_str() {
            Shutdown::METHOD => {
                self.shutdown_requested = true;
                self.session.stop_ide(&self.client).await;
                Response::new_ok(id, ())
            }
            CodeActionRequest::METHOD => {
                let params: CodeActionParams = match cast(request.params) {
                    Ok(params) => params,
                    Err(e) => return invalid_params(id, &e),
                };
                let actions: Vec<CodeActionOrCommand> = self
                    .session
                    .code_actions(&params.text_document.uri, params.range)
                    .into_iter()
                    .map(CodeActionOrCommand::Command)
                    .collect();
                Response::new_ok(id, actions)
            }
            ExecuteCommand::METHOD => {
                let params: ExecuteCommandParams = match cast(request.params) {
                    Ok(params) => params,
                    Err(e) => return invalid_params(id, &e),
                };
                let Some(command) = ServerCommand::decode(&params.command, &params.arguments)
                else {
                    return Response::new_ok(id, ());
                };
                tracing::info!(command = command.name(), "Executing command");
                let outcome = self
                    .session
                    .execute_command(command, &self.documents, &self.client)
                    .await;
                Response::new_ok(id, outcome.into_json())
            }
            method => {
                tracing::debug!(method, "Unsupported request");
                Response::new_err(
                    id,
                    ErrorCode::MethodNotFound as i32,
                    format!("Unsupported request: {method}"),
                )
            }
        }
    }

    async fn handle_notification(&mut self, notification: Notification) -> Flow {
        let method = notification.method.as_str();
        if method == Exit::METHOD {
            return Flow::Exit;
        }

        let result = match method {
            DidOpenTextDocument::METHOD => self.did_open(notification.params).await,
            DidChangeTextDocument::METHOD => self.did_change(notification.params),
            DidSaveTextDocument::METHOD => self.did_save(notification.params).await,
            DidCloseTextDocument::METHOD => self.did_close(notification.params),
            DidChangeConfiguration::METHOD => self.did_change_configuration(notification.params),
            _ => {
                tracing::debug!(method, "Ignoring notification");
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!(method, "Malformed notification: {e}");
        }
        Flow::Continue
    }

    async fn did_open(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        let params: <DidOpenTextDocument as LspNotification>::Params = cast(params)?;
        let doc = params.text_document;
        self.documents.open(doc.uri.clone(), doc.version, doc.text);
        self.session.get_diagnostics(&doc.uri, &self.client).await;
        Ok(())
    }

    fn did_change(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        let params: <DidChangeTextDocument as LspNotification>::Params = cast(params)?;
        let uri = params.text_document.uri;
        self.documents
            .change(&uri, params.text_document.version, params.content_changes);
        self.session.on_did_change(&uri);
        Ok(())
    }

    async fn did_save(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        let params: <DidSaveTextDocument as LspNotification>::Params = cast(params)?;
        self.session
            .on_did_save(&params.text_document.uri, &self.client)
            .await;
        Ok(())
    }

    fn did_close(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        let params: <DidCloseTextDocument as LspNotification>::Params = cast(params)?;
        self.documents.close(&params.text_document.uri);
        Ok(())
    }

    fn did_change_configuration(
        &mut self,
        params: serde_json::Value,
    ) -> Result<(), serde_json::Error> {
        let params: <DidChangeConfiguration as LspNotification>::Params = cast(params)?;
        let root: Option<PathBuf> = self.session.root().map(PathBuf::from);
        let settings = Settings::resolve(Some(&params.settings), root.as_deref());
        tracing::info!("Configuration changed");
        self.session.set_settings(settings);
        Ok(())
    }
}

fn cast<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(params)
}

fn invalid_params(id: lsp_server::RequestId, error: &serde_json::Error) -> Response {
    Response::new_err(id, ErrorCode::InvalidParams as i32, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_server::RequestId;
    use pursls_lsp::PursIde;

    fn server() -> (Server<PursIde>, crossbeam_channel::Receiver<Message>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let session = Session::new(PursIde, Settings::default(), None);
        (Server::new(session, LspClient::new(tx)), rx)
    }

    fn request(id: i32, method: &str, params: serde_json::Value) -> Message {
        Message::Request(Request::new(RequestId::from(id), method.to_string(), params))
    }

    fn responses(rx: &crossbeam_channel::Receiver<Message>) -> Vec<Response> {
        rx.try_iter()
            .filter_map(|m| match m {
                Message::Response(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_code_actions_without_diagnostics_are_empty() {
        let (mut server, rx) = server();
        let params = serde_json::json!({
            "textDocument": { "uri": "file:///project/src/Main.purs" },
            "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 1, "character": 0 } },
            "context": { "diagnostics": [] }
        });

        let flow = server.handle(request(1, CodeActionRequest::METHOD, params)).await;

        assert_eq!(flow, Flow::Continue);
        let response = responses(&rx).remove(0);
        assert_eq!(response.result, Some(serde_json::json!([])));
    }

    #[tokio::test]
    async fn test_unknown_command_answers_null() {
        let (mut server, rx) = server();
        let params = serde_json::json!({ "command": "purescript.formatCode", "arguments": [] });

        server.handle(request(2, ExecuteCommand::METHOD, params)).await;

        let response = responses(&rx).remove(0);
        assert!(response.error.is_none());
        assert_eq!(response.result, Some(serde_json::Value::Null));
    }

    #[tokio::test]
    async fn test_unsupported_request_is_method_not_found() {
        let (mut server, rx) = server();

        server
            .handle(request(3, "textDocument/hover", serde_json::Value::Null))
            .await;

        let error = responses(&rx).remove(0).error.unwrap();
        assert_eq!(error.code, ErrorCode::MethodNotFound as i32);
    }

    #[tokio::test]
    async fn test_malformed_params_are_invalid() {
        let (mut server, rx) = server();

        server
            .handle(request(4, CodeActionRequest::METHOD, serde_json::json!({})))
            .await;

        let error = responses(&rx).remove(0).error.unwrap();
        assert_eq!(error.code, ErrorCode::InvalidParams as i32);
    }

    #[tokio::test]
    async fn test_shutdown_then_exit() {
        let (mut server, rx) = server();

        server
            .handle(request(5, Shutdown::METHOD, serde_json::Value::Null))
            .await;
        server
            .handle(request(6, CodeActionRequest::METHOD, serde_json::Value::Null))
            .await;
        let flow = server
            .handle(Message::Notification(Notification::new(
                Exit::METHOD.to_string(),
                serde_json::Value::Null,
            )))
            .await;

        let responses = responses(&rx);
        assert!(responses[0].error.is_none());
        assert_eq!(
            responses[1].error.as_ref().unwrap().code,
            ErrorCode::InvalidRequest as i32
        );
        assert_eq!(flow, Flow::Exit);
    }

    #[tokio::test]
    async fn test_change_updates_document_store() {
        let (mut server, _rx) = server();
        let uri = "file:///project/src/Main.purs";
        let open = serde_json::json!({
            "textDocument": { "uri": uri, "languageId": "purescript", "version": 1, "text": "x" }
        });
        let change = serde_json::json!({
            "textDocument": { "uri": uri, "version": 2 },
            "contentChanges": [{ "text": "y" }]
        });

        server
            .handle(Message::Notification(Notification::new(
                DidOpenTextDocument::METHOD.to_string(),
                open,
            )))
            .await;
        server
            .handle(Message::Notification(Notification::new(
                DidChangeTextDocument::METHOD.to_string(),
                change,
            )))
            .await;

        let doc = pursls_lsp::Documents::snapshot(&server.documents, &uri.parse().unwrap())
            .unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.text, "y");
    }
}
