//! The preview service on top of stdio JSON-RPC.

mod documents;
mod editor;
mod input;

use self::documents::DocumentStore;
use self::editor::RpcEditor;
use self::input::Notification;
use crate::controller::{Command, PreviewController};
use crate::event::{EditorEvent, EventBus, EventSource};
use mjml_preview_core::ContentResolver;
use parking_lot::RwLock;
use preview_config::{ConfigSource, GlobalConfig};
use rpc::{EditorMessage, RpcClient, RpcNotification, RpcRequest};
use serde_json::json;
use std::io::{BufReader, BufWriter};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Starts and keeps running the server on top of stdio until the editor
/// exits.
pub async fn start(config_error: Option<String>) {
    let (message_tx, message_rx) = unbounded_channel();

    let rpc_client = RpcClient::new(
        BufReader::new(std::io::stdin()),
        BufWriter::new(std::io::stdout()),
        message_tx,
    );

    let (service, controller) = Service::new(rpc_client.clone(), Arc::new(GlobalConfig));

    if let Some(err) = config_error {
        let message = format!("Using default config due to the malformed config file: {err}");
        if let Err(err) = rpc_client.notify("window/showErrorMessage", json!({ "message": message }))
        {
            tracing::error!(?err, "Failed to report config error");
        }
    }

    let (config_tx, mut config_rx) = tokio::sync::mpsc::channel(1);
    preview_config::monitor::watch(config_tx);
    tokio::spawn(async move {
        while config_rx.recv().await.is_some() {
            tracing::info!("Config file reloaded");
        }
    });

    service.run(message_rx).await;

    if let Err(err) = controller.await {
        tracing::error!(?err, "Preview controller panicked");
    }
}

/// Translates editor messages into document updates, editor events and
/// controller commands.
struct Service {
    rpc_client: RpcClient,
    documents: Arc<RwLock<DocumentStore>>,
    editor: Arc<RpcEditor>,
    bus: EventBus,
    command_tx: UnboundedSender<Command>,
}

impl Service {
    /// Creates the service and spawns the preview controller, which stops
    /// once the service is dropped.
    fn new(rpc_client: RpcClient, config: Arc<dyn ConfigSource>) -> (Self, JoinHandle<()>) {
        let documents = Arc::new(RwLock::new(DocumentStore::new()));
        let editor = Arc::new(RpcEditor::new(rpc_client.clone(), documents.clone()));
        let bus = EventBus::new();
        let (command_tx, command_rx) = unbounded_channel();

        let controller = PreviewController::new(editor.clone(), config, ContentResolver::default());
        let controller = tokio::spawn(controller.run(bus.subscribe(), command_rx));

        let service = Self {
            rpc_client,
            documents,
            editor,
            bus,
            command_tx,
        };

        (service, controller)
    }

    async fn run(self, mut message_rx: UnboundedReceiver<EditorMessage>) {
        while let Some(message) = message_rx.recv().await {
            match message {
                EditorMessage::Request(request) => self.process_request(request).await,
                EditorMessage::Notification(notification) => {
                    if self.process_notification(notification).await.is_break() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Editor channel closed, exiting");
    }

    /// Asks the controller to open the preview and waits for the outcome.
    async fn preview_to_side(&self) -> bool {
        let (reply, opened) = oneshot::channel();
        if self
            .command_tx
            .send(Command::PreviewToSide { reply: Some(reply) })
            .is_err()
        {
            tracing::error!("Preview controller is gone");
            return false;
        }
        opened.await.unwrap_or(false)
    }

    async fn process_request(&self, request: RpcRequest) {
        let RpcRequest { id, method, .. } = request;

        let result = match method.as_str() {
            "mjml/previewToSide" => Ok(json!({ "opened": self.preview_to_side().await })),
            _ => Err(rpc::Error::method_not_found(&method)),
        };

        if let Err(err) = self.rpc_client.send_response(id, result) {
            tracing::error!(?err, %method, "Failed to send response");
        }
    }

    async fn process_notification(&self, notification: RpcNotification) -> ControlFlow<()> {
        let method = notification.method.clone();

        let notification = match Notification::try_from(notification) {
            Ok(notification) => notification,
            Err(err) => {
                tracing::error!(?err, %method, "Invalid notification params");
                return ControlFlow::Continue(());
            }
        };

        tracing::trace!(?notification, "<= Editor");

        match notification {
            Notification::DidOpen(params) => {
                let event = {
                    let mut documents = self.documents.write();
                    let document = documents.open(params.path, params.language_id, params.text);
                    EditorEvent::DocumentOpened {
                        document,
                        active: documents.active(),
                    }
                };
                self.bus.publish(event);
            }
            Notification::DidChange(params) => {
                let event = {
                    let mut documents = self.documents.write();
                    let document = documents.change(params.path, params.text);
                    EditorEvent::DocumentChanged {
                        document,
                        active: documents.active(),
                    }
                };
                self.bus.publish(event);
            }
            Notification::DidSave(params) => {
                let path = params.path.clone();
                let event = {
                    let mut documents = self.documents.write();
                    documents
                        .save(params.path, params.text)
                        .map(|document| EditorEvent::DocumentSaved {
                            document,
                            active: documents.active(),
                        })
                };
                match event {
                    Some(event) => self.bus.publish(event),
                    None => tracing::debug!(?path, "Saved document unknown, skipped"),
                }
            }
            Notification::DidClose(params) => {
                self.documents.write().close(&params.path);
                self.bus.publish(EditorEvent::DocumentClosed(params.path));
            }
            Notification::DidChangeActiveEditor(params) => {
                let document = self.documents.write().set_active(params.path);
                self.bus.publish(EditorEvent::ActiveEditorChanged(document));
            }
            Notification::DidChangeConfiguration(params) => {
                tracing::debug!(settings = ?params.settings, "Editor settings updated");
                preview_config::update_preview_settings(params.settings);
            }
            Notification::DidChangeWorkspaceFolders(params) => {
                self.documents.write().set_workspace_root(params.root);
            }
            Notification::PreviewDidDispose(params) => {
                match params.id.or_else(|| self.editor.last_surface()) {
                    Some(id) => self.bus.publish(EditorEvent::PreviewDisposed(id)),
                    None => tracing::debug!("No preview was ever created, dispose ignored"),
                }
            }
            Notification::PreviewToSide => {
                self.preview_to_side().await;
            }
            Notification::Exit => return ControlFlow::Break(()),
            Notification::Other(method) => {
                tracing::debug!(%method, "Unhandled notification");
            }
        }

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preview_config::PreviewSettings;
    use rpc::{Id, Params, RpcMessage, RpcResponse};
    use serde_json::Value;

    struct DefaultSettings;

    impl ConfigSource for DefaultSettings {
        fn preview_settings(&self) -> PreviewSettings {
            PreviewSettings::default()
        }
    }

    fn notification(method: &str, params: Value) -> EditorMessage {
        EditorMessage::Notification(RpcNotification {
            jsonrpc: None,
            method: method.into(),
            params: Params::try_from(params).unwrap(),
        })
    }

    fn request(id: u64, method: &str) -> EditorMessage {
        EditorMessage::Request(RpcRequest {
            jsonrpc: None,
            id: Id::Num(id),
            method: method.into(),
            params: Params::None,
        })
    }

    /// Runs the service over `messages`, returns everything sent to the
    /// editor.
    async fn serve(messages: Vec<EditorMessage>) -> Vec<RpcMessage> {
        let (rpc_client, mut outgoing) = RpcClient::channel();
        let (service, controller) = Service::new(rpc_client, Arc::new(DefaultSettings));

        let (message_tx, message_rx) = unbounded_channel();
        for message in messages {
            message_tx.send(message).unwrap();
        }
        drop(message_tx);

        service.run(message_rx).await;
        controller.await.unwrap();

        let mut sent = Vec::new();
        while let Ok(message) = outgoing.try_recv() {
            sent.push(message);
        }
        sent
    }

    fn method_of(message: &RpcMessage) -> &str {
        match message {
            RpcMessage::Notification(notification) => &notification.method,
            RpcMessage::Request(request) => &request.method,
            RpcMessage::Response(_) => "response",
        }
    }

    #[tokio::test]
    async fn test_open_edit_and_close() {
        let sent = serve(vec![
            notification(
                "textDocument/didOpen",
                json!({"path": "/work/a.mjml", "languageId": "mjml", "text": "<mj-raw><p>a</p></mj-raw>"}),
            ),
            notification("window/didChangeActiveEditor", json!({"path": "/work/a.mjml"})),
            request(1, "mjml/previewToSide"),
            notification(
                "textDocument/didChange",
                json!({"path": "/work/a.mjml", "text": "<mj-raw><p>edited</p></mj-raw>"}),
            ),
            notification("textDocument/didClose", json!({"path": "/work/a.mjml"})),
            notification("exit", Value::Null),
        ])
        .await;

        let methods: Vec<_> = sent.iter().map(method_of).collect();
        assert_eq!(
            methods,
            [
                "preview/create",
                "window/showTextDocument",
                "response",
                "preview/update",
                "preview/dispose",
            ]
        );

        match &sent[2] {
            RpcMessage::Response(RpcResponse::Success(success)) => {
                assert_eq!(success.id, Id::Num(1));
                assert_eq!(success.result, json!({"opened": true}));
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let RpcMessage::Notification(update) = &sent[3] else {
            panic!("expected a notification");
        };
        let params = Value::from(update.params.clone());
        assert_eq!(params["title"], "MJML Preview - a.mjml");
        assert!(params["html"].as_str().unwrap().contains("edited"));
    }

    #[tokio::test]
    async fn test_edit_then_focus_lost() {
        let sent = serve(vec![
            notification(
                "textDocument/didOpen",
                json!({"path": "/work/a.mjml", "text": "<mj-raw><p>a</p></mj-raw>"}),
            ),
            notification("window/didChangeActiveEditor", json!({"path": "/work/a.mjml"})),
            request(1, "mjml/previewToSide"),
            notification(
                "textDocument/didChange",
                json!({"path": "/work/a.mjml", "text": "<mj-raw><p>typed</p></mj-raw>"}),
            ),
            notification("window/didChangeActiveEditor", json!({"path": null})),
        ])
        .await;

        let updates: Vec<_> = sent
            .iter()
            .filter_map(|message| match message {
                RpcMessage::Notification(n) if n.method == "preview/update" => {
                    Some(Value::from(n.params.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0]["title"], "MJML Preview - a.mjml");
        assert!(updates[0]["html"].as_str().unwrap().contains("typed"));
    }

    #[tokio::test]
    async fn test_preview_without_active_editor() {
        let sent = serve(vec![request(7, "mjml/previewToSide")]).await;

        assert_eq!(sent.len(), 2);
        let RpcMessage::Notification(error) = &sent[0] else {
            panic!("expected a notification");
        };
        assert_eq!(error.method, "window/showErrorMessage");
        assert_eq!(
            Value::from(error.params.clone()),
            json!({"message": "Active editor doesn't show a MJML document."})
        );

        assert!(matches!(
            &sent[1],
            RpcMessage::Response(RpcResponse::Success(success)) if success.result == json!({"opened": false})
        ));
    }

    #[tokio::test]
    async fn test_unknown_request() {
        let sent = serve(vec![request(3, "mjml/unknown")]).await;
        match &sent[..] {
            [RpcMessage::Response(RpcResponse::Failure(failure))] => {
                assert_eq!(failure.id, Id::Num(3));
                assert_eq!(failure.error.code, rpc::ErrorCode::MethodNotFound);
            }
            other => panic!("unexpected messages: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispose_from_editor() {
        let sent = serve(vec![
            notification(
                "textDocument/didOpen",
                json!({"path": "/work/a.mjml", "text": "<mj-raw><p>a</p></mj-raw>"}),
            ),
            notification("window/didChangeActiveEditor", json!({"path": "/work/a.mjml"})),
            notification("mjml/previewToSide", Value::Null),
            notification("preview/didDispose", Value::Null),
            notification("textDocument/didSave", json!({"path": "/work/a.mjml"})),
            notification("mjml/previewToSide", Value::Null),
        ])
        .await;

        let creates = sent
            .iter()
            .filter(|message| method_of(message) == "preview/create")
            .count();
        let updates = sent
            .iter()
            .filter(|message| method_of(message) == "preview/update")
            .count();
        assert_eq!(creates, 2);
        assert_eq!(updates, 0);
    }
}
