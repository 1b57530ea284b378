use crate::host::SurfaceId;
use preview_config::PreviewSettings;
use rpc::RpcNotification;
use serde::Deserialize;
use std::path::PathBuf;

/// Methods the editor may call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    DidOpen,
    DidChange,
    DidSave,
    DidClose,
    DidChangeActiveEditor,
    DidChangeConfiguration,
    DidChangeWorkspaceFolders,
    PreviewDidDispose,
    PreviewToSide,
    Exit,
    Other(String),
}

impl Method {
    pub fn from_method(method: &str) -> Self {
        match method {
            "textDocument/didOpen" => Self::DidOpen,
            "textDocument/didChange" => Self::DidChange,
            "textDocument/didSave" => Self::DidSave,
            "textDocument/didClose" => Self::DidClose,
            "window/didChangeActiveEditor" => Self::DidChangeActiveEditor,
            "workspace/didChangeConfiguration" => Self::DidChangeConfiguration,
            "workspace/didChangeWorkspaceFolders" => Self::DidChangeWorkspaceFolders,
            "preview/didDispose" => Self::PreviewDidDispose,
            "mjml/previewToSide" => Self::PreviewToSide,
            "exit" => Self::Exit,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenParams {
    pub path: PathBuf,
    #[serde(default)]
    pub language_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DidChangeParams {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DidSaveParams {
    pub path: PathBuf,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DidCloseParams {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActiveEditorParams {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigurationParams {
    pub settings: PreviewSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceFoldersParams {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DidDisposeParams {
    #[serde(default)]
    pub id: Option<SurfaceId>,
}

/// Editor notification with its params decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DidOpen(DidOpenParams),
    DidChange(DidChangeParams),
    DidSave(DidSaveParams),
    DidClose(DidCloseParams),
    DidChangeActiveEditor(ActiveEditorParams),
    DidChangeConfiguration(ConfigurationParams),
    DidChangeWorkspaceFolders(WorkspaceFoldersParams),
    PreviewDidDispose(DidDisposeParams),
    PreviewToSide,
    Exit,
    Other(String),
}

impl TryFrom<RpcNotification> for Notification {
    type Error = rpc::Error;

    fn try_from(notification: RpcNotification) -> Result<Self, Self::Error> {
        let RpcNotification { method, params, .. } = notification;

        let notification = match Method::from_method(&method) {
            Method::DidOpen => Self::DidOpen(params.parse()?),
            Method::DidChange => Self::DidChange(params.parse()?),
            Method::DidSave => Self::DidSave(params.parse()?),
            Method::DidClose => Self::DidClose(params.parse()?),
            Method::DidChangeActiveEditor => Self::DidChangeActiveEditor(params.parse()?),
            Method::DidChangeConfiguration => Self::DidChangeConfiguration(params.parse()?),
            Method::DidChangeWorkspaceFolders => Self::DidChangeWorkspaceFolders(params.parse()?),
            Method::PreviewDidDispose => Self::PreviewDidDispose(params.parse()?),
            Method::PreviewToSide => Self::PreviewToSide,
            Method::Exit => Self::Exit,
            Method::Other(other) => Self::Other(other),
        };

        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc::Params;
    use serde_json::json;

    fn notification(method: &str, params: serde_json::Value) -> RpcNotification {
        RpcNotification {
            jsonrpc: None,
            method: method.into(),
            params: Params::try_from(params).unwrap(),
        }
    }

    #[test]
    fn test_decode_document_notifications() {
        assert_eq!(
            Notification::try_from(notification(
                "textDocument/didOpen",
                json!({"path": "/a.mjml", "languageId": "mjml", "text": "<mjml></mjml>"}),
            ))
            .unwrap(),
            Notification::DidOpen(DidOpenParams {
                path: "/a.mjml".into(),
                language_id: Some("mjml".into()),
                text: "<mjml></mjml>".into(),
            })
        );

        assert_eq!(
            Notification::try_from(notification(
                "textDocument/didSave",
                json!({"path": "/a.mjml"})
            ))
            .unwrap(),
            Notification::DidSave(DidSaveParams {
                path: "/a.mjml".into(),
                text: None,
            })
        );

        let err = Notification::try_from(notification(
            "textDocument/didChange",
            json!({"path": "/a.mjml"}),
        ))
        .unwrap_err();
        assert_eq!(err.code, rpc::ErrorCode::InvalidParams);
    }

    #[test]
    fn test_decode_without_params() {
        assert_eq!(
            Notification::try_from(notification("window/didChangeActiveEditor", json!(null)))
                .unwrap(),
            Notification::DidChangeActiveEditor(ActiveEditorParams { path: None })
        );
        assert_eq!(
            Notification::try_from(notification("preview/didDispose", json!(null))).unwrap(),
            Notification::PreviewDidDispose(DidDisposeParams { id: None })
        );
        assert_eq!(
            Notification::try_from(notification("mjml/previewToSide", json!(null))).unwrap(),
            Notification::PreviewToSide
        );
        assert_eq!(
            Notification::try_from(notification("$/cancelRequest", json!({"id": 1}))).unwrap(),
            Notification::Other("$/cancelRequest".into())
        );
    }

    #[test]
    fn test_decode_configuration() {
        let Notification::DidChangeConfiguration(ConfigurationParams { settings }) =
            Notification::try_from(notification(
                "workspace/didChangeConfiguration",
                json!({"settings": {"autoPreview": true, "rendererPath": "render.js"}}),
            ))
            .unwrap()
        else {
            panic!("expected a configuration change");
        };
        assert!(settings.auto_preview);
        assert_eq!(settings.renderer_path.as_deref(), Some("render.js"));
    }
}
