use super::documents::DocumentStore;
use crate::host::{EditorHost, PreviewError, PreviewSurface, SurfaceId, ViewColumn};
use mjml_preview_core::{DocumentRef, TextDocument};
use parking_lot::RwLock;
use rpc::RpcClient;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePreviewParams<'a> {
    id: SurfaceId,
    title: &'a str,
    html: &'a str,
    view_column: ViewColumn,
    retain_context_when_hidden: bool,
}

#[derive(Serialize)]
struct UpdatePreviewParams<'a> {
    id: SurfaceId,
    title: &'a str,
    html: &'a str,
}

#[derive(Serialize)]
struct DisposePreviewParams {
    id: SurfaceId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowTextDocumentParams<'a> {
    path: &'a Path,
    view_column: ViewColumn,
}

#[derive(Serialize)]
struct ShowMessageParams<'a> {
    message: &'a str,
}

/// [`EditorHost`] backed by the editor on the other side of the RPC channel.
#[derive(Debug)]
pub struct RpcEditor {
    rpc_client: RpcClient,
    documents: Arc<RwLock<DocumentStore>>,
    last_surface: AtomicU64,
}

impl RpcEditor {
    pub fn new(rpc_client: RpcClient, documents: Arc<RwLock<DocumentStore>>) -> Self {
        Self {
            rpc_client,
            documents,
            last_surface: AtomicU64::new(0),
        }
    }

    /// The most recently created surface.
    pub fn last_surface(&self) -> Option<SurfaceId> {
        match self.last_surface.load(Ordering::SeqCst) {
            0 => None,
            id => Some(SurfaceId(id)),
        }
    }
}

impl EditorHost for RpcEditor {
    fn active_document(&self) -> Option<DocumentRef> {
        self.documents.read().active()
    }

    fn workspace_root(&self) -> Option<PathBuf> {
        self.documents.read().workspace_root().map(Path::to_path_buf)
    }

    fn create_preview(
        &self,
        title: &str,
        html: &str,
    ) -> Result<Box<dyn PreviewSurface>, PreviewError> {
        let id = SurfaceId(self.last_surface.fetch_add(1, Ordering::SeqCst) + 1);

        self.rpc_client.notify(
            "preview/create",
            CreatePreviewParams {
                id,
                title,
                html,
                view_column: ViewColumn::Beside,
                retain_context_when_hidden: true,
            },
        )?;

        Ok(Box::new(RpcSurface {
            id,
            rpc_client: self.rpc_client.clone(),
            disposed: AtomicBool::new(false),
        }))
    }

    fn show_document(
        &self,
        document: &dyn TextDocument,
        column: ViewColumn,
    ) -> Result<(), PreviewError> {
        self.rpc_client.notify(
            "window/showTextDocument",
            ShowTextDocumentParams {
                path: document.path(),
                view_column: column,
            },
        )?;
        Ok(())
    }

    fn show_error_message(&self, message: &str) -> Result<(), PreviewError> {
        self.rpc_client
            .notify("window/showErrorMessage", ShowMessageParams { message })?;
        Ok(())
    }
}

#[derive(Debug)]
struct RpcSurface {
    id: SurfaceId,
    rpc_client: RpcClient,
    disposed: AtomicBool,
}

impl PreviewSurface for RpcSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn update(&self, title: &str, html: &str) -> Result<(), PreviewError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(PreviewError::Disposed(self.id));
        }
        self.rpc_client.notify(
            "preview/update",
            UpdatePreviewParams {
                id: self.id,
                title,
                html,
            },
        )?;
        Ok(())
    }

    fn dispose(&self) -> Result<(), PreviewError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Err(PreviewError::Disposed(self.id));
        }
        self.rpc_client
            .notify("preview/dispose", DisposePreviewParams { id: self.id })?;
        Ok(())
    }
}
