//! Editor capabilities the preview relies on.

use mjml_preview_core::{DocumentRef, TextDocument};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("failed to reach the editor: {0}")]
    Rpc(#[from] rpc::RpcError),
    #[error("preview surface {0} is already disposed")]
    Disposed(SurfaceId),
}

/// Identity of a preview surface.
///
/// Disposal notifications carry it so that a notification about a surface
/// that has been replaced since is not taken for the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Editor column a view is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewColumn {
    /// The first column.
    One,
    /// Next to the active editor.
    Beside,
}

/// The panel displaying the rendered HTML.
pub trait PreviewSurface: Debug + Send + Sync {
    fn id(&self) -> SurfaceId;

    /// Replaces the title and the displayed HTML.
    fn update(&self, title: &str, html: &str) -> Result<(), PreviewError>;

    /// Closes the panel.
    fn dispose(&self) -> Result<(), PreviewError>;
}

/// Window operations and editor state queried by the preview controller.
pub trait EditorHost: Send + Sync {
    /// Document of the focused editor.
    fn active_document(&self) -> Option<DocumentRef>;

    /// Root of the first workspace folder.
    fn workspace_root(&self) -> Option<PathBuf>;

    /// Opens a new preview panel beside the active editor.
    fn create_preview(&self, title: &str, html: &str)
        -> Result<Box<dyn PreviewSurface>, PreviewError>;

    /// Shows `document` in `column`, giving it the focus.
    fn show_document(
        &self,
        document: &dyn TextDocument,
        column: ViewColumn,
    ) -> Result<(), PreviewError>;

    fn show_error_message(&self, message: &str) -> Result<(), PreviewError>;
}

/// Title of the preview while `active` is the active document.
pub fn preview_title(active: &dyn TextDocument) -> String {
    format!("MJML Preview - {}", active.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mjml_preview_core::MemoryDocument;

    #[test]
    fn test_preview_title() {
        let document = MemoryDocument::new("/work/mail/welcome.mjml", None, String::new());
        assert_eq!(preview_title(&document), "MJML Preview - welcome.mjml");
    }

    #[test]
    fn test_view_column_serialization() {
        assert_eq!(
            serde_json::to_value(ViewColumn::Beside).unwrap(),
            serde_json::json!("beside")
        );
        assert_eq!(
            serde_json::to_value(ViewColumn::One).unwrap(),
            serde_json::json!("one")
        );
    }
}
