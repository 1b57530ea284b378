use mjml_preview_core::{DocumentRef, MemoryDocument, TextDocument};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mirror of the editor state: open documents, active editor and workspace.
///
/// A document keeps its identity for as long as it is open, so that
/// references held by the preview see every edit.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<PathBuf, Arc<MemoryDocument>>,
    active: Option<PathBuf>,
    workspace_root: Option<PathBuf>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, path: PathBuf, language_id: Option<String>, text: String) -> DocumentRef {
        if let Some(document) = self.documents.get(&path) {
            document.set_language_id(language_id);
            document.set_text(text);
            return document.clone();
        }

        let document = Arc::new(MemoryDocument::new(path.clone(), language_id, text));
        self.documents.insert(path, document.clone());
        document
    }

    /// Updates the text of the document at `path`, opening it if unknown.
    pub fn change(&mut self, path: PathBuf, text: String) -> DocumentRef {
        if let Some(document) = self.documents.get(&path) {
            document.set_text(text);
            return document.clone();
        }
        self.open(path, None, text)
    }

    /// Returns the saved document, `None` if it is neither known nor given
    /// with its text.
    pub fn save(&mut self, path: PathBuf, text: Option<String>) -> Option<DocumentRef> {
        match text {
            Some(text) => Some(self.change(path, text)),
            None => self.get(&path),
        }
    }

    pub fn close(&mut self, path: &Path) -> bool {
        self.documents.remove(path).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<DocumentRef> {
        self.documents
            .get(path)
            .map(|document| document.clone() as DocumentRef)
    }

    /// Sets the active editor, returns its document if known.
    pub fn set_active(&mut self, path: Option<PathBuf>) -> Option<DocumentRef> {
        self.active = path;
        self.active()
    }

    pub fn active(&self) -> Option<DocumentRef> {
        self.active.as_deref().and_then(|path| self.get(path))
    }

    pub fn set_workspace_root(&mut self, root: Option<PathBuf>) {
        self.workspace_root = root;
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }
}
