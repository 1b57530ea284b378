use crate::document::DocumentRef;
use std::path::Path;

/// Documents rendered with the built-in compiler while the preview is open,
/// in the order they were first rendered.
///
/// Documents are identified by path, a path is tracked at most once.
#[derive(Debug, Default)]
pub struct TrackedDocuments {
    documents: Vec<DocumentRef>,
}

impl TrackedDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `document`, returns `false` if it was already tracked.
    pub fn insert(&mut self, document: DocumentRef) -> bool {
        if self.contains(document.path()) {
            return false;
        }
        self.documents.push(document);
        true
    }

    /// Stops tracking the document at `path`, returns `true` if it was tracked.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.documents.len();
        self.documents.retain(|document| document.path() != path);
        self.documents.len() != before
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.documents.iter().any(|document| document.path() == path)
    }

    /// The document the preview is pinned to.
    pub fn first(&self) -> Option<&DocumentRef> {
        self.documents.first()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }
}
