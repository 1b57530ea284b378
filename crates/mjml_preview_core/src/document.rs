//! Text documents and document kind detection.
//!
//! Documents are owned by the editor. The preview only keeps references to
//! them and reads their text when rendering, so a [`DocumentRef`] always sees
//! the latest edits.

use parking_lot::RwLock;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An editor buffer.
pub trait TextDocument: Debug + Send + Sync {
    /// File path, also the identity of the document.
    fn path(&self) -> &Path;

    /// Language id reported by the editor, if any.
    fn language_id(&self) -> Option<String>;

    /// Current text of the buffer.
    fn text(&self) -> String;

    /// Base name of the file, used in the preview title.
    fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub type DocumentRef = Arc<dyn TextDocument>;

/// Document kinds the preview knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Mjml,
}

impl DocumentKind {
    /// All supported document kinds.
    pub const ALL: &'static [DocumentKind] = &[Self::Mjml];

    /// Detect document kind from an editor language id.
    ///
    /// # Examples
    ///
    /// ```
    /// use mjml_preview_core::DocumentKind;
    ///
    /// assert_eq!(DocumentKind::from_language_id("mjml"), Some(DocumentKind::Mjml));
    /// assert_eq!(DocumentKind::from_language_id("html"), None);
    /// ```
    pub fn from_language_id(language_id: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|kind| kind.language_id() == language_id)
            .copied()
    }

    /// Detect document kind from file extension (case-insensitive).
    ///
    /// Returns `None` for unknown extensions or empty input.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.is_empty() {
            return None;
        }
        let ext_lower = ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|kind| kind.extensions().iter().any(|e| *e == ext_lower))
            .copied()
    }

    /// Detect document kind from file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Detect the kind of an editor document.
    ///
    /// The language id wins when the editor reports one, so that a `.mjml`
    /// file the user switched to another language is not rendered. Without a
    /// language id the file extension decides.
    pub fn detect(document: &dyn TextDocument) -> Option<Self> {
        match document.language_id().as_deref() {
            Some(language_id) if !language_id.is_empty() => Self::from_language_id(language_id),
            _ => Self::from_path(document.path()),
        }
    }

    pub fn language_id(&self) -> &'static str {
        match self {
            Self::Mjml => "mjml",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Mjml => &["mjml"],
        }
    }
}

/// Returns `true` if the document can be previewed.
pub fn is_mjml_document(document: &dyn TextDocument) -> bool {
    DocumentKind::detect(document) == Some(DocumentKind::Mjml)
}

/// A document whose text lives in memory and is replaced on every edit.
#[derive(Debug)]
pub struct MemoryDocument {
    path: PathBuf,
    language_id: RwLock<Option<String>>,
    text: RwLock<String>,
}

impl MemoryDocument {
    pub fn new(path: impl Into<PathBuf>, language_id: Option<String>, text: String) -> Self {
        Self {
            path: path.into(),
            language_id: RwLock::new(language_id),
            text: RwLock::new(text),
        }
    }

    pub fn set_text(&self, text: String) {
        *self.text.write() = text;
    }

    /// The editor may switch the language of an open buffer.
    pub fn set_language_id(&self, language_id: Option<String>) {
        *self.language_id.write() = language_id;
    }
}

impl TextDocument for MemoryDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn language_id(&self) -> Option<String> {
        self.language_id.read().clone()
    }

    fn text(&self) -> String {
        self.text.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, language_id: Option<&str>) -> MemoryDocument {
        MemoryDocument::new(path, language_id.map(String::from), String::new())
    }

    #[test]
    fn test_from_extension_case_insensitive() {
        assert_eq!(DocumentKind::from_extension("mjml"), Some(DocumentKind::Mjml));
        assert_eq!(DocumentKind::from_extension("MJML"), Some(DocumentKind::Mjml));
        assert_eq!(DocumentKind::from_extension("html"), None);
        assert_eq!(DocumentKind::from_extension(""), None);
    }

    #[test]
    fn test_detect_prefers_language_id() {
        assert!(is_mjml_document(&doc("/tmp/a.mjml", Some("mjml"))));
        assert!(is_mjml_document(&doc("/tmp/untitled", Some("mjml"))));
        assert!(!is_mjml_document(&doc("/tmp/a.mjml", Some("xml"))));
        assert!(is_mjml_document(&doc("/tmp/a.mjml", None)));
        assert!(is_mjml_document(&doc("/tmp/a.mjml", Some(""))));
        assert!(!is_mjml_document(&doc("/tmp/a.html", None)));
    }

    #[test]
    fn test_text_is_live() {
        let document = doc("/tmp/a.mjml", None);
        document.set_text("<mjml></mjml>".into());
        assert_eq!(document.text(), "<mjml></mjml>");
        assert_eq!(document.file_name(), "a.mjml");
    }

    #[test]
    fn test_language_switch() {
        let document = doc("/tmp/a.mjml", Some("mjml"));
        document.set_language_id(Some("html".into()));
        assert_eq!(document.language_id().as_deref(), Some("html"));
        assert!(!is_mjml_document(&document));

        document.set_language_id(None);
        assert!(is_mjml_document(&document));
    }
}
