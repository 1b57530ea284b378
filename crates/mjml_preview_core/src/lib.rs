//! Core library of the MJML live preview.
//!
//! Everything needed to turn an MJML document into the HTML displayed by the
//! preview, independently of the editor driving it.
//!
//! # Modules
//!
//! - [`document`] - Editor documents and MJML detection
//! - [`render`] - MJML compilation with the built-in compiler
//! - [`external`] - User-supplied renderer processes
//! - [`resolver`] - Choice of the document and renderer, output post-processing
//! - [`image_paths`] - Relative image sources rewritten to absolute paths
//! - [`background`] - Preview background color injection
//! - [`tracked`] - Documents the preview has rendered

pub mod background;
pub mod common;
pub mod document;
pub mod error;
pub mod external;
pub mod image_paths;
pub mod render;
pub mod resolver;
pub mod tracked;

pub use document::{is_mjml_document, DocumentKind, DocumentRef, MemoryDocument, TextDocument};
pub use error::RenderError;
pub use external::{ExternalRenderer, RendererPayload};
pub use render::output::{CompileError, RenderResult};
pub use render::{MarkupCompiler, MrmlCompiler};
pub use resolver::{error_page, ContentResolver, RenderPlan, Rendered, NOT_MJML_MESSAGE};
pub use tracked::TrackedDocuments;
