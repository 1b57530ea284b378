//! MJML to HTML compilation.
//!
//! The built-in compiler is [`mrml`]. It sits behind the [`MarkupCompiler`]
//! trait so that the preview can be driven by any other compiler.

mod diagnostics;
pub mod output;

use self::output::{CompileError, RenderResult};
use std::path::Path;

pub use self::diagnostics::{format_errors, UNKNOWN_ERROR_MESSAGE};

/// Root tag of a complete MJML document.
pub const ROOT_TAG: &str = "<mjml";

/// Compiles MJML markup to HTML.
pub trait MarkupCompiler: Send + Sync {
    /// Compiles `markup`, `file_path` being the location of the document the
    /// markup comes from.
    ///
    /// Compilers never fail as a whole, problems are reported as
    /// [`RenderResult::Errors`].
    fn compile(&self, markup: &str, file_path: &Path) -> RenderResult;
}

/// The built-in compiler, backed by `mrml`.
///
/// Validation is skipped: only errors preventing the compilation are
/// reported. `mj-include` is not resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct MrmlCompiler;

impl MarkupCompiler for MrmlCompiler {
    fn compile(&self, markup: &str, file_path: &Path) -> RenderResult {
        let parsed = match mrml::parse(markup) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(?file_path, ?err, "Failed to parse MJML");
                return RenderResult::Errors(vec![CompileError::message(err.to_string())]);
            }
        };

        let options = mrml::prelude::render::RenderOptions::default();
        match parsed.element.render(&options) {
            Ok(html) => RenderResult::Html(html),
            Err(err) => {
                tracing::debug!(?file_path, ?err, "Failed to render MJML");
                RenderResult::Errors(vec![CompileError::message(err.to_string())])
            }
        }
    }
}

/// Wraps a body-only fragment into a complete document.
///
/// Text already starting with the root tag, ignoring surrounding whitespace,
/// is returned unchanged.
///
/// # Example
///
/// ```
/// use mjml_preview_core::render::wrap_in_mjml_template;
///
/// assert_eq!(
///     wrap_in_mjml_template("<mj-section></mj-section>"),
///     "<mjml><mj-body><mj-section></mj-section></mj-body></mjml>"
/// );
/// ```
pub fn wrap_in_mjml_template(document_text: &str) -> String {
    if document_text.trim().starts_with(ROOT_TAG) {
        return document_text.to_string();
    }

    format!("<mjml><mj-body>{document_text}</mj-body></mjml>")
}
