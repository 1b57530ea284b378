//! Render output types.
//!
//! [`RenderResult`] is what both the built-in compiler and external renderers
//! produce: either the compiled HTML or the errors that prevented it.

use serde::{Deserialize, Serialize};

/// Structured compile error, as reported by the compiler or an external
/// renderer. Every field is optional because renderers are free to omit any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileError {
    pub line: Option<u32>,
    pub message: Option<String>,
    pub tag_name: Option<String>,
    pub formatted_message: Option<String>,
}

impl CompileError {
    /// Creates an error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Outcome of rendering one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    /// Compiled HTML, possibly empty.
    Html(String),
    /// At least one error, in the order the renderer reported them.
    Errors(Vec<CompileError>),
}

impl RenderResult {
    /// Builds a result from the `{ html, errors }` pair, errors taking
    /// precedence over the HTML.
    pub fn from_parts(html: String, errors: Vec<CompileError>) -> Self {
        if errors.is_empty() {
            Self::Html(html)
        } else {
            Self::Errors(errors)
        }
    }
}

/// JSON object an external renderer writes to its stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct RendererResponse {
    pub html: String,
    #[serde(default)]
    pub errors: Vec<CompileError>,
}

impl From<RendererResponse> for RenderResult {
    fn from(response: RendererResponse) -> Self {
        Self::from_parts(response.html, response.errors)
    }
}
