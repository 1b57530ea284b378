//! Content resolution: which document to render, with which renderer, and
//! how the output is turned into the HTML shown in the preview.

use crate::background::set_background_color;
use crate::document::DocumentRef;
use crate::error::RenderError;
use crate::external::{ExternalRenderer, RendererPayload};
use crate::image_paths::fix_images;
use crate::render::output::RenderResult;
use crate::render::{format_errors, wrap_in_mjml_template, MarkupCompiler, MrmlCompiler};
use crate::tracked::TrackedDocuments;
use preview_config::PreviewSettings;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shown when there is nothing to display.
pub const NOT_MJML_MESSAGE: &str = "Active editor doesn't show a MJML document.";

/// Minimal page displaying `message`.
pub fn error_page(message: &str) -> String {
    format!("<body>{message}</body>")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Final output of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Post-processed HTML of the document.
    Page(String),
    /// Compile errors, one per paragraph.
    Errors(String),
    /// The renderer produced nothing.
    Fallback,
}

impl Rendered {
    /// Post-processes a render result of the document at `document_path`.
    pub fn from_result(
        result: RenderResult,
        document_path: &Path,
        settings: &PreviewSettings,
    ) -> Self {
        match result {
            RenderResult::Errors(errors) => Self::Errors(format_errors(&errors)),
            RenderResult::Html(html) if html.is_empty() => Self::Fallback,
            RenderResult::Html(html) => Self::Page(set_background_color(
                &fix_images(&html, document_path),
                settings.background_color(),
            )),
        }
    }

    pub fn into_html(self) -> String {
        match self {
            Self::Page(html) => html,
            Self::Errors(text) => format!("<body><pre>{}</pre></body>", escape_html(&text)),
            Self::Fallback => error_page(NOT_MJML_MESSAGE),
        }
    }
}

/// How a render request is going to be served.
#[derive(Debug, Clone)]
pub enum RenderPlan {
    /// Compile in process.
    Builtin { document: DocumentRef },
    /// Delegate to an external renderer process.
    External {
        document: DocumentRef,
        renderer: ExternalRenderer,
        payload: RendererPayload,
    },
}

impl RenderPlan {
    /// The document actually rendered, which may differ from the requested one.
    pub fn document(&self) -> &DocumentRef {
        match self {
            Self::Builtin { document } | Self::External { document, .. } => document,
        }
    }
}

/// Turns documents into preview HTML.
#[derive(Clone)]
pub struct ContentResolver {
    compiler: Arc<dyn MarkupCompiler>,
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver").finish_non_exhaustive()
    }
}

impl Default for ContentResolver {
    fn default() -> Self {
        Self::new(Arc::new(MrmlCompiler))
    }
}

impl ContentResolver {
    pub fn new(compiler: Arc<dyn MarkupCompiler>) -> Self {
        Self { compiler }
    }

    /// Decides which document to render and how.
    ///
    /// Unless `switch-on-separate-file-change` is on, the preview stays on the
    /// first tracked document whatever document is requested.
    pub fn plan(
        &self,
        tracked: &TrackedDocuments,
        requested: DocumentRef,
        settings: &PreviewSettings,
        workspace_root: Option<&Path>,
    ) -> RenderPlan {
        let document = if settings.switch_on_separate_file_change {
            requested
        } else {
            tracked.first().cloned().unwrap_or(requested)
        };

        match ExternalRenderer::from_settings(settings, workspace_root, document.path()) {
            Some(renderer) => RenderPlan::External {
                payload: RendererPayload::for_document(document.as_ref()),
                renderer,
                document,
            },
            None => RenderPlan::Builtin { document },
        }
    }

    /// Renders `document` with the built-in compiler.
    ///
    /// A document that compiles to a page starts being tracked.
    pub fn render_builtin(
        &self,
        tracked: &mut TrackedDocuments,
        document: &DocumentRef,
        settings: &PreviewSettings,
    ) -> String {
        let markup = wrap_in_mjml_template(&document.text());
        let result = self.compiler.compile(&markup, document.path());
        let rendered = Rendered::from_result(result, document.path(), settings);

        if matches!(rendered, Rendered::Page(_)) && tracked.insert(document.clone()) {
            tracing::debug!(path = ?document.path(), "Tracking document");
        }

        rendered.into_html()
    }

    /// Renders `requested` end to end, waiting for the external renderer if
    /// one is configured.
    pub async fn resolve(
        &self,
        tracked: &mut TrackedDocuments,
        requested: DocumentRef,
        settings: &PreviewSettings,
        workspace_root: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<String, RenderError> {
        match self.plan(tracked, requested, settings, workspace_root) {
            RenderPlan::Builtin { document } => {
                Ok(self.render_builtin(tracked, &document, settings))
            }
            RenderPlan::External {
                document,
                renderer,
                payload,
            } => {
                let result = renderer.render(&payload, cancel).await?;
                Ok(Rendered::from_result(result, document.path(), settings).into_html())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::render::output::CompileError;

    /// Compiler returning a canned result.
    struct StubCompiler(RenderResult);

    impl MarkupCompiler for StubCompiler {
        fn compile(&self, _markup: &str, _file_path: &Path) -> RenderResult {
            self.0.clone()
        }
    }

    fn resolver(result: RenderResult) -> ContentResolver {
        ContentResolver::new(Arc::new(StubCompiler(result)))
    }

    fn doc(path: &str, text: &str) -> DocumentRef {
        Arc::new(MemoryDocument::new(path, Some("mjml".into()), text.into()))
    }

    #[test]
    fn test_pinned_to_first_tracked_document() {
        let resolver = ContentResolver::default();
        let mut tracked = TrackedDocuments::new();
        tracked.insert(doc("/tmp/first.mjml", ""));

        let settings = PreviewSettings {
            switch_on_separate_file_change: false,
            ..Default::default()
        };
        let plan = resolver.plan(&tracked, doc("/tmp/second.mjml", ""), &settings, None);
        assert_eq!(plan.document().path(), Path::new("/tmp/first.mjml"));

        let settings = PreviewSettings::default();
        let plan = resolver.plan(&tracked, doc("/tmp/second.mjml", ""), &settings, None);
        assert_eq!(plan.document().path(), Path::new("/tmp/second.mjml"));
    }

    #[test]
    fn test_pinned_document_text_is_rendered() {
        let resolver = ContentResolver::default();
        let mut tracked = TrackedDocuments::new();
        let settings = PreviewSettings {
            switch_on_separate_file_change: false,
            ..Default::default()
        };

        let first = doc(
            "/tmp/first.mjml",
            "<mj-section><mj-column><mj-text>First</mj-text></mj-column></mj-section>",
        );
        let html = resolver.render_builtin(&mut tracked, &first, &settings);
        assert!(html.contains("First"));

        let second = doc(
            "/tmp/second.mjml",
            "<mj-section><mj-column><mj-text>Second</mj-text></mj-column></mj-section>",
        );
        let plan = resolver.plan(&tracked, second, &settings, None);
        let html = resolver.render_builtin(&mut tracked, plan.document(), &settings);
        assert!(html.contains("First"));
        assert!(!html.contains("Second"));
        assert_eq!(tracked.len(), 1);
    }

    #[test]
    fn test_builtin_render_tracks_document() {
        let resolver = resolver(RenderResult::Html("<p>ok</p>".into()));
        let mut tracked = TrackedDocuments::new();
        let document = doc("/tmp/a.mjml", "");
        let settings = PreviewSettings::default();

        assert_eq!(
            resolver.render_builtin(&mut tracked, &document, &settings),
            "<p>ok</p>"
        );
        resolver.render_builtin(&mut tracked, &document, &settings);
        assert_eq!(tracked.len(), 1);
    }

    #[test]
    fn test_fallback_message() {
        let resolver = resolver(RenderResult::Html(String::new()));
        let mut tracked = TrackedDocuments::new();
        let html = resolver.render_builtin(
            &mut tracked,
            &doc("/tmp/a.mjml", ""),
            &PreviewSettings::default(),
        );
        assert_eq!(
            html,
            "<body>Active editor doesn't show a MJML document.</body>"
        );
        assert!(tracked.is_empty());
    }

    #[test]
    fn test_errors_shown_inline() {
        let resolver = resolver(RenderResult::Errors(vec![
            CompileError {
                formatted_message: Some("first \"a\" & 'b'".into()),
                ..Default::default()
            },
            CompileError {
                line: Some(7),
                tag_name: Some("mj-column".into()),
                ..Default::default()
            },
        ]));
        let mut tracked = TrackedDocuments::new();
        let html = resolver.render_builtin(
            &mut tracked,
            &doc("/tmp/a.mjml", ""),
            &PreviewSettings::default(),
        );
        assert_eq!(
            html,
            "<body><pre>first \"a\" &amp; 'b'\n\nAn error occurred on line 7:&lt;mj-column&gt;</pre></body>"
        );
        assert!(tracked.is_empty());
    }

    #[test]
    fn test_page_post_processing() {
        let resolver = resolver(RenderResult::Html(
            r#"<html><head></head><body><img src="logo.png"></body></html>"#.into(),
        ));
        let settings = PreviewSettings {
            preview_background_color: Some("#fff".into()),
            ..Default::default()
        };
        let html = resolver.render_builtin(
            &mut TrackedDocuments::new(),
            &doc("/work/mail/a.mjml", ""),
            &settings,
        );
        assert!(html.contains("<head>\n<style>\n  html, body { background-color: #fff; }"));
        if cfg!(unix) {
            assert!(html.contains(r#"<img src="/work/mail/logo.png">"#));
        }
    }

    #[test]
    fn test_builtin_compiles_fragment() {
        let resolver = ContentResolver::default();
        let mut tracked = TrackedDocuments::new();
        let html = resolver.render_builtin(
            &mut tracked,
            &doc(
                "/tmp/fragment.mjml",
                "<mj-section><mj-column><mj-text>Fragment</mj-text></mj-column></mj-section>",
            ),
            &PreviewSettings::default(),
        );
        assert!(html.contains("Fragment"));
        assert_eq!(tracked.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_external_renderer_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("render.sh");
        std::fs::write(
            &script,
            "cat > /dev/null\nprintf '%s' '{\"html\":\"<p>ok</p>\",\"errors\":[]}'\n",
        )
        .unwrap();

        let settings = PreviewSettings {
            renderer_path: Some(script.display().to_string()),
            renderer_runtime: "sh".into(),
            ..Default::default()
        };
        let resolver = ContentResolver::default();
        let mut tracked = TrackedDocuments::new();
        let document = doc("/work/mail/a.mjml", "<mjml></mjml>");

        let html = resolver
            .resolve(
                &mut tracked,
                document,
                &settings,
                Some(dir.path()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(html, fix_images("<p>ok</p>", Path::new("/work/mail/a.mjml")));
        assert!(tracked.is_empty());
    }

    #[test]
    fn test_external_plan() {
        let settings = PreviewSettings {
            renderer_path: Some("render.js".into()),
            ..Default::default()
        };
        let plan = ContentResolver::default().plan(
            &TrackedDocuments::new(),
            doc("/work/mail/a.mjml", "<mj-text>Hi</mj-text>"),
            &settings,
            Some(Path::new("/work")),
        );
        match plan {
            RenderPlan::External {
                renderer, payload, ..
            } => {
                assert_eq!(renderer.script(), Path::new("/work/render.js"));
                assert_eq!(payload.content, "<mj-text>Hi</mj-text>");
            }
            RenderPlan::Builtin { .. } => panic!("expected an external render"),
        }
    }
}
