use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::Args;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use mjml_preview_core::{
    is_mjml_document, ContentResolver, DocumentRef, MemoryDocument, TrackedDocuments,
};
use preview_config::PreviewSettings;
use tokio_util::sync::CancellationToken;

/// Renders one MJML file the way the preview would show it.
#[derive(Parser, Debug, Clone)]
pub struct Render {
    /// MJML file to render.
    file: PathBuf,

    /// Script rendering the file instead of the built-in compiler, relative
    /// to the current directory.
    #[clap(long)]
    renderer_path: Option<String>,

    /// CSS color painted behind the page.
    #[clap(long)]
    background_color: Option<String>,
}

impl Render {
    fn settings(&self, mut settings: PreviewSettings) -> PreviewSettings {
        if let Some(renderer_path) = &self.renderer_path {
            settings.renderer_path.replace(renderer_path.clone());
        }
        if let Some(color) = &self.background_color {
            settings.preview_background_color.replace(color.clone());
        }
        settings
    }

    async fn render_html(&self, settings: &PreviewSettings) -> Result<String> {
        let path = self
            .file
            .canonicalize()
            .with_context(|| format!("{} not found", self.file.display()))?;
        let text = tokio::fs::read_to_string(&path).await?;

        let document: DocumentRef = Arc::new(MemoryDocument::new(path, None, text));
        if !is_mjml_document(document.as_ref()) {
            return Err(anyhow!("{} is not a MJML document", self.file.display()));
        }

        let workspace_root = std::env::current_dir().ok();
        let html = ContentResolver::default()
            .resolve(
                &mut TrackedDocuments::new(),
                document,
                settings,
                workspace_root.as_deref(),
                &CancellationToken::new(),
            )
            .await?;

        Ok(html)
    }

    pub async fn run(&self, args: Args) -> Result<()> {
        let (config, config_err) = preview_config::load_config_on_startup(args.config_file);
        if let Some(err) = config_err {
            eprintln!("Using the default config due to the malformed config file: {err}");
        }

        let settings = self.settings(config.preview.clone());
        let html = self.render_html(&settings).await?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(html.as_bytes())?;
        stdout.flush()?;

        Ok(())
    }
}
