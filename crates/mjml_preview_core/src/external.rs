//! External renderer bridge.
//!
//! A user-supplied script can replace the built-in compiler. It is invoked as
//! `<runtime> <script> <payload>` with the same JSON payload written to its
//! stdin, and must print a single `{ html, errors }` object to stdout.

use crate::common::mjmlconfig::find_mjmlconfig_dir;
use crate::document::TextDocument;
use crate::error::RenderError;
use crate::render::output::{RenderResult, RendererResponse};
use preview_config::PreviewSettings;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Where the renderer should look for `.mjmlconfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MjmlConfigPath {
    /// Directory holding the closest `.mjmlconfig`.
    Dir(PathBuf),
    /// No config file around the document, serialized as `"skip"`.
    Skip,
}

impl MjmlConfigPath {
    pub fn lookup(document_path: &Path) -> Self {
        find_mjmlconfig_dir(document_path).map_or(Self::Skip, Self::Dir)
    }
}

impl Serialize for MjmlConfigPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Dir(dir) => dir.serialize(serializer),
            Self::Skip => serializer.serialize_str("skip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererOptions {
    pub mjml_config_path: MjmlConfigPath,
}

/// JSON payload handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererPayload {
    /// Directory of the document.
    pub directory: PathBuf,
    /// Raw document text, fragments are not wrapped.
    pub content: String,
    pub file_path: PathBuf,
    pub options: RendererOptions,
}

impl RendererPayload {
    pub fn for_document(document: &dyn TextDocument) -> Self {
        let file_path = document.path().to_path_buf();
        Self {
            directory: file_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            content: document.text(),
            options: RendererOptions {
                mjml_config_path: MjmlConfigPath::lookup(&file_path),
            },
            file_path,
        }
    }
}

/// A configured external renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRenderer {
    runtime: String,
    script: PathBuf,
    timeout: Duration,
}

impl ExternalRenderer {
    pub fn new(runtime: impl Into<String>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            runtime: runtime.into(),
            script: script.into(),
            timeout,
        }
    }

    /// Returns the renderer configured in `settings`, if any.
    ///
    /// A relative `renderer-path` is resolved against the workspace root, or
    /// against the directory of the document when the editor has no
    /// workspace open.
    pub fn from_settings(
        settings: &PreviewSettings,
        workspace_root: Option<&Path>,
        document_path: &Path,
    ) -> Option<Self> {
        let renderer_path = settings.renderer_path.as_deref()?;
        let base_dir = workspace_root
            .or_else(|| document_path.parent())
            .unwrap_or_else(|| Path::new(""));

        Some(Self::new(
            settings.renderer_runtime.clone(),
            base_dir.join(renderer_path),
            settings.renderer_timeout(),
        ))
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Runs the renderer on `payload`.
    ///
    /// The process is killed when `cancel` fires or the timeout elapses.
    pub async fn render(
        &self,
        payload: &RendererPayload,
        cancel: &CancellationToken,
    ) -> Result<RenderResult, RenderError> {
        let payload = serde_json::to_string(payload).map_err(RenderError::EncodePayload)?;

        tracing::debug!(
            runtime = %self.runtime,
            script = ?self.script,
            payload_size = payload.len(),
            "Running external renderer"
        );

        let mut child = Command::new(&self.runtime)
            .arg(&self.script)
            .arg(&payload)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.runtime.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let feed_stdin = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(payload.as_bytes()).await,
                None => Ok(()),
            }
        };

        let run = async move {
            let (fed, output) = tokio::join!(feed_stdin, child.wait_with_output());
            // Renderers are free to ignore their stdin.
            if let Err(err) = fed {
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    tracing::debug!(?err, "Failed to write the renderer stdin");
                }
            }
            output
        };

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RenderError::Cancelled),
            output = tokio::time::timeout(self.timeout, run) => {
                output.map_err(|_| RenderError::Timeout(self.timeout))??
            }
        };

        if !output.status.success() {
            return Err(RenderError::ExitStatus {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let response: RendererResponse =
            serde_json::from_slice(&output.stdout).map_err(RenderError::MalformedResponse)?;

        Ok(response.into())
    }
}
