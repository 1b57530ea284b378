//! Lifecycle of the preview surface.
//!
//! The controller owns all the preview state and runs as a single task,
//! handling editor events one at a time. External renders are the only work
//! done concurrently: each one runs in its own task and reports back to the
//! controller, which applies the result only if no newer render started in
//! the meantime.

use crate::event::{EditorEvent, Subscription};
use crate::host::{preview_title, EditorHost, PreviewSurface, SurfaceId, ViewColumn};
use mjml_preview_core::resolver::NOT_MJML_MESSAGE;
use mjml_preview_core::{
    is_mjml_document, ContentResolver, DocumentRef, RenderError, RenderPlan, RenderResult,
    Rendered, TrackedDocuments,
};
use preview_config::{ConfigSource, PreviewSettings};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Requests to the controller other than editor events.
#[derive(Debug)]
pub enum Command {
    /// Open the preview beside the active editor, replying whether the
    /// preview is open afterwards.
    PreviewToSide { reply: Option<oneshot::Sender<bool>> },
}

#[derive(Debug)]
enum PreviewState {
    Closed,
    Open(Box<dyn PreviewSurface>),
}

/// Result of an external render, sent back to the controller.
#[derive(Debug)]
struct RenderOutcome {
    generation: u64,
    surface: SurfaceId,
    title: String,
    document: DocumentRef,
    settings: PreviewSettings,
    result: Result<RenderResult, RenderError>,
}

pub struct PreviewController {
    host: Arc<dyn EditorHost>,
    config: Arc<dyn ConfigSource>,
    resolver: ContentResolver,
    tracked: TrackedDocuments,
    state: PreviewState,
    /// Bumped by every render, identifies the latest one.
    generation: u64,
    in_flight: Option<CancellationToken>,
    render_tx: UnboundedSender<RenderOutcome>,
    render_rx: UnboundedReceiver<RenderOutcome>,
}

impl PreviewController {
    pub fn new(
        host: Arc<dyn EditorHost>,
        config: Arc<dyn ConfigSource>,
        resolver: ContentResolver,
    ) -> Self {
        let (render_tx, render_rx) = unbounded_channel();
        Self {
            host,
            config,
            resolver,
            tracked: TrackedDocuments::new(),
            state: PreviewState::Closed,
            generation: 0,
            in_flight: None,
            render_tx,
            render_rx,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PreviewState::Open(_))
    }

    /// Processes events and commands until either channel closes.
    ///
    /// Pending editor events are always handled before a command so that a
    /// command sees the effect of the events sent before it.
    pub async fn run(
        mut self,
        mut subscription: Subscription,
        mut commands: UnboundedReceiver<Command>,
    ) {
        loop {
            tokio::select! {
                biased;
                maybe_event = subscription.recv() => match maybe_event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                maybe_command = commands.recv() => match maybe_command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(outcome) = self.render_rx.recv() => self.apply_render(outcome),
            }
        }

        self.cancel_in_flight();
        subscription.unsubscribe();
        tracing::debug!("Preview controller exited");
    }

    pub async fn handle_command(&mut self, command: Command) {
        match command {
            Command::PreviewToSide { reply } => {
                let opened = self.preview_to_side().await;
                if let Some(reply) = reply {
                    // The requester may have gone away.
                    let _ = reply.send(opened);
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: EditorEvent) {
        let PreviewState::Open(surface) = &self.state else {
            return;
        };

        let settings = self.config.preview_settings();

        match event {
            EditorEvent::DocumentOpened { document, active } => {
                if settings.auto_preview {
                    self.render(document, active);
                }
            }
            EditorEvent::ActiveEditorChanged(Some(document)) => {
                if settings.auto_preview {
                    self.render(document.clone(), Some(document));
                }
            }
            EditorEvent::ActiveEditorChanged(None) => {}
            EditorEvent::DocumentChanged { document, active } => {
                if settings.update_when_typing {
                    self.render(document, active);
                }
            }
            EditorEvent::DocumentSaved { document, active } => self.render(document, active),
            EditorEvent::DocumentClosed(path) => {
                self.tracked.remove(&path);
                if self.tracked.is_empty() && settings.auto_close_preview {
                    tracing::debug!(?path, "Last previewed document closed");
                    if let Err(err) = surface.dispose() {
                        tracing::error!(?err, "Failed to dispose the preview");
                    }
                    self.close();
                }
            }
            EditorEvent::PreviewDisposed(id) => {
                if surface.id() == id {
                    self.close();
                } else {
                    tracing::debug!(%id, current = %surface.id(), "Ignored stale dispose");
                }
            }
        }
    }

    async fn preview_to_side(&mut self) -> bool {
        let Some(active) = self.host.active_document() else {
            if let Err(err) = self.host.show_error_message(NOT_MJML_MESSAGE) {
                tracing::error!(?err, "Failed to show error message");
            }
            return false;
        };

        if self.is_open() {
            self.render(active.clone(), Some(active));
            return true;
        }

        if !is_mjml_document(active.as_ref()) {
            tracing::trace!(path = ?active.path(), "Not a MJML document, skipped");
            return false;
        }

        let settings = self.config.preview_settings();
        let title = preview_title(active.as_ref());
        let workspace_root = self.host.workspace_root();

        self.generation += 1;
        let html = match self.resolver.plan(
            &self.tracked,
            active.clone(),
            &settings,
            workspace_root.as_deref(),
        ) {
            RenderPlan::Builtin { document } => {
                self.resolver
                    .render_builtin(&mut self.tracked, &document, &settings)
            }
            RenderPlan::External {
                document,
                renderer,
                payload,
            } => match renderer.render(&payload, &CancellationToken::new()).await {
                Ok(result) => {
                    Rendered::from_result(result, document.path(), &settings).into_html()
                }
                Err(err) => {
                    tracing::error!(?err, path = ?document.path(), "External render failed");
                    return false;
                }
            },
        };

        match self.host.create_preview(&title, &html) {
            Ok(surface) => {
                tracing::debug!(id = %surface.id(), ?title, "Preview opened");
                self.state = PreviewState::Open(surface);
            }
            Err(err) => {
                tracing::error!(?err, "Failed to create the preview");
                self.tracked.clear();
                return false;
            }
        }

        if settings.preserve_focus {
            if let Err(err) = self.host.show_document(active.as_ref(), ViewColumn::One) {
                tracing::error!(?err, "Failed to give the focus back to the document");
            }
        }

        true
    }

    /// Re-renders the preview for `requested`, superseding any render in
    /// flight.
    ///
    /// `active` is the active document when the render was triggered, it
    /// gives the preview its title.
    fn render(&mut self, requested: DocumentRef, active: Option<DocumentRef>) {
        let PreviewState::Open(surface) = &self.state else {
            return;
        };
        let surface_id = surface.id();

        if !is_mjml_document(requested.as_ref()) {
            tracing::trace!(path = ?requested.path(), "Not a MJML document, skipped");
            return;
        }

        let Some(active) = active else {
            tracing::trace!("No active document, skipped");
            return;
        };

        let settings = self.config.preview_settings();
        let title = preview_title(active.as_ref());
        let workspace_root = self.host.workspace_root();

        self.cancel_in_flight();
        self.generation += 1;
        let generation = self.generation;

        match self
            .resolver
            .plan(&self.tracked, requested, &settings, workspace_root.as_deref())
        {
            RenderPlan::Builtin { document } => {
                let html = self
                    .resolver
                    .render_builtin(&mut self.tracked, &document, &settings);
                self.update_surface(&title, &html);
            }
            RenderPlan::External {
                document,
                renderer,
                payload,
            } => {
                let cancel = CancellationToken::new();
                self.in_flight.replace(cancel.clone());
                let render_tx = self.render_tx.clone();

                tracing::debug!(generation, path = ?document.path(), "Starting external render");

                tokio::spawn(async move {
                    let result = renderer.render(&payload, &cancel).await;
                    let outcome = RenderOutcome {
                        generation,
                        surface: surface_id,
                        title,
                        document,
                        settings,
                        result,
                    };
                    // The controller is gone when this fails.
                    let _ = render_tx.send(outcome);
                });
            }
        }
    }

    fn apply_render(&mut self, outcome: RenderOutcome) {
        let RenderOutcome {
            generation,
            surface,
            title,
            document,
            settings,
            result,
        } = outcome;

        if generation != self.generation {
            tracing::debug!(generation, latest = self.generation, "Dropped superseded render");
            return;
        }
        self.in_flight = None;

        match &self.state {
            PreviewState::Open(current) if current.id() == surface => {}
            _ => {
                tracing::debug!(generation, "Preview gone, render dropped");
                return;
            }
        }

        match result {
            Ok(result) => {
                let html = Rendered::from_result(result, document.path(), &settings).into_html();
                self.update_surface(&title, &html);
            }
            Err(err) if err.is_cancelled() => {
                tracing::debug!(generation, "External render cancelled");
            }
            Err(err) => {
                tracing::error!(generation, ?err, path = ?document.path(), "External render failed");
            }
        }
    }

    fn update_surface(&self, title: &str, html: &str) {
        if let PreviewState::Open(surface) = &self.state {
            if let Err(err) = surface.update(title, html) {
                tracing::error!(?err, "Failed to update the preview");
            }
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }
    }

    /// Back to `Closed`, dropping everything tied to the surface.
    fn close(&mut self) {
        self.cancel_in_flight();
        self.tracked.clear();
        if let PreviewState::Open(surface) = std::mem::replace(&mut self.state, PreviewState::Closed)
        {
            tracing::debug!(id = %surface.id(), "Preview closed");
        }
    }

    #[cfg(test)]
    fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    #[cfg(test)]
    fn is_tracked(&self, path: &std::path::Path) -> bool {
        self.tracked.contains(path)
    }
}
