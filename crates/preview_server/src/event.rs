//! Editor lifecycle events and their distribution.

use crate::host::SurfaceId;
use mjml_preview_core::DocumentRef;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Editor lifecycle event.
///
/// Events about a document carry the active document as it was when the
/// event happened, since the editor may have moved on by the time the event
/// is handled.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    DocumentOpened {
        document: DocumentRef,
        active: Option<DocumentRef>,
    },
    /// `None` when no editor has the focus.
    ActiveEditorChanged(Option<DocumentRef>),
    DocumentChanged {
        document: DocumentRef,
        active: Option<DocumentRef>,
    },
    DocumentSaved {
        document: DocumentRef,
        active: Option<DocumentRef>,
    },
    DocumentClosed(PathBuf),
    /// The user closed the preview panel.
    PreviewDisposed(SurfaceId),
}

/// Something editor events can be subscribed to.
pub trait EventSource: Send + Sync {
    fn subscribe(&self) -> Subscription;
}

type Subscribers = Mutex<HashMap<u64, UnboundedSender<EditorEvent>>>;

/// Receiving end of a subscription, unsubscribed on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: UnboundedReceiver<EditorEvent>,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Receives the next event, `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<EditorEvent> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.lock().remove(&self.id);
        }
    }
}

/// In-process [`EventSource`] delivering every published event to all the
/// subscribers in order.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Subscribers>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: EditorEvent) {
        tracing::trace!(?event, "Publishing editor event");
        self.subscribers
            .lock()
            .retain(|_, sender| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl EventSource for EventBus {
    fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (sender, receiver) = unbounded_channel();
        self.subscribers.lock().insert(id, sender);
        Subscription {
            id,
            receiver,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }
}
