//! Live preview of MJML documents for editors.
//!
//! The [`controller`] drives a single preview surface from editor events. It
//! only knows the editor through the traits of [`host`] and [`event`], which
//! [`stdio_server`] implements on top of JSON-RPC messages exchanged with an
//! editor plugin over stdio.

pub mod controller;
pub mod event;
pub mod host;
pub mod stdio_server;

pub use self::controller::{Command, PreviewController};
pub use self::event::{EditorEvent, EventBus, EventSource, Subscription};
pub use self::host::{EditorHost, PreviewError, PreviewSurface, SurfaceId, ViewColumn};
