use std::process::ExitStatus;
use std::time::Duration;

/// Error type of external rendering.
///
/// Compile errors are not part of it: they are regular render output.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer process could not be started.
    #[error("failed to spawn renderer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while talking to the renderer process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode renderer payload: {0}")]
    EncodePayload(#[source] serde_json::Error),

    /// The renderer exited unsuccessfully.
    #[error("renderer exited with {status}: {stderr}")]
    ExitStatus { status: ExitStatus, stderr: String },

    /// The renderer output is not a `{ html, errors }` object.
    #[error("malformed renderer response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("renderer timed out after {0:?}")]
    Timeout(Duration),

    /// The render was superseded or the preview went away.
    #[error("render cancelled")]
    Cancelled,
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
