use crate::{
    Error, Failure, Id, Params, RpcError, RpcMessage, RpcNotification, RpcRequest, RpcResponse,
    Success, Version,
};
use serde::Serialize;
use std::io::{BufRead, Write};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// RPC message originated from the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorMessage {
    Request(RpcRequest),
    Notification(RpcNotification),
}

impl EditorMessage {
    pub fn method(&self) -> &str {
        match self {
            Self::Request(request) => &request.method,
            Self::Notification(notification) => &notification.method,
        }
    }
}

/// RPC client talking to the editor.
///
/// Messages are sent without waiting, a dedicated task writes them out in
/// order.
#[derive(Debug, Clone)]
pub struct RpcClient {
    writer_sender: UnboundedSender<RpcMessage>,
}

impl RpcClient {
    /// Creates a new instance of [`RpcClient`].
    ///
    /// Messages read from `reader` are forwarded to `sink`, which is dropped
    /// once the reader reaches EOF.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        reader: impl BufRead + Send + 'static,
        writer: impl Write + Send + 'static,
        sink: UnboundedSender<EditorMessage>,
    ) -> Self {
        if let Err(error) = std::thread::Builder::new()
            .name("stdio-reader".to_string())
            .spawn(move || {
                if let Err(error) = loop_read(reader, &sink) {
                    tracing::error!(?error, "Thread stdio-reader exited");
                }
            })
        {
            tracing::error!(?error, "Failed to spawn thread stdio-reader");
        }

        let (writer_sender, io_writer_receiver) = unbounded_channel();
        tokio::spawn(async move {
            if let Err(error) = loop_write(writer, io_writer_receiver).await {
                tracing::error!(?error, "Task stdio-writer exited");
            }
        });

        Self { writer_sender }
    }

    /// Creates a client whose outgoing messages are delivered to the returned
    /// receiver instead of being written out.
    pub fn channel() -> (Self, UnboundedReceiver<RpcMessage>) {
        let (writer_sender, receiver) = unbounded_channel();
        (Self { writer_sender }, receiver)
    }

    /// Sends a notification message to the editor.
    pub fn notify(&self, method: impl AsRef<str>, params: impl Serialize) -> Result<(), RpcError> {
        let notification = RpcNotification {
            jsonrpc: Some(Version::V2),
            method: method.as_ref().to_owned(),
            params: Params::try_from(serde_json::to_value(params)?)?,
        };

        self.writer_sender
            .send(RpcMessage::Notification(notification))?;

        Ok(())
    }

    /// Sends the response of a request initiated from the editor.
    pub fn send_response(
        &self,
        id: Id,
        output_result: Result<impl Serialize, Error>,
    ) -> Result<(), RpcError> {
        let rpc_response = match output_result {
            Ok(ok) => RpcResponse::Success(Success {
                jsonrpc: Some(Version::V2),
                id,
                result: serde_json::to_value(ok)?,
            }),
            Err(error) => RpcResponse::Failure(Failure {
                jsonrpc: Some(Version::V2),
                id,
                error,
            }),
        };

        self.writer_sender
            .send(RpcMessage::Response(rpc_response))?;

        Ok(())
    }
}

/// Returns `true` for lines carrying no message, blank lines and framing
/// headers of editors sending `Content-length` framed messages.
fn is_framing_line(line: &str) -> bool {
    line.is_empty()
        || line
            .get(..15)
            .is_some_and(|header| header.eq_ignore_ascii_case("content-length:"))
}

/// Keep reading and dispatching the messages from stdin until EOF.
fn loop_read(mut reader: impl BufRead, sink: &UnboundedSender<EditorMessage>) -> Result<(), RpcError> {
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            tracing::debug!("EOF reached");
            return Ok(());
        }

        let trimmed = line.trim();
        if is_framing_line(trimmed) {
            continue;
        }

        match serde_json::from_str::<RpcMessage>(trimmed) {
            Ok(RpcMessage::Request(request)) => sink.send(EditorMessage::Request(request))?,
            Ok(RpcMessage::Notification(notification)) => {
                sink.send(EditorMessage::Notification(notification))?
            }
            Ok(RpcMessage::Response(response)) => {
                tracing::debug!(id = %response.id(), "Ignored unexpected response");
            }
            Err(error) => {
                tracing::error!(?error, line = trimmed, "Invalid raw editor message");
            }
        }
    }
}

/// Keep writing the messages from the backend to the editor via stdout.
async fn loop_write(
    mut writer: impl Write,
    mut io_writer_receiver: UnboundedReceiver<RpcMessage>,
) -> Result<(), RpcError> {
    while let Some(msg) = io_writer_receiver.recv().await {
        write_message(&mut writer, &msg)?;
    }

    Ok(())
}

fn write_message(writer: &mut impl Write, msg: &RpcMessage) -> Result<(), RpcError> {
    let s = serde_json::to_string(msg)?;

    if s.len() < 128 {
        tracing::trace!(?msg, "=> Editor");
    } else {
        let msg_size = s.len();
        match msg {
            RpcMessage::Notification(notification) => {
                tracing::trace!(method = ?notification.method, msg_size, "=> Editor Notification")
            }
            RpcMessage::Response(response) => {
                tracing::trace!(id = %response.id(), msg_size, "=> Editor Response")
            }
            RpcMessage::Request(request) => {
                tracing::trace!(method = ?request.method, msg_size, "=> Editor Request")
            }
        }
    }

    // The trailing line ending lets line-based readers pick the message up.
    write!(writer, "Content-length: {}\n\n{}\n", s.len(), s)?;
    writer.flush()?;

    Ok(())
}
