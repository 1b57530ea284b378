//! JSON-RPC over stdio between the editor plugin and the preview backend.

mod client;
mod jsonrpc;

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

pub use self::client::{EditorMessage, RpcClient};
pub use self::jsonrpc::{
    Error, ErrorCode, Failure, Id, Params, RpcMessage, RpcNotification, RpcRequest, RpcResponse,
    Success, Version,
};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to send raw message: {0}")]
    SendRawMessage(#[from] SendError<RpcMessage>),
    #[error("failed to forward editor message: {0}")]
    ForwardMessage(#[from] SendError<EditorMessage>),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    JsonRpc(#[from] Error),
}
