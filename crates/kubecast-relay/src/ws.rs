//! WebSocket transport binding for the frame writer.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures::SinkExt;
use futures::stream::SplitSink;

use crate::sink::{MessageSink, SinkError};

/// Sink half of an upgraded connection.
pub type WsSink = SplitSink<WebSocket, Message>;

#[async_trait]
impl MessageSink for WsSink {
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), SinkError> {
        self.send(Message::Binary(payload.into()))
            .await
            .map_err(|e| SinkError::Send(e.to_string()))
    }

    async fn send_close(&mut self) -> Result<(), SinkError> {
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::default(),
        };
        self.send(Message::Close(Some(frame)))
            .await
            .map_err(|e| SinkError::Send(e.to_string()))
    }
}
