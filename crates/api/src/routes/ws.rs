//! WebSocket transport for the sync engine.
//!
//! Each socket gets one reader loop, which feeds frames to the engine in
//! arrival order, and one writer task, which drains the connection's
//! outbound channel onto the socket.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use sync::{Connection, SyncError};

use crate::AppState;

/// GET /ws: upgrades to a WebSocket bound to a new connection.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(socket: WebSocket, state: Arc<AppState>) {
    let engine = &state.engine;
    let Connection { id, mut outbound } = engine.open().await;
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, event = event.kind(), "failed to encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // The writer ends early when the hub drops a stalled connection; stop
    // reading then too.
    let writer_finished = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => engine.handle_text(id, text.as_str()).await,
                Some(Ok(Message::Binary(_))) => {
                    let err =
                        SyncError::MalformedMessage("binary frames are not supported".to_string());
                    engine.reject(id, &err).await;
                }
                Some(Ok(Message::Close(_))) | None => break false,
                // ping and pong are answered by axum
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(connection_id = %id, error = %err, "socket read failed");
                    break false;
                }
            },
            _ = &mut writer => break true,
        }
    };

    // Detaching drops the outbound sender, which ends the writer.
    engine.detach(id).await;
    if !writer_finished && let Err(err) = writer.await {
        tracing::warn!(connection_id = %id, error = %err, "writer task failed");
    }
    tracing::debug!(connection_id = %id, "connection closed");
}
