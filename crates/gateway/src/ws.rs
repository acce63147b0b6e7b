//! WebSocket endpoint.
//!
//! Each connection gets a uuid, an unbounded outbound channel drained by a
//! writer task, and a read loop that decodes JSON frames into
//! [`ClientEvent`]s and dispatches them into the relay. Whatever ends the
//! connection (close frame, transport error, EOF) runs the relay's
//! disconnect pass.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use relay::{ClientEvent, Outbound, Relay, ServerEvent};

use crate::http::AppState;

/// Outbound handle over one connection's write channel.
///
/// Delivery is a channel send: never blocks, and a closed channel (client
/// went away mid-broadcast) is dropped silently — the disconnect pass
/// cleans the connection up.
#[derive(Clone)]
pub struct WsOutbound {
    tx: mpsc::UnboundedSender<Message>,
}

impl Outbound for WsOutbound {
    fn deliver(&self, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                let _ = self.tx.send(Message::Text(json));
            }
            Err(e) => warn!(error = %e, "failed to encode server event"),
        }
    }
}

/// `GET /ws` upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.relay))
}

async fn handle_socket(socket: WebSocket, relay: Relay<WsOutbound>) {
    let conn_id = Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    relay.connect(conn_id.clone(), WsOutbound { tx: tx.clone() });
    info!(conn_id = %conn_id, "websocket connected");

    // Writer task: drain the outbound channel into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => relay.handle(&conn_id, event),
                            Err(e) => {
                                debug!(conn_id = %conn_id, error = %e, "unparseable frame");
                                let error = ServerEvent::Error {
                                    message: format!("invalid message format: {e}"),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = tx.send(Message::Text(json));
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping/pong are answered by the transport layer.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
            _ = &mut send_task => break,
        }
    }

    relay.disconnect(&conn_id);
    send_task.abort();
    info!(conn_id = %conn_id, "websocket disconnected");
}
