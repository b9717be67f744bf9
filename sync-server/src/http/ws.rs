//! WebSocket change-event channel.
//!
//! Subscribers connect to `/api/events` and receive every [`ChangeEvent`]
//! as a JSON text frame. Delivery is fire-and-forget: a slow subscriber is
//! lagged past, never allowed to block mutations.

use crate::server::ClubServer;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;
use std::sync::Arc;
use tokio::sync::broadcast;

/// `GET /api/events` - upgrade to the change-event stream.
pub async fn events_handler(
    ws: WebSocketUpgrade,
    Extension(server): Extension<Arc<ClubServer>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_events_socket(socket, server))
}

/// Forward broadcast events to one subscriber until either side closes.
async fn handle_events_socket(mut socket: WebSocket, server: Arc<ClubServer>) {
    let mut events = server.subscribe();
    let connected = server.ws_client_connected();
    tracing::debug!("events subscriber connected ({} total)", connected);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let frame = match serde_json::to_string(&event) {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::error!("failed to serialize change event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(frame)).await.is_err() {
                            break; // Subscriber disconnected
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("events subscriber lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        // Respond to ping with pong
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(_)) => break,
                    _ => {} // Ignore other messages
                }
            }
        }
    }

    let remaining = server.ws_client_disconnected();
    tracing::debug!("events subscriber disconnected ({} remain)", remaining);
}
