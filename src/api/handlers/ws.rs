use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;

use crate::bus::BusEvent;
use crate::AppState;

pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Frame sent to dashboard clients: `{"topic": ..., "payload": ...}`.
pub fn encode_frame(event: &BusEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    tracing::info!("Dashboard WebSocket client connected");

    let mut rx = state.bus.subscribe();

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(event) => match encode_frame(&event) {
                    Ok(json) => {
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, topic = event.topic(), "Failed to encode bus event");
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dashboard WS client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            client_msg = socket.recv() => match client_msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    tracing::info!("Dashboard WebSocket client disconnected");
}
