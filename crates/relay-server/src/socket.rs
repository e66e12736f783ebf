//! WebSocket adapter for Relay server.
//!
//! Clients send route-addressed JSON frames (`chat.send`, `chat.join`,
//! `chat.leave`, `chat.users`, `chat.stream`). After `chat.stream` every
//! chat event is pushed to the socket in arrival order. Closing the socket
//! cancels the subscription.

use crate::error::ApiError;
use crate::handlers::{AppState, EventStream};
use crate::metrics;
use crate::wire::{routes, ClientFrame, PresenceRequest, SendRequest, ServerFrame, WireEvent};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tenvis_relay_core::ChatEvent;
use tracing::{debug, warn};

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = format!(
        "conn_{}",
        CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    debug!(connection = %connection_id, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();
    let mut stream: Option<EventStream> = None;

    loop {
        tokio::select! {
            biased;

            // Forward chat events once the client asked for the stream
            Some(event) = next_event(&mut stream) => {
                let frame = ServerFrame::Event(WireEvent::from(&*event));
                if send_frame(&mut sender, &frame).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(_) => {
                            let frame = ServerFrame::error("Binary frames must be UTF-8 JSON");
                            if send_frame(&mut sender, &frame).await.is_err() {
                                break;
                            }
                            continue;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection_id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %connection_id, "WebSocket stream ended");
                        break;
                    }
                };

                let response = match handle_frame(&text, &state, &mut stream) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(connection = %connection_id, error = %e, "Frame rejected");
                        metrics::record_error("bad_frame");
                        ServerFrame::error(e.to_string())
                    }
                };

                if send_frame(&mut sender, &response).await.is_err() {
                    break;
                }
            }
        }
    }

    // Cleanup: detach from the bus
    drop(stream);

    debug!(connection = %connection_id, "WebSocket disconnected");
}

/// Wait for the next event, or forever if the stream was never requested.
async fn next_event(stream: &mut Option<EventStream>) -> Option<Arc<ChatEvent>> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

/// Handle a decoded text frame.
fn handle_frame(
    text: &str,
    state: &Arc<AppState>,
    stream: &mut Option<EventStream>,
) -> Result<ServerFrame, ApiError> {
    let frame: ClientFrame = serde_json::from_str(text)?;

    match frame.route.as_str() {
        routes::SEND => {
            metrics::record_request(routes::SEND);
            let request: SendRequest = serde_json::from_value(frame.data)?;
            state.send_message(&request.username, &request.message);
            Ok(ServerFrame::ack(routes::SEND))
        }
        routes::JOIN => {
            metrics::record_request(routes::JOIN);
            let request: PresenceRequest = serde_json::from_value(frame.data)?;
            state.user_joined(&request.username);
            Ok(ServerFrame::ack(routes::JOIN))
        }
        routes::LEAVE => {
            metrics::record_request(routes::LEAVE);
            let request: PresenceRequest = serde_json::from_value(frame.data)?;
            state.user_left(&request.username);
            Ok(ServerFrame::ack(routes::LEAVE))
        }
        routes::USERS => {
            metrics::record_request(routes::USERS);
            Ok(ServerFrame::Users {
                users: state.connected_users(),
            })
        }
        routes::STREAM => {
            metrics::record_request(routes::STREAM);
            // One subscription per connection
            if stream.is_none() {
                let opened = state.open_stream();
                debug!(subscriber = opened.id(), "WebSocket stream opened");
                *stream = Some(opened);
            }
            Ok(ServerFrame::ack(routes::STREAM))
        }
        other => Err(ApiError::UnknownRoute(other.to_string())),
    }
}

/// Send a frame to the WebSocket.
async fn send_frame(sender: &mut SplitSink<WebSocket, Message>, frame: &ServerFrame) -> Result<()> {
    let text = serde_json::to_string(frame)?;
    sender.send(Message::Text(text)).await?;
    Ok(())
}
