//! HTTP handlers for Relay server.
//!
//! Request-style endpoints under `/api/chat` plus the Server-Sent Events
//! stream. The WebSocket endpoint lives in [`crate::socket`].

use crate::config::Config;
use crate::error::ApiError;
use crate::metrics::{self, StreamMetricsGuard};
use crate::socket;
use crate::wire::{routes, PresenceRequest, SendRequest, WireEvent};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tenvis_relay_core::{ChatEvent, ChatRelay, EventKind, RelayError, SubscriberId, Subscription};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Shared server state.
pub struct AppState {
    /// The chat relay.
    pub relay: ChatRelay,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus configuration is invalid.
    pub fn new(config: Config) -> Result<Self, RelayError> {
        Ok(Self {
            relay: ChatRelay::with_config(config.relay_config())?,
            config,
        })
    }

    /// Relay a chat message and count it.
    pub fn send_message(&self, username: &str, message: &str) {
        let recipients = self.relay.send_message(username, message);
        metrics::record_event(EventKind::Message);
        debug!(username = %username, recipients, "Message relayed");
    }

    /// Join a user, counting the event only when presence changed.
    pub fn user_joined(&self, username: &str) {
        if self.relay.user_joined(username) {
            metrics::record_event(EventKind::Join);
            metrics::record_stats(self.relay.stats());
        }
    }

    /// Leave a user, counting the event only when presence changed.
    pub fn user_left(&self, username: &str) {
        if self.relay.user_left(username) {
            metrics::record_event(EventKind::Leave);
            metrics::record_stats(self.relay.stats());
        }
    }

    /// Connected usernames in sorted order.
    pub fn connected_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.relay.connected_users().into_iter().collect();
        users.sort_unstable();
        users
    }

    /// Attach a subscriber for a streaming client.
    pub fn open_stream(self: &Arc<Self>) -> EventStream {
        let guard = StreamMetricsGuard::new();
        let subscription = self.relay.subscribe();
        metrics::record_stats(self.relay.stats());
        EventStream {
            subscription,
            state: Arc::clone(self),
            _metrics: guard,
        }
    }
}

/// A streaming client's subscription.
///
/// Dropping it detaches the subscriber and refreshes the subscriber gauge.
pub struct EventStream {
    subscription: Subscription,
    state: Arc<AppState>,
    _metrics: StreamMetricsGuard,
}

impl EventStream {
    /// Identifier of the underlying subscriber.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.subscription.id()
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<Arc<ChatEvent>> {
        self.subscription.recv().await
    }

    /// Turn the handle into a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = Arc<ChatEvent>> + Send + 'static {
        futures_util::stream::unfold(self, |mut stream| async move {
            let event = stream.recv().await?;
            Some((event, stream))
        })
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
        metrics::record_stats(self.state.relay.stats());
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let websocket_path = state.config.stream.websocket_path.clone();

    Router::new()
        .route("/api/chat/send", post(send_handler))
        .route("/api/chat/join", post(join_handler))
        .route("/api/chat/leave", post(leave_handler))
        .route("/api/chat/users", get(users_handler))
        .route("/api/chat/stream", get(stream_handler))
        .route(&websocket_path, get(socket::ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()).context("Invalid relay configuration")?);

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let app = build_router(state);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Relay server listening on {}", addr);
    info!("SSE endpoint: http://{}/api/chat/stream", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.stream.websocket_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.relay.stats();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "subscribers": stats.subscriber_count,
        "users": stats.connected_users,
    }))
}

async fn send_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    metrics::record_request(routes::SEND);
    let Json(request) = payload.map_err(reject)?;
    state.send_message(&request.username, &request.message);
    Ok(StatusCode::OK)
}

async fn join_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PresenceRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    metrics::record_request(routes::JOIN);
    let Json(request) = payload.map_err(reject)?;
    state.user_joined(&request.username);
    Ok(StatusCode::OK)
}

async fn leave_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PresenceRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    metrics::record_request(routes::LEAVE);
    let Json(request) = payload.map_err(reject)?;
    state.user_left(&request.username);
    Ok(StatusCode::OK)
}

async fn users_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    metrics::record_request(routes::USERS);
    Json(state.connected_users())
}

/// Server-Sent Events stream of chat events.
///
/// The subscription lives as long as the response body; a client
/// disconnect drops it.
async fn stream_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    metrics::record_request(routes::STREAM);
    let stream = state.open_stream();
    debug!(subscriber = stream.id(), "SSE stream opened");

    let events = stream
        .into_stream()
        .map(|event| Event::default().json_data(WireEvent::from(&*event)));

    Sse::new(events).keep_alive(KeepAlive::new().interval(state.config.keep_alive()))
}

fn reject(rejection: JsonRejection) -> ApiError {
    metrics::record_error("bad_request");
    ApiError::from(rejection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use crate::metrics::test_utils::rendered_value;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::default()).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_handler() {
        let state = test_state();
        let mut sub = state.relay.subscribe();

        let response = build_router(Arc::clone(&state))
            .oneshot(post_json(
                "/api/chat/send",
                r#"{"username": "alice", "message": "hi"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let event = sub.try_recv().unwrap();
        assert_eq!(event.kind(), EventKind::Message);
        assert_eq!(event.username(), "alice");
        assert_eq!(event.body(), "hi");
    }

    #[tokio::test]
    async fn test_duplicate_join_publishes_once() {
        let state = test_state();
        let mut sub = state.relay.subscribe();

        for _ in 0..2 {
            let response = build_router(Arc::clone(&state))
                .oneshot(post_json("/api/chat/join", r#"{"username": "alice"}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(sub.try_recv().unwrap().kind(), EventKind::Join);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_users_handler() {
        let state = test_state();
        state.user_joined("carol");
        state.user_joined("alice");
        state.user_joined("bob");
        state.user_left("bob");

        let request = Request::builder()
            .uri("/api/chat/users")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let users: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(users, vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_leave_handler() {
        let state = test_state();
        state.user_joined("alice");
        let mut sub = state.relay.subscribe();

        for _ in 0..2 {
            let response = build_router(Arc::clone(&state))
                .oneshot(post_json("/api/chat/leave", r#"{"username": "alice"}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let event = sub.try_recv().unwrap();
        assert_eq!(event.kind(), EventKind::Leave);
        assert_eq!(event.username(), "alice");
        assert!(sub.try_recv().is_none());
        assert!(state.connected_users().is_empty());
    }

    #[tokio::test]
    async fn test_missing_username_rejected() {
        let state = test_state();
        let mut sub = state.relay.subscribe();

        let response = build_router(Arc::clone(&state))
            .oneshot(post_json("/api/chat/join", r#"{"message": "hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(error["error"].as_str().unwrap().contains("username"));

        assert!(sub.try_recv().is_none());
        assert!(state.connected_users().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let response = build_router(test_state())
            .oneshot(post_json("/api/chat/send", "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = test_state();
        state.user_joined("alice");

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["users"], 1);
    }

    #[tokio::test]
    async fn test_stream_handler_delivers_events() {
        let state = test_state();
        state.send_message("alice", "before");

        let request = Request::builder()
            .uri("/api/chat/stream")
            .body(Body::empty())
            .unwrap();
        let response = build_router(Arc::clone(&state))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.relay.stats().subscriber_count, 1);

        state.send_message("alice", "after");

        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8_lossy(&chunk);
        assert!(text.contains("data:"));
        assert!(text.contains(r#""message":"after""#));
        assert!(!text.contains("before"));

        drop(body);
        assert_eq!(state.relay.stats().subscriber_count, 0);
    }

    #[test]
    fn test_subscriber_gauge_follows_stream_lifetime() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let state = test_state();

        ::metrics::with_local_recorder(&recorder, || {
            let first = state.open_stream();
            let second = state.open_stream();
            let rendered = handle.render();
            assert_eq!(rendered_value(&rendered, "relay_subscribers_active"), Some(2.0));
            assert_eq!(rendered_value(&rendered, "relay_streams_active"), Some(2.0));

            drop(first);
            let rendered = handle.render();
            assert_eq!(rendered_value(&rendered, "relay_subscribers_active"), Some(1.0));

            drop(second);
        });

        let rendered = handle.render();
        assert_eq!(rendered_value(&rendered, "relay_subscribers_active"), Some(0.0));
        assert_eq!(rendered_value(&rendered, "relay_streams_active"), Some(0.0));
        assert_eq!(state.relay.stats().subscriber_count, 0);
    }
}
