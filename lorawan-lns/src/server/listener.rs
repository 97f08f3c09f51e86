//! HTTP listener for accepting Basics Station connections.
//!
//! Two WebSocket endpoints, as the station protocol defines them:
//! `/router-info` answers the discovery exchange with the data endpoint
//! URI, `/router-data` carries the actual uplink/downlink traffic. A
//! request that is not a WebSocket upgrade is answered with 400 and no
//! connection is opened.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{error, info, warn};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use lorawan_protocol::LoRaRegionType;

use crate::handler::UplinkDispatcher;
use crate::server::session::{Session, SessionConfig};
use crate::server::transport::WebSocketTransport;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
    /// Regulatory region served by this network server.
    pub region: LoRaRegionType,
    /// Bound on waiting for a close frame to flush.
    pub close_timeout_secs: u64,
    /// Cap on one assembled station message.
    pub max_message_size: usize,
}

struct AppState {
    config: ServerConfig,
    dispatcher: UplinkDispatcher,
    shutdown: CancellationToken,
    connection_count: AtomicU64,
}

impl AppState {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            close_timeout: Duration::from_secs(self.config.close_timeout_secs),
            max_message_size: self.config.max_message_size,
        }
    }
}

/// The network server: accepts station connections and spawns one session
/// task per gateway.
pub struct Server {
    config: ServerConfig,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token cancelling every live session and the accept loop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the server until shutdown is requested.
    pub async fn run(&self) -> std::io::Result<()> {
        let state = Arc::new(AppState {
            dispatcher: UplinkDispatcher::new(self.config.region),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
            connection_count: AtomicU64::new(0),
        });

        let app = Router::new()
            .route("/router-info", get(router_info))
            .route("/router-data", get(router_data))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        info!(
            "Server listening on {} (region {})",
            self.config.listen_addr, self.config.region
        );

        let shutdown = self.shutdown.clone();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    }
}

/// Discovery endpoint: one request/reply exchange pointing the station at
/// the data endpoint, then close.
async fn router_info(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    let Some(upgrade) = upgrade else {
        warn!("Non-WebSocket request on /router-info from {}", addr);
        return StatusCode::BAD_REQUEST.into_response();
    };
    upgrade
        .on_upgrade(move |socket| answer_router_info(socket, addr, state))
        .into_response()
}

async fn answer_router_info(mut socket: WebSocket, addr: SocketAddr, state: Arc<AppState>) {
    use axum::extract::ws::Message;

    let request = match socket.recv().await {
        Some(Ok(Message::Text(text))) => text,
        other => {
            warn!("Unusable router-info request from {}: {:?}", addr, other);
            return;
        }
    };
    let router = serde_json::from_str::<serde_json::Value>(&request)
        .ok()
        .and_then(|v| v.get("router").cloned());
    let reply = match router {
        Some(router) => json!({
            "router": router,
            "muxs": "muxs-::0",
            "uri": format!("ws://{}/router-data", state.config.listen_addr),
        }),
        None => json!({ "error": "Missing router field" }),
    };
    if let Err(e) = socket.send(Message::Text(reply.to_string())).await {
        warn!("Failed to answer router-info from {}: {}", addr, e);
    }
}

/// Data endpoint: the long-lived gateway connection.
async fn router_data(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    let Some(upgrade) = upgrade else {
        warn!("Non-WebSocket request on /router-data from {}", addr);
        return StatusCode::BAD_REQUEST.into_response();
    };
    upgrade
        .on_upgrade(move |socket| handle_connection(socket, addr, state))
        .into_response()
}

/// Handle a single gateway connection.
async fn handle_connection(socket: WebSocket, addr: SocketAddr, state: Arc<AppState>) {
    let session_id = state.connection_count.fetch_add(1, Ordering::SeqCst) + 1;
    info!("[Session {}] New connection from {}", session_id, addr);

    let cancel = state.shutdown.child_token();
    let mut session = Session::new(
        session_id,
        Box::new(WebSocketTransport::new(socket)),
        state.session_config(),
        cancel,
    );

    session.run(&state.dispatcher).await;

    match session.disconnect_reason() {
        Some(reason) => info!("[Session {}] Connection closed ({})", session_id, reason),
        None => error!("[Session {}] Connection closed without reason", session_id),
    }
}
