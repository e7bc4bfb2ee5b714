// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket upgrade handlers. Each upgraded socket is tagged with a role,
//! registered with the hub, and served by its agent until it ends.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use tracing::{debug, error, info, warn};

use crate::error::AgentError;
use crate::state::AppState;

/// `GET /ws/guide`: presenter connection.
pub async fn guide_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_failed_upgrade(move |e| warn!(peer = %addr, err = %e, "failed to upgrade presenter"))
        .on_upgrade(move |socket| handle_presenter(state, socket, addr))
}

/// `GET /ws/guided`: follower connection.
pub async fn guided_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_failed_upgrade(move |e| warn!(peer = %addr, err = %e, "failed to upgrade follower"))
        .on_upgrade(move |socket| handle_follower(state, socket, addr))
}

async fn handle_presenter(state: Arc<AppState>, socket: WebSocket, addr: SocketAddr) {
    let agent = match state.hub.register_ingress(addr.to_string(), &state.token) {
        Ok(agent) => agent,
        Err(e) => {
            error!(peer = %addr, err = %e, "presenter rejected");
            return;
        }
    };
    let result = agent.run(socket, state.shutdown.child_token()).await;
    log_exit("presenter", addr, result);
}

async fn handle_follower(state: Arc<AppState>, socket: WebSocket, addr: SocketAddr) {
    let agent = state.hub.register_egress(addr.to_string());
    let result = agent.run(socket, state.shutdown.child_token()).await;
    log_exit("follower", addr, result);
}

fn log_exit(role: &str, addr: SocketAddr, result: Result<(), AgentError>) {
    match result {
        Ok(()) => info!(peer = %addr, role, "connection closed"),
        Err(e) if e.is_cancelled() => debug!(peer = %addr, role, "connection cancelled"),
        Err(e) => warn!(peer = %addr, role, err = %e, code = e.as_str(), "connection exited"),
    }
}
