// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slidecast: one authenticated presenter drives the slide position of every
//! connected follower over WebSockets.

pub mod command;
pub mod config;
pub mod egress;
pub mod error;
pub mod hub;
pub mod ingress;
pub mod queue;
pub mod state;
pub mod test_support;
pub mod token;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::hub::Hub;
use crate::state::AppState;
use crate::transport::build_router;

/// Run the server until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.addr();
    let shutdown = CancellationToken::new();
    let token = config.resolve_token();

    let hub = Arc::new(Hub::new(config.hub_options()?));
    let state = Arc::new(AppState::new(hub, token, shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                shutdown.cancel();
            }
        });
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("slidecast listening on {addr}");
    info!("presenter token: {}", state.token);
    serve(listener, state).await
}

/// Serve the router on `listener` until `state.shutdown` is cancelled.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let router = build_router(state);
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
