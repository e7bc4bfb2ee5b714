// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presenter side: authenticates one WebSocket and feeds its commands into
//! the hub.
//!
//! The first command on a connection must be `auth` with the configured
//! token. Anything else before that, or a wrong token at any point, ends the
//! connection. Authentication is per connection and never remembered.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::error::AgentError;
use crate::hub::{AgentId, Hub};
use crate::token::constant_time_eq;

/// Per-connection authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unauthenticated,
    Authenticated,
}

/// A registered presenter connection.
///
/// Created by [`Hub::register_ingress`]; dropping it unregisters the
/// presenter and revokes its broadcast rights.
pub struct IngressAgent {
    id: AgentId,
    peer: String,
    token: String,
    state: ChannelState,
    hub: Arc<Hub>,
}

impl IngressAgent {
    pub(crate) fn new(id: AgentId, peer: String, token: String, hub: Arc<Hub>) -> Self {
        Self { id, peer, token, state: ChannelState::Unauthenticated, hub }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Apply one decoded command to the channel.
    ///
    /// Errors are fatal: the caller must drop the connection.
    pub fn handle(&mut self, cmd: Command) -> Result<(), AgentError> {
        match (cmd, self.state) {
            (Command::Auth { token }, state) => {
                if !constant_time_eq(&token, &self.token) {
                    warn!(agent = %self.id, peer = %self.peer, "presenter sent incorrect token");
                    return Err(AgentError::Unauthorized("incorrect token".to_owned()));
                }
                if state == ChannelState::Authenticated {
                    debug!(agent = %self.id, "presenter re-authenticated");
                } else {
                    info!(agent = %self.id, peer = %self.peer, "presenter authenticated");
                }
                self.state = ChannelState::Authenticated;
                Ok(())
            }
            (cmd, ChannelState::Unauthenticated) => {
                warn!(agent = %self.id, kind = cmd.kind(), "command before authentication");
                Err(AgentError::Unauthorized("channel not authenticated".to_owned()))
            }
            (cmd, ChannelState::Authenticated) => {
                self.hub.broadcast(&cmd, self.id)?;
                Ok(())
            }
        }
    }

    /// Read commands from the presenter socket until it closes, fails, or
    /// `cancel` fires.
    ///
    /// A peer close returns `Ok(())`. On an authentication failure the peer
    /// is sent a policy-violation close frame before the error is returned;
    /// that write gives up after the hub's read deadline or on `cancel`.
    pub async fn run<S, E>(mut self, socket: S, cancel: CancellationToken) -> Result<(), AgentError>
    where
        S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Unpin,
        E: std::fmt::Display,
    {
        let (mut ws_tx, mut ws_rx) = socket.split();
        let result = self.read_loop(&mut ws_rx, &cancel).await;

        if let Err(AgentError::Unauthorized(_)) = result {
            let frame = CloseFrame { code: close_code::POLICY, reason: "unauthorized".into() };
            let limit = self.hub.options().heartbeat.read_deadline;
            let send = ws_tx.send(Message::Close(Some(frame)));
            tokio::select! {
                _ = cancel.cancelled() => debug!(agent = %self.id, "close frame abandoned on cancel"),
                sent = tokio::time::timeout(limit, send) => match sent {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => debug!(agent = %self.id, err = %e, "failed to send close frame"),
                    Err(_) => debug!(agent = %self.id, "close frame timed out"),
                },
            }
        }
        result
    }

    async fn read_loop<R, E>(
        &mut self,
        ws_rx: &mut R,
        cancel: &CancellationToken,
    ) -> Result<(), AgentError>
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: std::fmt::Display,
    {
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                msg = ws_rx.next() => msg,
            };

            let cmd = match msg {
                Some(Ok(Message::Text(text))) => Command::decode(text.as_str())?,
                Some(Ok(Message::Binary(data))) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| AgentError::Decode(format!("binary frame is not utf-8: {e}")))?;
                    Command::decode(text)?
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(agent = %self.id, "presenter closed connection");
                    return Ok(());
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(AgentError::Transport(format!(
                        "failed to read command from websocket: {e}"
                    )));
                }
            };

            self.handle(cmd)?;
        }
    }
}

impl Drop for IngressAgent {
    fn drop(&mut self) {
        self.hub.unregister_ingress(self.id);
    }
}

impl std::fmt::Debug for IngressAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngressAgent")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod tests;
