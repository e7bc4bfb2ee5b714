// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Follower side: forwards queued commands to one WebSocket and keeps it
//! alive with ping/pong.

use std::pin::Pin;
use std::sync::Arc;

use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{Instant, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::command::Command;
use crate::error::AgentError;
use crate::hub::{AgentId, Heartbeat, Hub};
use crate::queue::CommandQueue;

/// A registered follower connection.
///
/// Created by [`Hub::register_egress`]; dropping it unregisters the follower.
pub struct EgressAgent {
    id: AgentId,
    peer: String,
    queue: Arc<CommandQueue>,
    heartbeat: Heartbeat,
    hub: Arc<Hub>,
}

impl EgressAgent {
    pub(crate) fn new(
        id: AgentId,
        peer: String,
        queue: Arc<CommandQueue>,
        heartbeat: Heartbeat,
        hub: Arc<Hub>,
    ) -> Self {
        Self { id, peer, queue, heartbeat, hub }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Take the next queued command without a socket.
    ///
    /// Returns `None` once the hub has unregistered this follower.
    #[cfg(test)]
    pub(crate) async fn next_command(&self) -> Option<Command> {
        self.queue.recv().await
    }

    /// Serve the follower socket until it closes, fails, or `cancel` fires.
    ///
    /// Returns `Ok(())` when the peer closes the connection or the hub closes
    /// the queue, and [`AgentError::Cancelled`] when `cancel` fires. Writes
    /// are bounded by the same read deadline and cancellation as reads, so a
    /// peer that stops draining its socket cannot pin the agent.
    pub async fn run<S, E>(self, socket: S, cancel: CancellationToken) -> Result<(), AgentError>
    where
        S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Unpin,
        E: std::fmt::Display,
    {
        let (mut ws_tx, mut ws_rx) = socket.split();
        // A close frame from the peer cancels this child only.
        let closed = cancel.child_token();
        let Heartbeat { interval, read_deadline } = self.heartbeat;

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep(read_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                _ = closed.cancelled() => {
                    if cancel.is_cancelled() {
                        return Err(AgentError::Cancelled);
                    }
                    return Ok(());
                }

                _ = &mut deadline => return Err(AgentError::DeadlineExceeded),

                _ = ticker.tick() => {
                    let ping = Message::Ping(Bytes::new());
                    send_bounded(&mut ws_tx, ping, &cancel, deadline.as_mut())
                        .await
                        .map_err(|e| e.context("failed to ping follower"))?;
                }

                cmd = self.queue.recv() => {
                    let Some(cmd) = cmd else {
                        debug!(agent = %self.id, "queue closed");
                        return Ok(());
                    };
                    let text = cmd.encode()?;
                    let frame = Message::Text(text.into());
                    send_bounded(&mut ws_tx, frame, &cancel, deadline.as_mut())
                        .await
                        .map_err(|e| e.context("failed to send command"))?;
                }

                msg = ws_rx.next() => match msg {
                    Some(Ok(Message::Pong(_))) => {
                        debug!(agent = %self.id, "pong received");
                        deadline.as_mut().reset(Instant::now() + read_deadline);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map(|f| f.code);
                        debug!(agent = %self.id, ?code, "close received");
                        // Complete the closing handshake.
                        let reply = Message::Close(frame);
                        let answered =
                            send_bounded(&mut ws_tx, reply, &cancel, deadline.as_mut()).await;
                        if let Err(e) = answered {
                            debug!(agent = %self.id, err = %e, "failed to answer close");
                        }
                        closed.cancel();
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(AgentError::Transport(format!("failed to read from follower: {e}")));
                    }
                    None => return Err(AgentError::Transport("connection closed".to_owned())),
                },
            }
        }
    }
}

/// Write one frame, giving up when `cancel` fires or `deadline` expires.
async fn send_bounded<W, E>(
    ws_tx: &mut W,
    msg: Message,
    cancel: &CancellationToken,
    deadline: Pin<&mut Sleep>,
) -> Result<(), SendError>
where
    W: Sink<Message, Error = E> + Unpin,
    E: std::fmt::Display,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SendError::Cancelled),
        _ = deadline => Err(SendError::DeadlineExceeded),
        result = ws_tx.send(msg) => result.map_err(|e| SendError::Failed(e.to_string())),
    }
}

/// Why a bounded write did not complete.
#[derive(Debug)]
enum SendError {
    Cancelled,
    DeadlineExceeded,
    Failed(String),
}

impl SendError {
    fn context(self, what: &str) -> AgentError {
        match self {
            Self::Cancelled => AgentError::Cancelled,
            Self::DeadlineExceeded => AgentError::DeadlineExceeded,
            Self::Failed(e) => AgentError::Transport(format!("{what}: {e}")),
        }
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("read deadline expired"),
            Self::Failed(e) => f.write_str(e),
        }
    }
}

impl Drop for EgressAgent {
    fn drop(&mut self) {
        self.hub.unregister_egress(self.id);
    }
}

impl std::fmt::Debug for EgressAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EgressAgent").field("id", &self.id).field("peer", &self.peer).finish()
    }
}

#[cfg(test)]
#[path = "egress_tests.rs"]
mod tests;
