// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers shared by unit and integration tests.

use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, Stream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::hub::{Heartbeat, Hub, HubOptions};
use crate::queue::OverflowPolicy;
use crate::state::AppState;

/// Error returned by a [`MemorySocket`] whose peer has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerGone;

impl fmt::Display for PeerGone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("peer gone")
    }
}

/// In-process stand-in for an upgraded WebSocket.
pub struct MemorySocket {
    inbound: mpsc::UnboundedReceiver<Message>,
    outbound: mpsc::UnboundedSender<Message>,
}

/// The remote end of a [`MemorySocket`].
pub struct MemoryPeer {
    pub tx: mpsc::UnboundedSender<Message>,
    pub rx: mpsc::UnboundedReceiver<Message>,
}

impl MemoryPeer {
    /// Send a text frame to the socket.
    pub fn send_text(&self, text: &str) -> anyhow::Result<()> {
        self.tx.send(Message::Text(text.to_owned().into())).map_err(|_| anyhow::anyhow!("{PeerGone}"))
    }

    /// Wait for the next frame the socket wrote.
    pub async fn recv(&mut self, timeout: Duration) -> anyhow::Result<Message> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .map_err(|_| anyhow::anyhow!("recv timeout"))?
            .ok_or_else(|| anyhow::anyhow!("socket dropped"))
    }

    /// Wait for the next text frame, skipping control frames.
    pub async fn recv_text(&mut self, timeout: Duration) -> anyhow::Result<String> {
        loop {
            match self.recv(timeout).await? {
                Message::Text(text) => return Ok(text.to_string()),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => anyhow::bail!("expected Text message, got {other:?}"),
            }
        }
    }
}

/// Create a connected socket/peer pair.
pub fn memory_socket() -> (MemorySocket, MemoryPeer) {
    let (to_socket, inbound) = mpsc::unbounded_channel();
    let (outbound, from_socket) = mpsc::unbounded_channel();
    (MemorySocket { inbound, outbound }, MemoryPeer { tx: to_socket, rx: from_socket })
}

impl Stream for MemorySocket {
    type Item = Result<Message, PeerGone>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inbound.poll_recv(cx).map(|msg| msg.map(Ok))
    }
}

impl Sink<Message> for MemorySocket {
    type Error = PeerGone;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        self.outbound.send(item).map_err(|_| PeerGone)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

/// Socket whose writes never complete, as with a peer that stopped reading.
///
/// Frames sent on the paired sender are still readable.
pub struct StalledSocket {
    inbound: mpsc::UnboundedReceiver<Message>,
}

/// Create a stalled socket and the sender feeding its read side.
pub fn stalled_socket() -> (StalledSocket, mpsc::UnboundedSender<Message>) {
    let (tx, inbound) = mpsc::unbounded_channel();
    (StalledSocket { inbound }, tx)
}

impl Stream for StalledSocket {
    type Item = Result<Message, PeerGone>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inbound.poll_recv(cx).map(|msg| msg.map(Ok))
    }
}

impl Sink<Message> for StalledSocket {
    type Error = PeerGone;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }
}

/// Hub options with fast heartbeats for tests.
pub fn fast_options(queue_capacity: usize) -> HubOptions {
    HubOptions {
        queue_capacity,
        overflow: OverflowPolicy::DropOldest,
        heartbeat: Heartbeat {
            interval: Duration::from_millis(50),
            read_deadline: Duration::from_millis(200),
        },
    }
}

/// Spawn the HTTP/WebSocket server on a random port for integration testing.
///
/// Returns the bound address and the shared state; cancel
/// `state.shutdown` to stop the server.
pub async fn spawn_server(
    options: HubOptions,
    token: &str,
) -> anyhow::Result<(SocketAddr, Arc<AppState>)> {
    let hub = Arc::new(Hub::new(options));
    let state = Arc::new(AppState::new(hub, token.to_owned(), CancellationToken::new()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let served = Arc::clone(&state);
    tokio::spawn(async move {
        let _ = crate::serve(listener, served).await;
    });
    Ok((addr, state))
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    while !check() {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}
