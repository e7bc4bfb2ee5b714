// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded per-follower command queue.
//!
//! Pushes never block: the hub pushes while holding its registry lock, so a
//! full queue applies the [`OverflowPolicy`] to that one follower instead of
//! waiting for its consumer.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::command::Command;

/// What to discard when a follower's queue is full.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest queued command so the latest navigation survives.
    #[default]
    DropOldest,
    /// Discard the incoming command.
    DropNewest,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DropOldest => f.write_str("drop-oldest"),
            Self::DropNewest => f.write_str("drop-newest"),
        }
    }
}

impl std::str::FromStr for OverflowPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop-oldest" => Ok(Self::DropOldest),
            "drop-newest" => Ok(Self::DropNewest),
            other => anyhow::bail!("invalid overflow policy: {other}"),
        }
    }
}

/// Result of a non-blocking push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The queue was full; one command was discarded per policy.
    Overflowed,
    /// The queue was closed by unregistration.
    Closed,
}

struct Inner {
    items: VecDeque<Command>,
    closed: bool,
}

/// Single-consumer FIFO of commands awaiting delivery to one follower.
pub struct CommandQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

impl CommandQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner { items: VecDeque::with_capacity(capacity), closed: false }),
            notify: Notify::new(),
            capacity,
            policy,
        }
    }

    pub fn push(&self, cmd: Command) -> PushOutcome {
        let outcome = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return PushOutcome::Closed;
            }
            if inner.items.len() < self.capacity {
                inner.items.push_back(cmd);
                PushOutcome::Queued
            } else {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        inner.items.pop_front();
                        inner.items.push_back(cmd);
                    }
                    OverflowPolicy::DropNewest => {}
                }
                PushOutcome::Overflowed
            }
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next command. Returns `None` once the queue is closed.
    pub async fn recv(&self) -> Option<Command> {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(cmd) = inner.items.pop_front() {
                    return Some(cmd);
                }
                if inner.closed {
                    return None;
                }
            }
            // notify_one stores a permit, so a push between the check and
            // this await is not lost.
            self.notify.notified().await;
        }
    }

    /// Drain buffered commands and refuse further pushes.
    ///
    /// Returns the number of commands discarded. Safe to call repeatedly.
    pub fn close(&self) -> usize {
        let drained = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            let n = inner.items.len();
            inner.items.clear();
            n
        };
        self.notify.notify_one();
        drained
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
