// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of connected agents and the broadcast path between them.
//!
//! The hub owns no sockets and runs no task of its own. Agents register
//! themselves, and every registry read or mutation goes through one
//! readers-writer lock. Nothing awaits while the lock is held: follower
//! queues are bounded and pushed without blocking, so a stalled follower
//! cannot hold up broadcasts or (un)registration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::Command;
use crate::egress::EgressAgent;
use crate::error::AgentError;
use crate::ingress::IngressAgent;
use crate::queue::{CommandQueue, OverflowPolicy, PushOutcome};

/// Identity of a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(Uuid);

impl AgentId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Follower liveness timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// How often a ping is sent.
    pub interval: Duration,
    /// How long to wait for a pong before the follower is considered dead.
    pub read_deadline: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self { interval: Duration::from_secs(3), read_deadline: Duration::from_secs(5) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubOptions {
    /// Capacity of each follower's inbound queue.
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    pub heartbeat: Heartbeat,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            overflow: OverflowPolicy::default(),
            heartbeat: Heartbeat::default(),
        }
    }
}

/// Outcome of a single broadcast across all followers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Followers whose queue accepted the command without loss.
    pub queued: usize,
    /// Followers whose queue was full and applied the overflow policy.
    pub overflowed: usize,
}

struct Follower {
    peer: String,
    queue: Arc<CommandQueue>,
}

#[derive(Default)]
struct Registry {
    followers: IndexMap<AgentId, Follower>,
    presenters: IndexMap<AgentId, String>,
}

/// Shared registry connecting one presenter stream to many followers.
pub struct Hub {
    registry: RwLock<Registry>,
    options: HubOptions,
}

impl Hub {
    pub fn new(options: HubOptions) -> Self {
        Self { registry: RwLock::new(Registry::default()), options }
    }

    pub fn options(&self) -> &HubOptions {
        &self.options
    }

    /// Register a follower and allocate its inbound queue.
    ///
    /// The returned agent unregisters itself when dropped.
    pub fn register_egress(self: &Arc<Self>, peer: impl Into<String>) -> EgressAgent {
        let peer = peer.into();
        let id = AgentId::new();
        let queue = Arc::new(CommandQueue::new(self.options.queue_capacity, self.options.overflow));
        {
            let mut registry = self.registry.write();
            registry
                .followers
                .insert(id, Follower { peer: peer.clone(), queue: Arc::clone(&queue) });
        }
        info!(agent = %id, peer = %peer, "registering follower");
        EgressAgent::new(id, peer, queue, self.options.heartbeat, Arc::clone(self))
    }

    /// Remove a follower, then drain and close its queue.
    ///
    /// Returns `false` if the follower was not registered.
    pub fn unregister_egress(&self, id: AgentId) -> bool {
        let mut registry = self.registry.write();
        let Some(follower) = registry.followers.shift_remove(&id) else {
            return false;
        };
        // Broadcast holds the read lock for its whole pass, so no push can
        // race this close.
        let drained = follower.queue.close();
        drop(registry);

        info!(agent = %id, peer = %follower.peer, "unregistering follower");
        debug!(agent = %id, drained, "queue drained");
        true
    }

    /// Register a presenter that must authenticate with `token`.
    ///
    /// Fails without touching the registry when the token is empty.
    pub fn register_ingress(
        self: &Arc<Self>,
        peer: impl Into<String>,
        token: &str,
    ) -> Result<IngressAgent, AgentError> {
        if token.is_empty() {
            return Err(AgentError::Misconfigured("no token set".to_owned()));
        }
        let peer = peer.into();
        let id = AgentId::new();
        self.registry.write().presenters.insert(id, peer.clone());
        info!(agent = %id, peer = %peer, "registering presenter");
        Ok(IngressAgent::new(id, peer, token.to_owned(), Arc::clone(self)))
    }

    /// Remove a presenter, revoking its broadcast rights.
    pub fn unregister_ingress(&self, id: AgentId) -> bool {
        let removed = self.registry.write().presenters.shift_remove(&id);
        match removed {
            Some(peer) => {
                info!(agent = %id, peer = %peer, "unregistering presenter");
                true
            }
            None => false,
        }
    }

    /// Queue `cmd` for every registered follower, in registration order.
    ///
    /// `from` must be a registered presenter. `auth` commands are refused.
    pub fn broadcast(&self, cmd: &Command, from: AgentId) -> Result<Delivery, AgentError> {
        if cmd.is_auth() {
            return Err(AgentError::Forbidden);
        }

        let registry = self.registry.read();
        if !registry.presenters.contains_key(&from) {
            return Err(AgentError::NotRegistered);
        }

        let mut delivery = Delivery::default();
        for (id, follower) in &registry.followers {
            match follower.queue.push(cmd.clone()) {
                PushOutcome::Queued => delivery.queued += 1,
                PushOutcome::Overflowed => {
                    delivery.overflowed += 1;
                    warn!(
                        agent = %id,
                        peer = %follower.peer,
                        policy = %self.options.overflow,
                        "follower queue full"
                    );
                }
                PushOutcome::Closed => {}
            }
        }
        drop(registry);

        debug!(
            from = %from,
            kind = cmd.kind(),
            queued = delivery.queued,
            overflowed = delivery.overflowed,
            "broadcast"
        );
        Ok(delivery)
    }

    pub fn follower_count(&self) -> usize {
        self.registry.read().followers.len()
    }

    pub fn presenter_count(&self) -> usize {
        self.registry.read().presenters.len()
    }

    #[cfg(test)]
    pub(crate) fn is_registered(&self, id: AgentId) -> bool {
        let registry = self.registry.read();
        registry.followers.contains_key(&id) || registry.presenters.contains_key(&id)
    }

    /// Number of commands buffered for a follower, if registered.
    #[cfg(test)]
    pub(crate) fn pending(&self, id: AgentId) -> Option<usize> {
        self.registry.read().followers.get(&id).map(|f| f.queue.len())
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubOptions::default())
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
