// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Reasons an agent stops or a hub call is refused.
///
/// Every variant is local to a single connection: none of them propagate into
/// the broadcast path of other agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The agent could not start (e.g. empty presenter token).
    Misconfigured(String),
    /// Wrong token, or a command arrived before authentication.
    Unauthorized(String),
    /// A frame could not be decoded into a command.
    Decode(String),
    /// A command could not be serialized for a follower.
    Encode(String),
    /// Read or write failure on the socket.
    Transport(String),
    /// No pong arrived within the read deadline.
    DeadlineExceeded,
    /// The caller cancelled the agent.
    Cancelled,
    /// The command may not be broadcast (`auth` is never forwarded).
    Forbidden,
    /// The sender is not (or no longer) registered with the hub.
    NotRegistered,
}

impl AgentError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Misconfigured(_) => "MISCONFIGURED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Decode(_) => "DECODE",
            Self::Encode(_) => "ENCODE",
            Self::Transport(_) => "TRANSPORT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Cancelled => "CANCELLED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotRegistered => "NOT_REGISTERED",
        }
    }

    /// Whether this exit was requested rather than caused by a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misconfigured(msg)
            | Self::Unauthorized(msg)
            | Self::Decode(msg)
            | Self::Encode(msg)
            | Self::Transport(msg) => write!(f, "{}: {msg}", self.as_str()),
            Self::DeadlineExceeded => f.write_str("DEADLINE_EXCEEDED: no pong within read deadline"),
            Self::Cancelled => f.write_str("CANCELLED"),
            Self::Forbidden => f.write_str("FORBIDDEN: auth commands are never broadcast"),
            Self::NotRegistered => f.write_str("NOT_REGISTERED: sender is not registered"),
        }
    }
}

impl std::error::Error for AgentError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
