// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Navigation commands exchanged between presenter, hub and followers.
//!
//! Commands use internally-tagged JSON (`{"type": "goto", "slideIndex": 3}`).
//! Fields that do not belong to a command's type are ignored on decode and
//! never emitted on encode.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Credential proof; consumed by the ingress agent, never forwarded.
    Auth {
        #[serde(default, deserialize_with = "null_as_empty")]
        token: String,
    },
    /// Jump to a zero-based slide position.
    Goto {
        #[serde(rename = "slideIndex")]
        slide_index: u32,
    },
    Next {},
    Prev {},
}

impl Command {
    pub fn goto(slide_index: u32) -> Self {
        Self::Goto { slide_index }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Wire name of the command type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Goto { .. } => "goto",
            Self::Next {} => "next",
            Self::Prev {} => "prev",
        }
    }

    /// Decode a single JSON frame.
    pub fn decode(text: &str) -> Result<Self, AgentError> {
        serde_json::from_str(text).map_err(|e| AgentError::Decode(e.to_string()))
    }

    /// Encode into the JSON wire form.
    pub fn encode(&self) -> Result<String, AgentError> {
        serde_json::to_string(self).map_err(|e| AgentError::Encode(e.to_string()))
    }
}

/// A `null` token is treated like a missing one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
