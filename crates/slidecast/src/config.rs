// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use crate::hub::{Heartbeat, HubOptions};
use crate::queue::OverflowPolicy;

/// Live-mirror a presenter's slide position to every connected follower.
#[derive(Debug, Clone, Parser)]
#[command(name = "slidecast", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "SLIDECAST_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "SLIDECAST_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Token the presenter must send to take control. Generated if unset.
    #[arg(long, env = "SLIDECAST_GUIDE_TOKEN")]
    pub guide_token: Option<String>,

    /// Interval between pings to each follower, in milliseconds.
    #[arg(long, env = "SLIDECAST_HEARTBEAT_MS", default_value_t = 3000)]
    pub heartbeat_ms: u64,

    /// How long a follower may go without answering a ping, in milliseconds.
    #[arg(long, env = "SLIDECAST_READ_DEADLINE_MS", default_value_t = 5000)]
    pub read_deadline_ms: u64,

    /// Commands buffered per follower before the overflow policy applies.
    #[arg(long, env = "SLIDECAST_QUEUE_CAPACITY", default_value_t = 16)]
    pub queue_capacity: usize,

    /// What a full follower queue discards (drop-oldest, drop-newest).
    #[arg(long, env = "SLIDECAST_OVERFLOW", default_value = "drop-oldest")]
    pub overflow: String,

    /// Log format (text or json).
    #[arg(long, env = "SLIDECAST_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SLIDECAST_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.heartbeat_ms == 0 {
            anyhow::bail!("--heartbeat-ms must be positive");
        }
        if self.read_deadline_ms <= self.heartbeat_ms {
            anyhow::bail!("--read-deadline-ms must be longer than --heartbeat-ms");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("--queue-capacity must be positive");
        }
        if matches!(self.guide_token.as_deref(), Some("")) {
            anyhow::bail!("--guide-token must not be empty");
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            anyhow::bail!("invalid log format: {}", self.log_format);
        }
        self.overflow_policy()?;
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn overflow_policy(&self) -> anyhow::Result<OverflowPolicy> {
        self.overflow.parse()
    }

    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            interval: Duration::from_millis(self.heartbeat_ms),
            read_deadline: Duration::from_millis(self.read_deadline_ms),
        }
    }

    pub fn hub_options(&self) -> anyhow::Result<HubOptions> {
        Ok(HubOptions {
            queue_capacity: self.queue_capacity,
            overflow: self.overflow_policy()?,
            heartbeat: self.heartbeat(),
        })
    }

    /// The configured presenter token, or a freshly generated one.
    pub fn resolve_token(&self) -> String {
        match self.guide_token.as_deref() {
            Some(token) if !token.is_empty() => token.to_owned(),
            _ => crate::token::generate(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
