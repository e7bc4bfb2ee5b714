// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::*;

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

#[test]
fn defaults_match_protocol_timing() -> anyhow::Result<()> {
    let config = parse(&["slidecast"]);
    config.validate()?;
    assert_eq!(config.addr(), "127.0.0.1:8000");
    assert_eq!(config.heartbeat().interval, Duration::from_secs(3));
    assert_eq!(config.heartbeat().read_deadline, Duration::from_secs(5));
    let options = config.hub_options()?;
    assert_eq!(options.queue_capacity, 16);
    assert_eq!(options.overflow, OverflowPolicy::DropOldest);
    Ok(())
}

#[test]
fn explicit_token_is_used() {
    let config = parse(&["slidecast", "--guide-token", "hunter"]);
    assert_eq!(config.resolve_token(), "hunter");
}

#[test]
fn missing_token_is_generated() {
    let config = parse(&["slidecast"]);
    let token = config.resolve_token();
    assert_eq!(token.len(), crate::token::TOKEN_LEN);
}

#[test]
fn overflow_flag_parses() -> anyhow::Result<()> {
    let config = parse(&["slidecast", "--overflow", "drop-newest", "--queue-capacity", "4"]);
    config.validate()?;
    let options = config.hub_options()?;
    assert_eq!(options.overflow, OverflowPolicy::DropNewest);
    assert_eq!(options.queue_capacity, 4);
    Ok(())
}

#[yare::parameterized(
    zero_heartbeat = { &["slidecast", "--heartbeat-ms", "0"], "--heartbeat-ms" },
    deadline_too_short = { &["slidecast", "--heartbeat-ms", "5000", "--read-deadline-ms", "3000"],
                           "--read-deadline-ms" },
    zero_capacity = { &["slidecast", "--queue-capacity", "0"], "--queue-capacity" },
    empty_token = { &["slidecast", "--guide-token", ""], "--guide-token" },
    bad_log_format = { &["slidecast", "--log-format", "xml"], "log format" },
    bad_overflow = { &["slidecast", "--overflow", "block"], "overflow policy" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    match config.validate() {
        Ok(()) => panic!("expected error containing {expected_substr:?}"),
        Err(e) => assert!(e.to_string().contains(expected_substr), "error: {e}"),
    }
}
