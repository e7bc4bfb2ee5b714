// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use super::*;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_hub(queue_capacity: usize, overflow: OverflowPolicy) -> Arc<Hub> {
    Arc::new(Hub::new(HubOptions { queue_capacity, overflow, heartbeat: Heartbeat::default() }))
}

/// Register a presenter that is allowed to broadcast.
fn presenter(hub: &Arc<Hub>) -> anyhow::Result<IngressAgent> {
    Ok(hub.register_ingress("presenter", "secret")?)
}

async fn recv(agent: &EgressAgent) -> anyhow::Result<Option<Command>> {
    tokio::time::timeout(RECV_TIMEOUT, agent.next_command())
        .await
        .map_err(|_| anyhow::anyhow!("recv timeout"))
}

#[test]
fn register_and_unregister_followers() {
    let hub = test_hub(4, OverflowPolicy::DropOldest);
    let a = hub.register_egress("a");
    let b = hub.register_egress("b");
    assert_eq!(hub.follower_count(), 2);
    assert!(hub.is_registered(a.id()));

    assert!(hub.unregister_egress(a.id()));
    assert!(!hub.unregister_egress(a.id()), "second unregister is a no-op");
    assert_eq!(hub.follower_count(), 1);

    drop(b);
    assert_eq!(hub.follower_count(), 0);

    // Dropping an agent that was already unregistered must not disturb the hub.
    drop(a);
    assert_eq!(hub.follower_count(), 0);
}

#[test]
fn broadcast_with_no_followers() -> anyhow::Result<()> {
    let hub = test_hub(4, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let delivery = hub.broadcast(&Command::Next {}, p.id())?;
    assert_eq!(delivery, Delivery::default());
    Ok(())
}

#[tokio::test]
async fn fan_out_reaches_every_follower_once() -> anyhow::Result<()> {
    let hub = test_hub(4, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let followers: Vec<_> = (0..3).map(|i| hub.register_egress(format!("f{i}"))).collect();

    let delivery = hub.broadcast(&Command::goto(7), p.id())?;
    assert_eq!(delivery.queued, 3);

    for f in &followers {
        assert_eq!(recv(f).await?, Some(Command::goto(7)));
        assert_eq!(hub.pending(f.id()), Some(0), "exactly one delivery");
    }

    let late = hub.register_egress("late");
    assert_eq!(hub.pending(late.id()), Some(0), "late follower sees no earlier broadcast");
    Ok(())
}

#[tokio::test]
async fn order_is_preserved_per_follower() -> anyhow::Result<()> {
    let hub = test_hub(16, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let f = hub.register_egress("f");

    let sent = [Command::goto(3), Command::Next {}, Command::Prev {}, Command::goto(9)];
    for cmd in &sent {
        hub.broadcast(cmd, p.id())?;
    }
    for cmd in &sent {
        assert_eq!(recv(&f).await?.as_ref(), Some(cmd));
    }
    Ok(())
}

#[test]
fn auth_is_never_broadcast() -> anyhow::Result<()> {
    let hub = test_hub(4, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let f = hub.register_egress("f");

    let result = hub.broadcast(&Command::Auth { token: "secret".into() }, p.id());
    assert_eq!(result, Err(AgentError::Forbidden));
    assert_eq!(hub.pending(f.id()), Some(0));
    Ok(())
}

#[test]
fn unregistered_presenter_cannot_broadcast() -> anyhow::Result<()> {
    let hub = test_hub(4, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let f = hub.register_egress("f");

    assert!(hub.unregister_ingress(p.id()));
    assert!(!hub.unregister_ingress(p.id()));
    assert_eq!(hub.broadcast(&Command::Next {}, p.id()), Err(AgentError::NotRegistered));
    assert_eq!(hub.pending(f.id()), Some(0));
    Ok(())
}

#[test]
fn empty_token_is_rejected_without_registration() {
    let hub = test_hub(4, OverflowPolicy::DropOldest);
    let result = hub.register_ingress("presenter", "");
    assert!(matches!(result, Err(AgentError::Misconfigured(_))));
    assert_eq!(hub.presenter_count(), 0);
}

#[tokio::test]
async fn unregister_drains_buffered_commands() -> anyhow::Result<()> {
    let hub = test_hub(8, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let f = hub.register_egress("f");

    hub.broadcast(&Command::goto(1), p.id())?;
    hub.broadcast(&Command::goto(2), p.id())?;
    assert_eq!(hub.pending(f.id()), Some(2));

    assert!(hub.unregister_egress(f.id()));
    assert!(!hub.is_registered(f.id()));
    assert_eq!(hub.pending(f.id()), None);
    // Buffered commands are discarded, not delivered.
    assert_eq!(recv(&f).await?, None);

    // Broadcasting afterwards neither errors nor reaches the old follower.
    let delivery = hub.broadcast(&Command::goto(3), p.id())?;
    assert_eq!(delivery.queued, 0);
    assert_eq!(recv(&f).await?, None);
    Ok(())
}

#[tokio::test]
async fn stalled_follower_does_not_block_others() -> anyhow::Result<()> {
    let hub = test_hub(2, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let stalled = hub.register_egress("stalled");
    let live = hub.register_egress("live");

    // Consume the live follower concurrently; never touch the stalled one.
    let consumer = tokio::spawn(async move {
        let mut got = Vec::new();
        while got.len() < 20 {
            match live.next_command().await {
                Some(cmd) => got.push(cmd),
                None => break,
            }
        }
        got
    });

    let broadcasts = async {
        for i in 0..20 {
            hub.broadcast(&Command::goto(i), p.id())?;
            tokio::task::yield_now().await;
        }
        anyhow::Ok(())
    };
    tokio::time::timeout(RECV_TIMEOUT, broadcasts)
        .await
        .map_err(|_| anyhow::anyhow!("broadcast blocked on a stalled follower"))??;

    // Registration still works while the stalled follower is full.
    let extra = hub.register_egress("extra");
    assert!(hub.unregister_egress(extra.id()));

    let got = tokio::time::timeout(RECV_TIMEOUT, consumer).await??;
    let expected: Vec<_> = (0..20).map(Command::goto).collect();
    assert_eq!(got, expected);

    // Drop-oldest leaves the latest two commands for the stalled follower.
    assert_eq!(hub.pending(stalled.id()), Some(2));
    assert_eq!(recv(&stalled).await?, Some(Command::goto(18)));
    assert_eq!(recv(&stalled).await?, Some(Command::goto(19)));
    Ok(())
}

#[test]
fn overflow_is_reported_per_follower() -> anyhow::Result<()> {
    let hub = test_hub(1, OverflowPolicy::DropNewest);
    let p = presenter(&hub)?;
    let _a = hub.register_egress("a");
    let _b = hub.register_egress("b");

    assert_eq!(hub.broadcast(&Command::Next {}, p.id())?, Delivery { queued: 2, overflowed: 0 });
    assert_eq!(hub.broadcast(&Command::Prev {}, p.id())?, Delivery { queued: 0, overflowed: 2 });
    Ok(())
}

#[test]
fn agent_id_displays_short() {
    let hub = test_hub(1, OverflowPolicy::DropOldest);
    let f = hub.register_egress("f");
    assert_eq!(f.id().to_string().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unregister_races_broadcast_without_late_delivery() -> anyhow::Result<()> {
    let hub = test_hub(4, OverflowPolicy::DropOldest);
    let p = presenter(&hub)?;
    let stop = tokio_util::sync::CancellationToken::new();

    let broadcaster = {
        let hub = Arc::clone(&hub);
        let stop = stop.clone();
        let from = p.id();
        tokio::spawn(async move {
            let mut sent = 0u32;
            while !stop.is_cancelled() {
                hub.broadcast(&Command::goto(sent), from)?;
                sent = sent.wrapping_add(1);
                tokio::task::yield_now().await;
            }
            anyhow::Ok(sent)
        })
    };

    let mut churners = Vec::new();
    for _ in 0..3 {
        let hub = Arc::clone(&hub);
        churners.push(tokio::spawn(async move {
            for _ in 0..200 {
                let f = hub.register_egress("churn");
                tokio::task::yield_now().await;
                assert!(hub.unregister_egress(f.id()));
                // Closed and drained: nothing buffered, nothing pushed later.
                assert_eq!(hub.pending(f.id()), None);
                assert_eq!(f.next_command().await, None);
            }
        }));
    }

    for churner in churners {
        tokio::time::timeout(RECV_TIMEOUT * 5, churner).await??;
    }
    stop.cancel();
    // Every broadcast succeeded while followers came and went.
    tokio::time::timeout(RECV_TIMEOUT, broadcaster).await???;
    assert_eq!(hub.follower_count(), 0);
    Ok(())
}
