//! Timer scheduler and event bus tests.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use troupe_rt::bus::BusEvent;
use troupe_rt::prelude::*;

async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        if Instant::now() > deadline {
            panic!("condition not reached within deadline");
        }
        sleep(Duration::from_millis(5)).await;
    }
}

/// Timer control messages.
#[derive(Debug)]
struct ArmSingle {
    key: &'static str,
    tag: u32,
    delay: Duration,
}

#[derive(Debug)]
struct ArmFixedDelay {
    key: &'static str,
    tag: u32,
    delay: Duration,
}

#[derive(Debug)]
struct ArmFixedRate {
    key: &'static str,
    tag: u32,
    interval: Duration,
}

#[derive(Debug)]
struct CancelKey(&'static str);

#[derive(Debug, Clone)]
struct Tick(u32);

struct TimerActor {
    ticks: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Actor for TimerActor {
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(arm) = message.downcast_ref::<ArmSingle>() {
            ctx.timers().start_single(arm.key, Tick(arm.tag), arm.delay);
        } else if let Some(arm) = message.downcast_ref::<ArmFixedDelay>() {
            ctx.timers().start_fixed_delay(arm.key, Tick(arm.tag), arm.delay);
        } else if let Some(arm) = message.downcast_ref::<ArmFixedRate>() {
            ctx.timers().start_fixed_rate(arm.key, Tick(arm.tag), arm.interval);
        } else if let Some(CancelKey(key)) = message.downcast_ref::<CancelKey>() {
            ctx.timers().cancel(key);
        } else if let Some(Tick(tag)) = message.downcast_ref::<Tick>() {
            self.ticks.lock().push(*tag);
        }
        Ok(())
    }
}

async fn spawn_timer_actor(system: &ActorSystem) -> (ActorRef, Arc<Mutex<Vec<u32>>>) {
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let actor = {
        let ticks = ticks.clone();
        system
            .spawn("timers", move || TimerActor {
                ticks: ticks.clone(),
            })
            .await
            .unwrap()
    };
    (actor, ticks)
}

#[tokio::test]
async fn test_single_shot_fires_exactly_once() {
    let system = ActorSystem::new(SystemConfig::default());
    let (actor, ticks) = spawn_timer_actor(&system).await;

    actor.tell(
        ArmSingle {
            key: "once",
            tag: 1,
            delay: Duration::from_millis(20),
        },
        None,
    );

    wait_for(|| !ticks.lock().is_empty()).await;
    sleep(Duration::from_millis(60)).await;
    assert_eq!(*ticks.lock(), vec![1]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rearming_a_key_cancels_the_prior_timer() {
    let system = ActorSystem::new(SystemConfig::default());
    let (actor, ticks) = spawn_timer_actor(&system).await;

    actor.tell(
        ArmSingle {
            key: "k",
            tag: 1,
            delay: Duration::from_millis(50),
        },
        None,
    );
    actor.tell(
        ArmSingle {
            key: "k",
            tag: 2,
            delay: Duration::from_millis(15),
        },
        None,
    );

    sleep(Duration::from_millis(120)).await;
    // Only the replacement fired; the original was cancelled atomically.
    assert_eq!(*ticks.lock(), vec![2]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fixed_delay_repeats_with_minimum_gap() {
    let system = ActorSystem::new(SystemConfig::default());
    let (actor, ticks) = spawn_timer_actor(&system).await;

    let started = Instant::now();
    actor.tell(
        ArmFixedDelay {
            key: "beat",
            tag: 7,
            delay: Duration::from_millis(20),
        },
        None,
    );

    wait_for(|| ticks.lock().len() >= 3).await;
    // Three deliveries need at least three full delays.
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert!(ticks.lock().iter().all(|tag| *tag == 7));

    actor.tell(CancelKey("beat"), None);
    sleep(Duration::from_millis(50)).await;
    let settled = ticks.lock().len();
    sleep(Duration::from_millis(60)).await;
    assert_eq!(ticks.lock().len(), settled);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fixed_rate_ticks_at_target_rate() {
    let system = ActorSystem::new(SystemConfig::default());
    let (actor, ticks) = spawn_timer_actor(&system).await;

    actor.tell(
        ArmFixedRate {
            key: "rate",
            tag: 9,
            interval: Duration::from_millis(15),
        },
        None,
    );

    wait_for(|| ticks.lock().len() >= 4).await;
    actor.tell(CancelKey("rate"), None);
    sleep(Duration::from_millis(40)).await;
    let settled = ticks.lock().len();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(ticks.lock().len(), settled);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stop_disposes_timers_before_they_fire() {
    let system = ActorSystem::new(SystemConfig::default());
    let (actor, ticks) = spawn_timer_actor(&system).await;

    actor.tell(
        ArmSingle {
            key: "late",
            tag: 1,
            delay: Duration::from_millis(40),
        },
        None,
    );
    // Let the arm message be processed, then stop before the timer fires.
    sleep(Duration::from_millis(10)).await;
    system.stop(&actor).await.unwrap();

    sleep(Duration::from_millis(80)).await;
    assert!(ticks.lock().is_empty());

    system.shutdown().await.unwrap();
}

/// Event types routed by the bus.
#[derive(Debug, Clone)]
struct OrderCreated {
    order_id: u32,
}

#[derive(Debug, Clone)]
struct OrderShipped;

struct OrderListener {
    seen: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Actor for OrderListener {
    async fn pre_start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        ctx.subscribe::<OrderCreated>()?;
        Ok(())
    }

    async fn handle(&mut self, message: Payload, _ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(event) = message.downcast_ref::<OrderCreated>() {
            self.seen.lock().push(event.order_id);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_publish_reaches_exact_type_subscribers() {
    let system = ActorSystem::new(SystemConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let _listener = {
        let seen = seen.clone();
        system
            .spawn("listener", move || OrderListener { seen: seen.clone() })
            .await
            .unwrap()
    };

    assert_eq!(system.publish(OrderCreated { order_id: 41 }), 1);
    assert_eq!(system.publish(OrderShipped), 0);

    wait_for(|| !seen.lock().is_empty()).await;
    assert_eq!(*seen.lock(), vec![41]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stop_cleans_up_subscriptions() {
    let system = ActorSystem::new(SystemConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let listener = {
        let seen = seen.clone();
        system
            .spawn("listener", move || OrderListener { seen: seen.clone() })
            .await
            .unwrap()
    };

    assert_eq!(system.event_bus().subscriber_count(), 1);
    assert_eq!(system.event_bus().subscription_count(), 1);

    system.stop(&listener).await.unwrap();

    assert_eq!(system.event_bus().subscriber_count(), 0);
    assert_eq!(system.event_bus().subscription_count(), 0);
    assert_eq!(system.publish(OrderCreated { order_id: 1 }), 0);

    let cleanups = system
        .event_bus()
        .events()
        .iter()
        .filter(|event| matches!(event, BusEvent::Cleanup { .. }))
        .count();
    assert_eq!(cleanups, 1);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_publish_shares_one_event_across_subscribers() {
    let system = ActorSystem::new(SystemConfig::default());
    let seen_a = Arc::new(Mutex::new(Vec::new()));
    let seen_b = Arc::new(Mutex::new(Vec::new()));
    for (name, seen) in [("a", seen_a.clone()), ("b", seen_b.clone())] {
        let seen = seen.clone();
        system
            .spawn(name, move || OrderListener { seen: seen.clone() })
            .await
            .unwrap();
    }

    assert_eq!(system.publish(OrderCreated { order_id: 7 }), 2);
    wait_for(|| !seen_a.lock().is_empty() && !seen_b.lock().is_empty()).await;
    assert_eq!(*seen_a.lock(), vec![7]);
    assert_eq!(*seen_b.lock(), vec![7]);

    system.shutdown().await.unwrap();
}
