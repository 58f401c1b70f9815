//! Supervision tree and router pool tests.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use troupe_rt::observe::{names, InMemoryMetrics};
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

#[derive(Default)]
struct Counter {
    count: u64,
}

#[async_trait]
impl Actor for Counter {
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
        match message.downcast_ref::<&str>() {
            Some(&"increment") => self.count += 1,
            Some(&"get") => ctx.reply(self.count),
            Some(&"fail") => anyhow::bail!("instructed to fail"),
            _ => {}
        }
        Ok(())
    }
}

async fn count_of(actor: &ActorRef) -> u64 {
    actor
        .ask("get", Some(Duration::from_secs(1)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_one_for_one_restart_leaves_siblings_untouched() {
    let system = ActorSystem::new(SystemConfig::default());
    let supervisor = system
        .spawn_supervisor("sup", Arc::new(OneForOneStrategy::always_restart()))
        .await
        .unwrap();

    let c1 = supervisor.supervise("c1", Counter::default).await.unwrap();
    let c2 = supervisor.supervise("c2", Counter::default).await.unwrap();

    c2.tell("increment", None);
    wait_for({
        let c2 = c2.clone();
        move || c2.is_alive()
    })
    .await;

    c1.tell("fail", None);
    wait_for({
        let c1 = c1.clone();
        move || !c1.is_alive()
    })
    .await;

    // The sibling kept its state across the restart of c1.
    assert!(c2.is_alive());
    assert_eq!(count_of(&c2).await, 1);

    // c1 came back under the same id with fresh state.
    let new_c1 = supervisor.child_ref("c1").unwrap();
    assert!(new_c1.is_alive());
    assert_eq!(count_of(&new_c1).await, 0);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_all_for_one_restart_recreates_every_sibling() {
    let system = ActorSystem::new(SystemConfig::default());
    let supervisor = system
        .spawn_supervisor("sup", Arc::new(AllForOneStrategy::new(5, None)))
        .await
        .unwrap();

    let c1 = supervisor.supervise("c1", Counter::default).await.unwrap();
    let c2 = supervisor.supervise("c2", Counter::default).await.unwrap();

    c2.tell("increment", None);
    assert_eq!(count_of(&c2).await, 1);

    c1.tell("fail", None);
    wait_for({
        let c2 = c2.clone();
        move || !c2.is_alive()
    })
    .await;
    assert!(!c1.is_alive());

    // Both children were recreated; prior state is gone.
    let new_c2 = supervisor.child_ref("c2").unwrap();
    assert_eq!(count_of(&new_c2).await, 0);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_retry_cap_forces_stop() {
    let system = ActorSystem::new(SystemConfig::default());
    let supervisor = system
        .spawn_supervisor("sup", Arc::new(OneForOneStrategy::new(1, None)))
        .await
        .unwrap();
    let child = supervisor.supervise("c", Counter::default).await.unwrap();
    let child_id = child.id().clone();

    // First failure: restarted.
    child.tell("fail", None);
    wait_for({
        let child = child.clone();
        move || !child.is_alive()
    })
    .await;
    wait_for({
        let system = system.clone();
        let child_id = child_id.clone();
        move || system.get(&child_id).is_some_and(|r| r.is_alive())
    })
    .await;

    // Second failure: budget exhausted, the child is stopped for good.
    let restarted = system.get(&child_id).unwrap();
    restarted.tell("fail", None);
    wait_for({
        let system = system.clone();
        let child_id = child_id.clone();
        move || system.get(&child_id).is_none()
    })
    .await;

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_resume_keeps_child_state() {
    let system = ActorSystem::new(SystemConfig::default());
    let strategy = OneForOneStrategy::with_decider(
        5,
        None,
        Arc::new(|_, _| SupervisionDecision::Resume),
    );
    let supervisor = system
        .spawn_supervisor("sup", Arc::new(strategy))
        .await
        .unwrap();
    let child = supervisor.supervise("c", Counter::default).await.unwrap();

    child.tell("increment", None);
    assert_eq!(count_of(&child).await, 1);

    child.tell("fail", None);
    // The backlog keeps draining on the same instance.
    child.tell("increment", None);
    assert_eq!(count_of(&child).await, 2);
    assert!(child.is_alive());

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unsupervised_failure_stops_the_actor() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let system = ActorSystem::new(SystemConfig::default().with_metrics(metrics.clone()));
    let loner = system.spawn("loner", Counter::default).await.unwrap();

    loner.tell("fail", None);
    wait_for({
        let loner = loner.clone();
        move || !loner.is_alive()
    })
    .await;

    assert!(system.get(&ActorId::from("loner")).is_none());
    assert_eq!(metrics.counter(names::ACTORS_FAILED), 1);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_escalation_walks_to_the_grandparent() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let system = ActorSystem::new(SystemConfig::default().with_metrics(metrics.clone()));

    let _top = system
        .spawn_supervisor("top", Arc::new(OneForOneStrategy::always_restart()))
        .await
        .unwrap();
    let mid = system
        .spawn_supervisor(
            "top/mid",
            Arc::new(OneForOneStrategy::with_decider(
                5,
                None,
                Arc::new(|_, _| SupervisionDecision::Escalate),
            )),
        )
        .await
        .unwrap();
    let child = mid.supervise("c", Counter::default).await.unwrap();

    child.tell("fail", None);
    // The mid supervisor escalates; the grandparent restarts the mid
    // supervisor itself.
    wait_for({
        let metrics = metrics.clone();
        move || metrics.tagged_counter(names::ACTORS_RESTARTED, &[("actorId", "top/mid")]) == 1
    })
    .await;

    // The respawned supervisor must still arbitrate for its children: a
    // second failure walks the same escalation path instead of orphaning
    // the child.
    child.tell("fail", None);
    wait_for({
        let metrics = metrics.clone();
        move || metrics.tagged_counter(names::ACTORS_RESTARTED, &[("actorId", "top/mid")]) == 2
    })
    .await;
    assert!(system.get(child.id()).is_some_and(|c| c.is_alive()));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_escalation_without_grandparent_stops_the_child() {
    let system = ActorSystem::new(SystemConfig::default());
    let supervisor = system
        .spawn_supervisor(
            "sup",
            Arc::new(OneForOneStrategy::with_decider(
                5,
                None,
                Arc::new(|_, _| SupervisionDecision::Escalate),
            )),
        )
        .await
        .unwrap();
    let child = supervisor.supervise("c", Counter::default).await.unwrap();
    let child_id = child.id().clone();

    child.tell("fail", None);
    wait_for({
        let system = system.clone();
        move || system.get(&child_id).is_none()
    })
    .await;

    system.shutdown().await.unwrap();
}

struct EchoWorker;

#[async_trait]
impl Actor for EchoWorker {
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(text) = message.downcast_ref::<String>() {
            if text == "fail" {
                anyhow::bail!("worker failure");
            }
            ctx.reply(text.clone());
        }
        Ok(())
    }
}

struct Probe {
    received: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Actor for Probe {
    async fn handle(&mut self, message: Payload, _ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(text) = message.downcast_ref::<String>() {
            self.received.lock().push(text.clone());
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_round_robin_pool_preserves_order_and_sender() {
    let system = ActorSystem::new(SystemConfig::default());
    let received = Arc::new(Mutex::new(Vec::new()));
    let probe = {
        let received = received.clone();
        system
            .spawn("probe", move || Probe {
                received: received.clone(),
            })
            .await
            .unwrap()
    };

    let pool = system
        .spawn_pool("pool", || EchoWorker, RouterConfig::new(2))
        .await
        .unwrap();

    for tag in ["m1", "m2", "m3", "m4"] {
        pool.tell(tag.to_owned(), Some(probe.clone()));
    }

    wait_for(|| received.lock().len() == 4).await;
    assert_eq!(
        *received.lock(),
        vec!["m1".to_owned(), "m2".into(), "m3".into(), "m4".into()]
    );

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pool_worker_restart_keeps_routing() {
    let system = ActorSystem::new(SystemConfig::default());
    let received = Arc::new(Mutex::new(Vec::new()));
    let probe = {
        let received = received.clone();
        system
            .spawn("probe", move || Probe {
                received: received.clone(),
            })
            .await
            .unwrap()
    };

    let pool = system
        .spawn_pool("pool", || EchoWorker, RouterConfig::new(2))
        .await
        .unwrap();

    // Kill one worker; the default pool supervision restarts it.
    pool.tell("fail".to_owned(), Some(probe.clone()));
    sleep(Duration::from_millis(50)).await;

    for tag in ["a", "b", "c", "d"] {
        pool.tell(tag.to_owned(), Some(probe.clone()));
    }
    wait_for(|| received.lock().len() >= 4).await;
    assert_eq!(
        *received.lock(),
        vec!["a".to_owned(), "b".into(), "c".into(), "d".into()]
    );

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_restart_metric_is_tagged_with_the_actor() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let system = ActorSystem::new(SystemConfig::default().with_metrics(metrics.clone()));
    let supervisor = system
        .spawn_supervisor("sup", Arc::new(OneForOneStrategy::always_restart()))
        .await
        .unwrap();
    let child = supervisor.supervise("c1", Counter::default).await.unwrap();

    child.tell("fail", None);
    wait_for({
        let metrics = metrics.clone();
        move || metrics.tagged_counter(names::ACTORS_RESTARTED, &[("actorId", "sup/c1")]) == 1
    })
    .await;

    system.shutdown().await.unwrap();
}
