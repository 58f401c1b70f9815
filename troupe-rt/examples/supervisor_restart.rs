//! Supervision Example - One-For-One Restart
//!
//! A supervisor owns two children; one is told to fail. The one-for-one
//! strategy restarts only the failed child while its sibling keeps running
//! with its state intact.
//!
//! # Run This Example
//!
//! ```bash
//! cargo run --example supervisor_restart
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use troupe_rt::prelude::*;

#[derive(Default)]
struct Worker {
    handled: u64,
}

#[async_trait]
impl Actor for Worker {
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
        match message.downcast_ref::<&str>() {
            Some(&"work") => {
                self.handled += 1;
                println!("[{}] handled {} jobs", ctx.actor_id(), self.handled);
            }
            Some(&"crash") => anyhow::bail!("simulated crash"),
            Some(&"report") => ctx.reply(self.handled),
            _ => {}
        }
        Ok(())
    }

    async fn pre_start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        println!("[{}] (re)starting", ctx.actor_id());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let system = ActorSystem::new(SystemConfig::default());
    let supervisor = system
        .spawn_supervisor("jobs", Arc::new(OneForOneStrategy::new(3, None)))
        .await?;

    let alpha = supervisor.supervise("alpha", Worker::default).await?;
    let beta = supervisor.supervise("beta", Worker::default).await?;

    beta.tell("work", None);
    beta.tell("work", None);
    alpha.tell("crash", None);

    // Give the failure and restart a moment to play out.
    sleep(Duration::from_millis(100)).await;

    let beta_jobs: u64 = beta.ask("report", Some(Duration::from_secs(1))).await?;
    println!("beta survived the restart with {beta_jobs} jobs handled");

    // The child came back under the same id with fresh state.
    if let Some(alpha) = supervisor.child_ref("alpha") {
        let alpha_jobs: u64 = alpha.ask("report", Some(Duration::from_secs(1))).await?;
        println!("alpha came back fresh with {alpha_jobs} jobs handled");
    }

    system.shutdown().await?;
    Ok(())
}
