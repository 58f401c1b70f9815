//! Basic Actor Example - Tell and Ask Fundamentals
//!
//! Demonstrates spawning an actor, fire-and-forget `tell`, and the typed
//! request/response `ask` pattern.
//!
//! # Run This Example
//!
//! ```bash
//! cargo run --example counter_basic
//! ```

use async_trait::async_trait;
use std::time::Duration;
use troupe_rt::prelude::*;

// =============================================================================
// Message Definitions
// =============================================================================

// Messages are plain values; the actor downcasts at its handler boundary.
#[derive(Debug)]
struct Increment {
    delta: u64,
}

#[derive(Debug)]
struct GetCount;

// =============================================================================
// Actor Definition
// =============================================================================

#[derive(Default)]
struct CounterActor {
    count: u64,
}

#[async_trait]
impl Actor for CounterActor {
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(increment) = message.downcast_ref::<Increment>() {
            self.count += increment.delta;
            println!("[{}] count is now {}", ctx.actor_id(), self.count);
        } else if message.is::<GetCount>() {
            // Ask replies are the response value itself.
            ctx.reply(self.count);
        }
        Ok(())
    }

    async fn pre_start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        println!("[{}] starting", ctx.actor_id());
        Ok(())
    }

    async fn post_stop(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        println!("[{}] stopped at count {}", ctx.actor_id(), self.count);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let system = ActorSystem::new(SystemConfig::default());
    let counter = system.spawn("counter", CounterActor::default).await?;

    counter.tell(Increment { delta: 10 }, None);
    counter.tell(Increment { delta: 20 }, None);
    counter.tell(Increment { delta: 15 }, None);

    let count: u64 = counter
        .ask(GetCount, Some(Duration::from_secs(1)))
        .await?;
    println!("final count: {count}");
    assert_eq!(count, 45);

    system.shutdown().await?;
    Ok(())
}
