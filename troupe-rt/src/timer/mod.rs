//! Per-actor keyed timer scheduler.
//!
//! Each actor owns one scheduler through its context. Timers deliver their
//! message to the owning actor's mailbox; the scheduler's lifetime is bound
//! to the actor, so disposal during stop or restart guarantees that no
//! timer message is delivered afterwards.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

// Layer 3: Internal module imports
use crate::actor::ActorRef;
use crate::message::{Envelope, Payload};

struct TimerEntry {
    epoch: u64,
    handle: JoinHandle<()>,
    repeating: bool,
    fixed_rate: bool,
}

struct TimerState {
    owner: ActorRef,
    disposed: AtomicBool,
    epoch: AtomicU64,
    entries: Mutex<HashMap<String, TimerEntry>>,
}

impl TimerState {
    /// Deliver one firing for `key` if the entry with `epoch` is still
    /// current. The check and the delivery happen under the entries lock,
    /// so a concurrent cancel either wins entirely or not at all.
    fn fire(&self, key: &str, epoch: u64, payload: Payload, remove_after: bool) -> bool {
        let mut entries = self.entries.lock();
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        match entries.get(key) {
            Some(entry) if entry.epoch == epoch => {}
            _ => return false,
        }
        if remove_after {
            entries.remove(key);
        }
        self.owner.tell_envelope(Envelope::new(payload));
        true
    }
}

/// Keyed timers for one actor: single-shot, fixed-delay, and fixed-rate.
///
/// Each key maps to at most one live timer; starting a timer under an
/// existing key cancels the prior one atomically. All operations are no-ops
/// after [`TimerScheduler::dispose`].
pub struct TimerScheduler {
    state: Arc<TimerState>,
}

impl TimerScheduler {
    pub(crate) fn new(owner: ActorRef) -> Self {
        Self {
            state: Arc::new(TimerState {
                owner,
                disposed: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Schedule a one-shot delivery of `message` after `delay`.
    pub fn start_single<M: Send + Sync + 'static>(&self, key: &str, message: M, delay: Duration) {
        let payload = Payload::new(message);
        self.install(key, false, false, |state, key, epoch| {
            tokio::spawn(async move {
                sleep(delay).await;
                let Some(state) = state.upgrade() else { return };
                state.fire(&key, epoch, payload, true);
            })
        });
    }

    /// Schedule repeated deliveries with at least `delay` between them,
    /// independent of handler runtime: each firing re-arms the next delay.
    pub fn start_fixed_delay<M: Send + Sync + 'static>(
        &self,
        key: &str,
        message: M,
        delay: Duration,
    ) {
        let payload = Payload::new(message);
        self.install(key, true, false, |state, key, epoch| {
            tokio::spawn(async move {
                loop {
                    sleep(delay).await;
                    let Some(state) = state.upgrade() else { return };
                    if !state.fire(&key, epoch, payload.clone(), false) {
                        return;
                    }
                }
            })
        });
    }

    /// Schedule deliveries at a target rate of one per `interval`.
    ///
    /// If a tick is missed the underlying timer catches up, so firings may
    /// bunch; the long-run rate is the target.
    pub fn start_fixed_rate<M: Send + Sync + 'static>(
        &self,
        key: &str,
        message: M,
        interval: Duration,
    ) {
        let payload = Payload::new(message);
        self.install(key, true, true, |state, key, epoch| {
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + interval, interval);
                loop {
                    ticker.tick().await;
                    let Some(state) = state.upgrade() else { return };
                    if !state.fire(&key, epoch, payload.clone(), false) {
                        return;
                    }
                }
            })
        });
    }

    /// Cancel the timer under `key`; no further deliveries for that key.
    pub fn cancel(&self, key: &str) {
        if let Some(entry) = self.state.entries.lock().remove(key) {
            entry.handle.abort();
        }
    }

    /// Cancel and remove every timer.
    pub fn cancel_all(&self) {
        let entries = std::mem::take(&mut *self.state.entries.lock());
        for entry in entries.into_values() {
            entry.handle.abort();
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        !self.is_disposed() && self.state.entries.lock().contains_key(key)
    }

    /// Keys of all currently active timers.
    pub fn active_timers(&self) -> Vec<String> {
        self.state.entries.lock().keys().cloned().collect()
    }

    /// Whether the timer under `key` repeats at a fixed rate.
    pub fn is_fixed_rate(&self, key: &str) -> bool {
        self.state
            .entries
            .lock()
            .get(key)
            .map(|e| e.repeating && e.fixed_rate)
            .unwrap_or(false)
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }

    /// Dispose the scheduler: cancel everything and refuse new timers.
    ///
    /// Called by the system during actor stop and restart.
    pub fn dispose(&self) {
        self.state.disposed.store(true, Ordering::Release);
        self.cancel_all();
    }

    fn install<S>(&self, key: &str, repeating: bool, fixed_rate: bool, spawn: S)
    where
        S: FnOnce(Weak<TimerState>, String, u64) -> JoinHandle<()>,
    {
        if self.is_disposed() {
            return;
        }
        let epoch = self.state.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let mut entries = self.state.entries.lock();
        if self.is_disposed() {
            return;
        }
        if let Some(prior) = entries.remove(key) {
            prior.handle.abort();
        }
        let handle = spawn(Arc::downgrade(&self.state), key.to_owned(), epoch);
        entries.insert(
            key.to_owned(),
            TimerEntry {
                epoch,
                handle,
                repeating,
                fixed_rate,
            },
        );
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::mailbox::Mailbox;
    use crate::observe::InMemoryMetrics;
    use crate::util::ActorId;

    // Long enough that the backing tasks never fire on their own; the tests
    // drive `fire` directly to pin down the epoch checks.
    const NEVER: Duration = Duration::from_secs(3600);

    fn scheduler() -> TimerScheduler {
        let mailbox = Arc::new(Mailbox::new(
            ActorId::from("owner"),
            Arc::new(Dispatcher::new()),
            Arc::new(InMemoryMetrics::new()),
        ));
        TimerScheduler::new(ActorRef::local(
            ActorId::from("owner"),
            mailbox,
            Weak::new(),
        ))
    }

    fn epoch_of(scheduler: &TimerScheduler, key: &str) -> u64 {
        scheduler
            .state
            .entries
            .lock()
            .get(key)
            .map(|entry| entry.epoch)
            .unwrap()
    }

    #[tokio::test]
    async fn test_fire_with_current_epoch_removes_single_shot() {
        let scheduler = scheduler();
        scheduler.start_single("k", 1u8, NEVER);
        let epoch = epoch_of(&scheduler, "k");

        assert!(scheduler.state.fire("k", epoch, Payload::new(1u8), true));
        assert!(!scheduler.is_active("k"));
    }

    #[tokio::test]
    async fn test_fire_with_stale_epoch_is_dropped() {
        let scheduler = scheduler();
        scheduler.start_single("k", 1u8, NEVER);
        let epoch = epoch_of(&scheduler, "k");

        assert!(!scheduler.state.fire("k", epoch + 1, Payload::new(1u8), true));
        // The stale firing must not evict the live entry.
        assert!(scheduler.is_active("k"));
    }

    #[tokio::test]
    async fn test_rearming_bumps_the_epoch() {
        let scheduler = scheduler();
        scheduler.start_single("k", 1u8, NEVER);
        let first = epoch_of(&scheduler, "k");
        scheduler.start_single("k", 2u8, NEVER);
        let second = epoch_of(&scheduler, "k");
        assert!(second > first);

        // A firing armed before the replacement can no longer deliver.
        assert!(!scheduler.state.fire("k", first, Payload::new(1u8), true));
        assert!(scheduler.is_active("k"));
        assert!(scheduler.state.fire("k", second, Payload::new(2u8), true));
        assert!(!scheduler.is_active("k"));
    }

    #[tokio::test]
    async fn test_fire_after_dispose_is_dropped() {
        let scheduler = scheduler();
        scheduler.start_single("k", 1u8, NEVER);
        let epoch = epoch_of(&scheduler, "k");
        scheduler.dispose();

        // Even a firing holding the current epoch is refused once disposed.
        assert!(!scheduler.state.fire("k", epoch, Payload::new(1u8), true));
    }

    #[tokio::test]
    async fn test_install_after_dispose_is_noop() {
        let scheduler = scheduler();
        scheduler.dispose();

        scheduler.start_single("single", 1u8, NEVER);
        scheduler.start_fixed_delay("delay", 1u8, NEVER);
        scheduler.start_fixed_rate("rate", 1u8, NEVER);

        assert!(!scheduler.is_active("single"));
        assert!(scheduler.active_timers().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_removes_only_the_named_key() {
        let scheduler = scheduler();
        scheduler.start_single("a", 1u8, NEVER);
        scheduler.start_fixed_delay("b", 1u8, NEVER);
        assert_eq!(scheduler.active_timers().len(), 2);

        scheduler.cancel("a");
        assert!(!scheduler.is_active("a"));
        assert!(scheduler.is_active("b"));

        scheduler.cancel_all();
        assert!(scheduler.active_timers().is_empty());
    }

    #[tokio::test]
    async fn test_fixed_rate_flag_reflects_timer_kind() {
        let scheduler = scheduler();
        scheduler.start_fixed_rate("rate", 1u8, NEVER);
        scheduler.start_fixed_delay("delay", 1u8, NEVER);

        assert!(scheduler.is_fixed_rate("rate"));
        assert!(!scheduler.is_fixed_rate("delay"));
        assert!(!scheduler.is_fixed_rate("missing"));
    }
}
