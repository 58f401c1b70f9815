// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::util::ActorId;

/// Decision a strategy returns for a failed child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionDecision {
    /// Leave the child as is; its mailbox backlog keeps draining.
    Resume,
    /// Stop the old instance and respawn a fresh one under the same id.
    Restart,
    /// Stop the child and drop it from supervision.
    Stop,
    /// Defer to the supervisor's own parent.
    Escalate,
}

/// User-supplied decision function consulted on each failure.
pub type Decider = Arc<dyn Fn(&ActorId, &anyhow::Error) -> SupervisionDecision + Send + Sync>;

/// A supervision strategy: decides a child's fate on failure.
///
/// `restart_all` selects one-for-one (false) versus all-for-one (true)
/// restart semantics when the decision is [`SupervisionDecision::Restart`].
pub trait SupervisionStrategy: Send + Sync + 'static {
    fn handle(&self, child: &ActorId, error: &anyhow::Error) -> SupervisionDecision;

    fn restart_all(&self) -> bool {
        false
    }
}

#[derive(Clone, Copy)]
struct RetryState {
    count: u32,
    last: Instant,
}

fn decide_with_cap(
    state: &mut RetryState,
    max_retries: u32,
    within: Option<Duration>,
    decider: &Decider,
    child: &ActorId,
    error: &anyhow::Error,
) -> SupervisionDecision {
    // A quiet period longer than the window resets the counter.
    if let Some(window) = within {
        if state.count > 0 && state.last.elapsed() > window {
            state.count = 0;
        }
    }
    if state.count >= max_retries {
        return SupervisionDecision::Stop;
    }
    let decision = decider(child, error);
    if decision == SupervisionDecision::Restart {
        state.count += 1;
        state.last = Instant::now();
    }
    decision
}

/// One-for-one supervision: each child has its own retry budget and only
/// the failed child is restarted.
///
/// # Example
/// ```rust
/// use troupe_rt::supervision::{OneForOneStrategy, SupervisionStrategy, SupervisionDecision};
/// use troupe_rt::util::ActorId;
///
/// let strategy = OneForOneStrategy::new(2, None);
/// let child = ActorId::from("sup/c1");
/// let error = anyhow::anyhow!("boom");
/// assert_eq!(strategy.handle(&child, &error), SupervisionDecision::Restart);
/// ```
pub struct OneForOneStrategy {
    max_retries: u32,
    within: Option<Duration>,
    decider: Decider,
    state: Mutex<HashMap<ActorId, RetryState>>,
}

impl OneForOneStrategy {
    /// Strategy with the default decider (always restart).
    pub fn new(max_retries: u32, within: Option<Duration>) -> Self {
        Self::with_decider(max_retries, within, always_restart_decider())
    }

    pub fn with_decider(max_retries: u32, within: Option<Duration>, decider: Decider) -> Self {
        Self {
            max_retries,
            within,
            decider,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Unbounded always-restart profile, the router default.
    pub fn always_restart() -> Self {
        Self::new(u32::MAX, None)
    }

    /// Retry count currently recorded for a child.
    pub fn retries_for(&self, child: &ActorId) -> u32 {
        self.state.lock().get(child).map(|s| s.count).unwrap_or(0)
    }
}

impl SupervisionStrategy for OneForOneStrategy {
    fn handle(&self, child: &ActorId, error: &anyhow::Error) -> SupervisionDecision {
        let mut state = self.state.lock();
        let entry = state.entry(child.clone()).or_insert(RetryState {
            count: 0,
            last: Instant::now(),
        });
        decide_with_cap(entry, self.max_retries, self.within, &self.decider, child, error)
    }
}

/// All-for-one supervision: one shared retry budget, and a restart decision
/// recreates every supervised sibling, not only the failed child.
pub struct AllForOneStrategy {
    max_retries: u32,
    within: Option<Duration>,
    decider: Decider,
    state: Mutex<RetryState>,
}

impl AllForOneStrategy {
    pub fn new(max_retries: u32, within: Option<Duration>) -> Self {
        Self::with_decider(max_retries, within, always_restart_decider())
    }

    pub fn with_decider(max_retries: u32, within: Option<Duration>, decider: Decider) -> Self {
        Self {
            max_retries,
            within,
            decider,
            state: Mutex::new(RetryState {
                count: 0,
                last: Instant::now(),
            }),
        }
    }

    pub fn retries(&self) -> u32 {
        self.state.lock().count
    }
}

impl SupervisionStrategy for AllForOneStrategy {
    fn handle(&self, child: &ActorId, error: &anyhow::Error) -> SupervisionDecision {
        let mut state = self.state.lock();
        decide_with_cap(
            &mut state,
            self.max_retries,
            self.within,
            &self.decider,
            child,
            error,
        )
    }

    fn restart_all(&self) -> bool {
        true
    }
}

fn always_restart_decider() -> Decider {
    Arc::new(|_child, _error| SupervisionDecision::Restart)
}
