//! Resettable countdown barrier for round-phase rendezvous.
//!
//! The table and its seats hand control to each other exclusively
//! through count changes on these barriers — there is no shared game
//! state lock behind a phase transition. A barrier releases every
//! waiter when its count reaches zero and can then be re-armed with
//! [`ResettableBarrier::reset`] for the next round.
//!
//! No off-the-shelf primitive covers this shape (`tokio::sync::Barrier`
//! cannot be counted up, down, or re-armed mid-flight), so the state is
//! an explicit `{count, releases}` pair inside a watch channel. The
//! monotonic `releases` counter is the generation token: a waiter that
//! was present when the count hit zero observes the release even if a
//! concurrent `reset()` restores the count before the waiter polls.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BarrierState {
    /// Remaining contributions before release. Never negative; a
    /// count-down at zero is a no-op.
    count: u32,
    /// Monotonic release counter. Incremented exactly once each time
    /// the count transitions to zero.
    releases: u64,
}

/// A count-based rendezvous that can be counted down, counted up,
/// force-set, and reset for reuse across rounds.
#[derive(Debug)]
pub struct ResettableBarrier {
    target: u32,
    state: watch::Sender<BarrierState>,
}

impl ResettableBarrier {
    /// Creates a barrier that releases after `target` count-downs.
    ///
    /// A target of zero starts released.
    pub fn new(target: u32) -> Self {
        let releases = u64::from(target == 0);
        let (state, _) = watch::channel(BarrierState {
            count: target,
            releases,
        });
        Self { target, state }
    }

    /// Blocks until the count reaches zero for the active generation.
    ///
    /// Returns immediately if the barrier is already released. A waiter
    /// present at the moment of a release is woken even if a concurrent
    /// [`reset`](Self::reset) re-arms the barrier before the waiter
    /// gets to run.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        let seen = rx.borrow().releases;
        // The sender lives in `self`, so the channel cannot close while
        // we hold `&self`; a closed-channel result is unreachable.
        let _ = rx
            .wait_for(|s| s.count == 0 || s.releases > seen)
            .await;
    }

    /// Decrements the count; on reaching zero, releases all current
    /// waiters exactly once. A count-down on a released barrier does
    /// nothing.
    pub fn count_down(&self) {
        self.state.send_modify(|s| {
            if s.count > 0 {
                s.count -= 1;
                if s.count == 0 {
                    s.releases += 1;
                    tracing::trace!(release = s.releases, "barrier released");
                }
            }
        });
    }

    /// Increments the count. If the barrier had already released, this
    /// starts a new generation: future [`wait`](Self::wait) calls block
    /// again until the count returns to zero.
    pub fn count_up(&self) {
        self.state.send_modify(|s| s.count += 1);
    }

    /// Sets the count directly, releasing waiters immediately when `n`
    /// is zero.
    pub fn set_count(&self, n: u32) {
        self.state.send_modify(|s| {
            let was = s.count;
            s.count = n;
            if n == 0 && was != 0 {
                s.releases += 1;
            }
        });
    }

    /// Restores the originally configured target and arms a fresh
    /// generation, regardless of the current count.
    pub fn reset(&self) {
        let target = self.target;
        self.state.send_modify(|s| s.count = target);
    }

    /// The current count.
    pub fn count(&self) -> u32 {
        self.state.borrow().count
    }

    /// The configured target restored by [`reset`](Self::reset).
    pub fn target(&self) -> u32 {
        self.target
    }
}
