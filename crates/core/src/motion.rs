//! Timed motion bookkeeping.
//!
//! A behavior that walks somewhere asserts forward motion and hands a
//! [`MotionPlan`] to the [`MotionScheduler`]. A separate task waits for the
//! earliest deadline and releases forward motion when it passes.
//!
//! Plans are never cancelled or merged. If Flee starts at t=0 (deadline
//! 2000) and Explore starts at t=1000 (deadline 4000), the Flee release at
//! t=2000 still stops the agent, cutting Explore short.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::action::ActionKind;
use crate::world::Vec3;

/// One scheduled release of forward motion.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlan {
    /// Which behavior asserted the motion
    pub behavior: ActionKind,
    /// Where it was heading
    pub target: Vec3,
    /// Logical time (ms) at which forward motion is released
    pub deadline_ms: u64,
}

/// Pending motion plans, ordered by deadline.
#[derive(Debug, Default)]
pub struct MotionScheduler {
    plans: Mutex<Vec<MotionPlan>>,
    changed: Notify,
}

impl MotionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn plans(&self) -> MutexGuard<'_, Vec<MotionPlan>> {
        self.plans.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a plan and wake the release task.
    pub fn schedule(&self, plan: MotionPlan) {
        {
            let mut plans = self.plans();
            // Equal deadlines keep insertion order
            let at = plans.partition_point(|p| p.deadline_ms <= plan.deadline_ms);
            plans.insert(at, plan);
        }
        self.changed.notify_one();
    }

    /// Remove and return every plan whose deadline is at or before `now_ms`.
    pub fn take_due(&self, now_ms: u64) -> Vec<MotionPlan> {
        let mut plans = self.plans();
        let due = plans.partition_point(|p| p.deadline_ms <= now_ms);
        plans.drain(..due).collect()
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.plans().first().map(|p| p.deadline_ms)
    }

    /// Snapshot of pending plans.
    pub fn pending(&self) -> Vec<MotionPlan> {
        self.plans().clone()
    }

    /// Resolves after the next [`schedule`](Self::schedule) call.
    ///
    /// A schedule that happened while nobody was waiting is remembered, so
    /// a waiter that checks [`next_deadline`](Self::next_deadline) first and
    /// then waits never misses a plan.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(behavior: ActionKind, deadline_ms: u64) -> MotionPlan {
        MotionPlan {
            behavior,
            target: Vec3::default(),
            deadline_ms,
        }
    }

    #[test]
    fn plans_are_kept_in_deadline_order() {
        let scheduler = MotionScheduler::new();
        scheduler.schedule(plan(ActionKind::Explore, 4000));
        scheduler.schedule(plan(ActionKind::Flee, 2000));
        scheduler.schedule(plan(ActionKind::Flee, 4000));

        let pending = scheduler.pending();
        assert_eq!(pending[0].deadline_ms, 2000);
        assert_eq!(pending[1].behavior, ActionKind::Explore);
        assert_eq!(pending[2].behavior, ActionKind::Flee);
        assert_eq!(scheduler.next_deadline(), Some(2000));
    }

    #[test]
    fn take_due_is_inclusive() {
        let scheduler = MotionScheduler::new();
        scheduler.schedule(plan(ActionKind::Flee, 2000));
        scheduler.schedule(plan(ActionKind::Explore, 3000));

        assert!(scheduler.take_due(1999).is_empty());
        let due = scheduler.take_due(2000);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].behavior, ActionKind::Flee);
        assert_eq!(scheduler.next_deadline(), Some(3000));
        assert_eq!(scheduler.take_due(10_000).len(), 1);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[tokio::test]
    async fn schedule_before_wait_is_not_lost() {
        let scheduler = MotionScheduler::new();
        scheduler.schedule(plan(ActionKind::Flee, 2000));
        tokio::time::timeout(std::time::Duration::from_secs(1), scheduler.changed())
            .await
            .expect("wake-up was lost");
    }
}
