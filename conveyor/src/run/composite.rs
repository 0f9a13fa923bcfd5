//! Composite step tracking.
//!
//! A composite stage fans out into N parallel sub-jobs submitted as one
//! group to the execution runtime. Stage-level completion needs two
//! independent signals: the group handle reporting that every sub-job has
//! reached a terminal state, and an explicit acknowledgement for each
//! sub-job from the completion callbacks. The signals are not redundant -
//! an individual sub-job's callback can race the group's aggregate
//! readiness, so the stage is only complete once both agree.

use std::fmt::Debug;
use std::sync::Arc;

/// Handle to a group of parallel sub-job results owned by the execution
/// runtime.
pub trait SubJobGroup: Send + Sync + Debug {
    /// The number of sub-jobs in the group.
    fn job_count(&self) -> usize;

    /// Returns true once every sub-job in the group has reached a terminal
    /// state.
    fn ready(&self) -> bool;

    /// Returns true if every sub-job in the group succeeded.
    fn successful(&self) -> bool;
}

/// Tracks a single stage's fan-out into parallel sub-jobs.
#[derive(Debug, Clone)]
pub struct CompositeStepTracker {
    group: Arc<dyn SubJobGroup>,
    remaining: usize,
}

impl CompositeStepTracker {
    /// Creates a tracker for the given sub-job group. The countdown starts
    /// at the group's job count.
    #[must_use]
    pub fn new(group: Arc<dyn SubJobGroup>) -> Self {
        let remaining = group.job_count();
        Self { group, remaining }
    }

    /// Acknowledges the completion of one sub-job.
    pub fn acknowledge(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Returns the number of sub-jobs not yet acknowledged.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Returns true once the group reports ready and every sub-job has been
    /// acknowledged.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.group.ready() && self.remaining == 0
    }

    /// Returns true if every sub-job in the group succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.group.successful()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct TestGroup {
        count: usize,
        ready: AtomicBool,
        successful: AtomicBool,
    }

    impl TestGroup {
        fn new(count: usize) -> Self {
            Self {
                count,
                ready: AtomicBool::new(false),
                successful: AtomicBool::new(false),
            }
        }
    }

    impl SubJobGroup for TestGroup {
        fn job_count(&self) -> usize {
            self.count
        }

        fn ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn successful(&self) -> bool {
            self.successful.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_countdown_starts_at_job_count() {
        let tracker = CompositeStepTracker::new(Arc::new(TestGroup::new(3)));
        assert_eq!(tracker.remaining(), 3);
        assert!(!tracker.is_complete());
    }

    #[test]
    fn test_complete_requires_both_signals() {
        let group = Arc::new(TestGroup::new(2));
        let mut tracker = CompositeStepTracker::new(group.clone());

        // All acknowledgements in, group not yet ready
        tracker.acknowledge();
        tracker.acknowledge();
        assert!(!tracker.is_complete());

        // Group ready too
        group.ready.store(true, Ordering::SeqCst);
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_ready_group_with_pending_acknowledgements() {
        let group = Arc::new(TestGroup::new(2));
        let mut tracker = CompositeStepTracker::new(group.clone());

        group.ready.store(true, Ordering::SeqCst);
        assert!(!tracker.is_complete());

        tracker.acknowledge();
        assert!(!tracker.is_complete());

        tracker.acknowledge();
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_successful_tracks_group() {
        let group = Arc::new(TestGroup::new(1));
        let tracker = CompositeStepTracker::new(group.clone());

        assert!(!tracker.is_successful());
        group.successful.store(true, Ordering::SeqCst);
        assert!(tracker.is_successful());
    }

    #[test]
    fn test_acknowledge_saturates() {
        let mut tracker = CompositeStepTracker::new(Arc::new(TestGroup::new(1)));
        tracker.acknowledge();
        tracker.acknowledge();
        assert_eq!(tracker.remaining(), 0);
    }
}
