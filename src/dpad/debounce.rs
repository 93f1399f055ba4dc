//! Debounce controller for pad direction changes.
//!
//! Holds the committed direction, the latest requested direction and at most
//! one deferred-commit deadline. A running countdown is never restarted: later
//! samples only move the target, and the commit that eventually fires uses
//! whatever the target is at that moment. A sample that returns to the
//! committed direction abandons the countdown without committing.
//!
//! ```text
//!            submit (target != committed)
//!   Idle ───────────────────────────────────► Pending(deadline)
//!    ▲                                          │   │
//!    │  submit (target == committed): cancel    │   │ submit: move target,
//!    ├──────────────────────────────────────────┘   │ keep deadline
//!    │  poll past deadline / bypass: commit         │
//!    └──────────────────────────────────────────────┘
//! ```
//!
//! The controller is clock-agnostic: callers pass `now` and drive
//! [`DebounceController::poll`] from their own event loop.

use crate::dpad::direction::{Direction, DpadButtonId};
use crate::dpad::mode::DpadMode;
use crate::dpad::transition::{plan_transitions, TransitionPlan};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Idle,
    Pending { deadline: Instant },
}

/// Coarse stick activity signalled while submitting a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The pad left center while nothing was committed
    Started(Direction),
    /// The pad reported center
    Released,
}

/// What the controller decided to do with a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Same as the latched target; nothing changed
    Ignored,
    /// Caller must commit right away
    CommitNow,
    /// A new countdown was started
    Scheduled { deadline: Instant },
    /// A countdown was already running and keeps running
    Coalesced { deadline: Instant },
    /// The target returned to the committed direction and the countdown was dropped
    Cancelled,
    /// The target equals the committed direction and no countdown was running
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub decision: SubmitDecision,
    pub activity: Option<Activity>,
}

#[derive(Debug, Clone, Default)]
pub struct DebounceController {
    committed: Direction,
    pending: Direction,
    timer: TimerState,
    diagonal_lock: Option<DpadButtonId>,
}

impl DebounceController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> Direction {
        self.committed
    }

    pub fn pending(&self) -> Direction {
        self.pending
    }

    pub fn diagonal_lock(&self) -> Option<DpadButtonId> {
        self.diagonal_lock
    }

    pub fn timer(&self) -> TimerState {
        self.timer
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.timer {
            TimerState::Idle => None,
            TimerState::Pending { deadline } => Some(deadline),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.timer, TimerState::Pending { .. })
    }

    /// Feeds one raw sample into the controller.
    ///
    /// A zero `delay` behaves like `bypass_delay`.
    pub fn submit(
        &mut self,
        raw: Direction,
        bypass_delay: bool,
        delay: Duration,
        now: Instant,
    ) -> SubmitOutcome {
        if raw == self.pending {
            return SubmitOutcome {
                decision: SubmitDecision::Ignored,
                activity: None,
            };
        }

        self.pending = raw;

        let activity = if raw.is_centered() {
            Some(Activity::Released)
        } else if self.committed.is_centered() {
            Some(Activity::Started(raw))
        } else {
            None
        };

        let decision = if bypass_delay || delay.is_zero() {
            self.cancel();
            SubmitDecision::CommitNow
        } else if self.pending != self.committed {
            match self.timer {
                TimerState::Idle => {
                    let deadline = now + delay;
                    self.timer = TimerState::Pending { deadline };
                    debug!("Scheduled commit of {} in {:?}", raw, delay);
                    SubmitDecision::Scheduled { deadline }
                }
                TimerState::Pending { deadline } => {
                    debug!("Retargeted running commit to {}", raw);
                    SubmitDecision::Coalesced { deadline }
                }
            }
        } else if self.cancel() {
            debug!("Direction returned to {}, dropped pending commit", raw);
            SubmitDecision::Cancelled
        } else {
            SubmitDecision::Unchanged
        };

        SubmitOutcome { decision, activity }
    }

    /// Returns true once the running countdown has elapsed. The countdown is
    /// consumed; the caller is expected to commit.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.timer {
            TimerState::Pending { deadline } if deadline <= now => {
                self.timer = TimerState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Drops the running countdown. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.timer = TimerState::Idle;
        was_pending
    }

    /// Moves the committed direction to the current target and returns the
    /// plan the caller must apply to its buttons.
    pub fn commit(&mut self, mode: DpadMode) -> TransitionPlan {
        self.timer = TimerState::Idle;
        let plan = plan_transitions(mode, self.committed, self.pending, self.diagonal_lock);
        self.diagonal_lock = plan.diagonal_lock;
        self.committed = self.pending;
        plan
    }

    /// Overwrites committed state, used when copying a pad's configuration.
    pub(crate) fn restore(&mut self, committed: Direction, diagonal_lock: Option<DpadButtonId>) {
        self.committed = committed;
        self.pending = committed;
        self.diagonal_lock = diagonal_lock;
        self.timer = TimerState::Idle;
    }

    /// Back to centered with no lock and no countdown.
    pub fn reset(&mut self) {
        self.restore(Direction::CENTERED, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(50);

    #[test]
    fn zero_delay_commits_immediately() {
        let mut controller = DebounceController::new();
        let now = Instant::now();

        let outcome = controller.submit(Direction::UP, false, Duration::ZERO, now);
        assert_eq!(outcome.decision, SubmitDecision::CommitNow);
        assert_eq!(outcome.activity, Some(Activity::Started(Direction::UP)));

        let plan = controller.commit(DpadMode::Standard);
        assert_eq!(plan.activations, vec![DpadButtonId::Up]);
        assert_eq!(controller.committed(), Direction::UP);
    }

    #[test]
    fn repeated_sample_is_ignored() {
        let mut controller = DebounceController::new();
        let now = Instant::now();
        controller.submit(Direction::LEFT, false, DELAY, now);

        let outcome = controller.submit(Direction::LEFT, false, DELAY, now);
        assert_eq!(outcome.decision, SubmitDecision::Ignored);
        assert_eq!(outcome.activity, None);
    }

    #[test]
    fn running_countdown_is_not_restarted() {
        let mut controller = DebounceController::new();
        let start = Instant::now();

        let first = controller.submit(Direction::UP, false, DELAY, start);
        let deadline = start + DELAY;
        assert_eq!(first.decision, SubmitDecision::Scheduled { deadline });

        let later = start + Duration::from_millis(30);
        let second = controller.submit(Direction::RIGHT, false, DELAY, later);
        assert_eq!(second.decision, SubmitDecision::Coalesced { deadline });
        assert_eq!(controller.deadline(), Some(deadline));

        assert!(!controller.poll(start + Duration::from_millis(49)));
        assert!(controller.poll(deadline));
        let plan = controller.commit(DpadMode::EightWay);
        assert_eq!(plan.activations, vec![DpadButtonId::Right]);
    }

    #[test]
    fn returning_to_committed_cancels() {
        let mut controller = DebounceController::new();
        let now = Instant::now();
        controller.submit(Direction::UP, true, DELAY, now);
        controller.commit(DpadMode::Standard);

        controller.submit(Direction::DOWN, false, DELAY, now);
        assert!(controller.is_pending());

        let outcome = controller.submit(Direction::UP, false, DELAY, now);
        assert_eq!(outcome.decision, SubmitDecision::Cancelled);
        assert!(!controller.is_pending());
        assert_eq!(controller.committed(), Direction::UP);
    }

    #[test]
    fn centered_always_signals_release() {
        let mut controller = DebounceController::new();
        let now = Instant::now();
        controller.submit(Direction::DOWN, true, DELAY, now);
        controller.commit(DpadMode::Standard);

        let outcome = controller.submit(Direction::CENTERED, false, DELAY, now);
        assert_eq!(outcome.activity, Some(Activity::Released));
        assert!(matches!(outcome.decision, SubmitDecision::Scheduled { .. }));
    }

    #[test]
    fn bypass_cancels_running_countdown() {
        let mut controller = DebounceController::new();
        let now = Instant::now();
        controller.submit(Direction::UP, false, DELAY, now);
        assert!(controller.is_pending());

        let outcome = controller.submit(Direction::DOWN, true, DELAY, now);
        assert_eq!(outcome.decision, SubmitDecision::CommitNow);
        assert!(!controller.is_pending());
    }
}
