//! Monitoring -> GracePeriod -> Submitted, with ManualSubmitted as the
//! voluntary exit. Owns the countdown handle and the auto-submit notice.

use std::time::Duration;

use tracing::{debug, info};

use crate::countdown::{CountdownHandle, CountdownScheduler, CountdownTick};

pub const GRACE_PERIOD_TICKS: u32 = 10;
pub const GRACE_TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Monitoring,
    GracePeriod { seconds_left: u32 },
    Submitted,
    ManualSubmitted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Submitted | SessionState::ManualSubmitted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Monitoring => "monitoring",
            SessionState::GracePeriod { .. } => "grace_period",
            SessionState::Submitted => "submitted",
            SessionState::ManualSubmitted => "manual_submitted",
        }
    }
}

/// Modal-style notice rendered while the grace period runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSubmitNotice {
    pub title: String,
    pub reason: String,
    pub seconds_left: u32,
}

impl AutoSubmitNotice {
    fn tab_budget(switches: u32, seconds_left: u32) -> Self {
        Self {
            title: "Exam Auto-Submitted".to_string(),
            reason: format!(
                "Your exam has been automatically submitted due to switching tabs {switches} times."
            ),
            seconds_left,
        }
    }

    pub fn redirect_line(&self) -> String {
        format!(
            "You will be redirected to the results page in {} seconds.",
            self.seconds_left
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick from a cancelled or superseded countdown.
    Stale,
    Remaining(u32),
    Expired,
}

pub struct AutoSubmitMachine {
    state: SessionState,
    scheduler: Box<dyn CountdownScheduler>,
    countdown: Option<CountdownHandle>,
    notice: Option<AutoSubmitNotice>,
}

impl AutoSubmitMachine {
    pub fn new(scheduler: Box<dyn CountdownScheduler>) -> Self {
        Self {
            state: SessionState::Monitoring,
            scheduler,
            countdown: None,
            notice: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn notice(&self) -> Option<&AutoSubmitNotice> {
        self.notice.as_ref()
    }

    pub fn countdown(&self) -> Option<CountdownHandle> {
        self.countdown
    }

    /// Monitoring -> GracePeriod. Returns false from any other state.
    pub fn enter_grace_period(&mut self, switches: u32) -> bool {
        if self.state != SessionState::Monitoring {
            return false;
        }
        self.cancel_countdown();
        self.countdown = Some(self.scheduler.schedule_repeating(GRACE_TICK_PERIOD));
        self.notice = Some(AutoSubmitNotice::tab_budget(switches, GRACE_PERIOD_TICKS));
        self.state = SessionState::GracePeriod {
            seconds_left: GRACE_PERIOD_TICKS,
        };
        info!(
            switches,
            seconds = GRACE_PERIOD_TICKS,
            "grace period started"
        );
        true
    }

    pub fn on_tick(&mut self, tick: CountdownTick) -> TickOutcome {
        let SessionState::GracePeriod { seconds_left } = self.state else {
            return TickOutcome::Stale;
        };
        if self.countdown != Some(tick.handle) {
            return TickOutcome::Stale;
        }
        let seconds_left = seconds_left.saturating_sub(1);
        self.state = SessionState::GracePeriod { seconds_left };
        if let Some(notice) = self.notice.as_mut() {
            notice.seconds_left = seconds_left;
        }
        if seconds_left == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Remaining(seconds_left)
        }
    }

    /// GracePeriod -> Submitted once the countdown has run out.
    pub fn complete_grace_period(&mut self) -> bool {
        if self.state != (SessionState::GracePeriod { seconds_left: 0 }) {
            return false;
        }
        self.cancel_countdown();
        self.notice = None;
        self.state = SessionState::Submitted;
        true
    }

    /// Monitoring -> Submitted when the exam's time limit runs out.
    pub fn expire_time_limit(&mut self) -> bool {
        if self.state != SessionState::Monitoring {
            return false;
        }
        self.state = SessionState::Submitted;
        true
    }

    /// Monitoring -> ManualSubmitted after the backend accepted the answers.
    pub fn mark_manual_submitted(&mut self) -> bool {
        if self.state != SessionState::Monitoring {
            return false;
        }
        self.state = SessionState::ManualSubmitted;
        true
    }

    /// Safe to call with no countdown outstanding.
    pub fn cancel_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            self.scheduler.cancel(handle);
        }
    }

    pub fn teardown(&mut self) {
        self.cancel_countdown();
        if self.notice.take().is_some() {
            debug!("auto-submit notice dismissed on teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::ManualScheduler;

    fn machine() -> (AutoSubmitMachine, ManualScheduler) {
        let scheduler = ManualScheduler::default();
        (
            AutoSubmitMachine::new(Box::new(scheduler.clone())),
            scheduler,
        )
    }

    #[test]
    fn grace_period_counts_ten_ticks_then_expires() {
        let (mut machine, scheduler) = machine();
        assert!(machine.enter_grace_period(3));
        let handle = scheduler.last_scheduled().expect("scheduled");
        assert_eq!(scheduler.period(handle), Some(GRACE_TICK_PERIOD));
        assert_eq!(machine.countdown(), Some(handle));
        assert_eq!(machine.notice().expect("notice").seconds_left, 10);
        assert!(!machine.state().is_terminal());

        for expected in (1..GRACE_PERIOD_TICKS).rev() {
            assert_eq!(
                machine.on_tick(CountdownTick { handle }),
                TickOutcome::Remaining(expected)
            );
        }
        assert_eq!(
            machine.on_tick(CountdownTick { handle }),
            TickOutcome::Expired
        );
        assert!(machine.complete_grace_period());
        assert_eq!(machine.state(), SessionState::Submitted);
        assert!(machine.state().is_terminal());
        assert_eq!(machine.countdown(), None);
        assert!(scheduler.is_cancelled(handle));
        assert!(machine.notice().is_none());
        assert!(scheduler.is_cancelled(handle));
    }

    #[test]
    fn grace_period_is_unreachable_after_a_terminal_state() {
        let (mut machine, scheduler) = machine();
        assert!(machine.mark_manual_submitted());
        assert!(!machine.enter_grace_period(3));
        assert!(scheduler.last_scheduled().is_none());
        assert_eq!(machine.state(), SessionState::ManualSubmitted);
    }

    #[test]
    fn stale_ticks_do_not_advance_the_countdown() {
        let (mut machine, scheduler) = machine();
        machine.enter_grace_period(3);
        let handle = scheduler.last_scheduled().expect("scheduled");
        let foreign = scheduler.schedule_detached();

        assert_eq!(
            machine.on_tick(CountdownTick { handle: foreign }),
            TickOutcome::Stale
        );
        assert_eq!(
            machine.state(),
            SessionState::GracePeriod { seconds_left: 10 }
        );
        assert_eq!(
            machine.on_tick(CountdownTick { handle }),
            TickOutcome::Remaining(9)
        );
    }

    #[test]
    fn completion_requires_an_exhausted_countdown() {
        let (mut machine, _scheduler) = machine();
        assert!(!machine.complete_grace_period());
        machine.enter_grace_period(3);
        assert!(!machine.complete_grace_period());
    }

    #[test]
    fn teardown_and_cancel_are_idempotent() {
        let (mut machine, scheduler) = machine();
        machine.cancel_countdown();
        machine.teardown();
        assert_eq!(scheduler.cancel_calls(), 0);

        machine.enter_grace_period(3);
        machine.teardown();
        machine.teardown();
        machine.cancel_countdown();
        assert_eq!(scheduler.cancel_calls(), 1);
        assert!(machine.notice().is_none());
    }

    #[test]
    fn notice_describes_the_redirect() {
        let (mut machine, _scheduler) = machine();
        machine.enter_grace_period(3);
        let notice = machine.notice().expect("notice");
        assert_eq!(
            notice.reason,
            "Your exam has been automatically submitted due to switching tabs 3 times."
        );
        assert_eq!(
            notice.redirect_line(),
            "You will be redirected to the results page in 10 seconds."
        );
    }
}
