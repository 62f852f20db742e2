use std::sync::Arc;

use exam_client::{AuthContext, GatewayError, SubmissionGateway};
use shared::domain::Role;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::adapter::{EventSourceAdapter, HostEventSource, HostSignal, IntegrityEvent, SignalDisposition};
use crate::auto_submit::{AutoSubmitMachine, SessionState, TickOutcome};
use crate::countdown::{CountdownScheduler, CountdownTick};
use crate::error::{AnswerError, SubmitRejected};
use crate::session::{ExamSession, SubmissionPayload, SubmitTrigger};
use crate::timer::SessionTimer;
use crate::tracker::{Verdict, ViolationTracker};
use crate::view::{
    NavigationTarget, QuestionView, SessionView, StatusMessage, SubmitControl, WarningView,
    EXAMINER_SUBMIT_LABEL,
};
use crate::warnings::{warning_message, Warning, WarningBoard};

const AUTO_SUBMITTING_LABEL: &str = "Auto-submitting";
const SUBMITTED_LABEL: &str = "Submitted";
const MANUAL_SUCCESS: &str = "Exam submitted successfully!";
const MANUAL_FAILURE: &str = "Failed to submit exam";
const NETWORK_FAILURE: &str = "Network error. Please try again.";
const AUTO_SUCCESS: &str =
    "Your exam has been submitted automatically due to multiple tab switches.";
const TIME_LIMIT_SUCCESS: &str = "Time is up. Your exam has been submitted automatically.";
const AUTO_FAILURE: &str = "Failed to submit exam automatically.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Submit automatically when the exam's time limit runs out.
    pub enforce_time_limit: bool,
}

/// Host-facing collaborators of one controller.
pub struct SessionDeps {
    pub host: Box<dyn HostEventSource>,
    pub scheduler: Box<dyn CountdownScheduler>,
    pub gateway: Arc<dyn SubmissionGateway>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Nothing changed; the user may retry.
    Failed { message: String },
}

fn manual_failure_message(err: &GatewayError) -> String {
    if let Some(message) = err.server_message() {
        message.to_string()
    } else if err.is_transport() {
        NETWORK_FAILURE.to_string()
    } else {
        MANUAL_FAILURE.to_string()
    }
}

fn auto_failure_message(err: &GatewayError) -> String {
    match err.server_message() {
        Some(message) => format!("{AUTO_FAILURE} {message}"),
        None => AUTO_FAILURE.to_string(),
    }
}

/// Owns every piece of mutable state of one exam attempt. Each method is one
/// run-to-completion reaction.
pub struct ExamSessionController {
    session: ExamSession,
    auth: AuthContext,
    gateway: Arc<dyn SubmissionGateway>,
    adapter: EventSourceAdapter,
    tracker: ViolationTracker,
    warnings: WarningBoard,
    auto_submit: AutoSubmitMachine,
    timer: SessionTimer,
    options: ControllerOptions,
    monitored: bool,
    status: Option<StatusMessage>,
    navigation: Option<NavigationTarget>,
    submitted: Option<SubmissionPayload>,
    torn_down: bool,
}

impl ExamSessionController {
    pub fn new(
        session: ExamSession,
        auth: AuthContext,
        deps: SessionDeps,
        options: ControllerOptions,
    ) -> Self {
        let mut adapter = EventSourceAdapter::new(deps.host);
        let monitored = adapter.attach(session.role());
        let timer = SessionTimer::start(session.duration());
        info!(
            exam_id = %session.exam_id(),
            attempt_id = %session.attempt_id(),
            monitored,
            started_at = %timer.started_at(),
            "exam session started"
        );
        Self {
            session,
            auth,
            gateway: deps.gateway,
            adapter,
            tracker: ViolationTracker::default(),
            warnings: WarningBoard::default(),
            auto_submit: AutoSubmitMachine::new(deps.scheduler),
            timer,
            options,
            monitored,
            status: None,
            navigation: None,
            submitted: None,
            torn_down: false,
        }
    }

    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.auto_submit.state()
    }

    pub fn is_monitored(&self) -> bool {
        self.monitored
    }

    pub fn violations(&self) -> u32 {
        self.tracker.count()
    }

    pub fn remaining_violations(&self) -> u32 {
        self.tracker.remaining()
    }

    pub fn remaining_time_display(&self) -> String {
        self.timer.remaining_display()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.timer.elapsed_secs()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.live()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn navigation(&self) -> Option<NavigationTarget> {
        self.navigation
    }

    /// The payload of the terminal submission, once one has been made.
    pub fn submitted_payload(&self) -> Option<&SubmissionPayload> {
        self.submitted.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn handle_signal(&mut self, signal: &HostSignal) -> SignalDisposition {
        if self.torn_down {
            return SignalDisposition::Allow;
        }
        let Some(event) = self.adapter.translate(signal) else {
            return SignalDisposition::Allow;
        };
        self.on_integrity_event(event);
        if event.suppresses_default() {
            SignalDisposition::SuppressDefault
        } else {
            SignalDisposition::Allow
        }
    }

    fn on_integrity_event(&mut self, event: IntegrityEvent) {
        match self.tracker.assess(event) {
            Verdict::Suppressed => {}
            Verdict::Warn => {
                debug!(event = event.as_str(), "integrity warning");
                self.show_warning(event);
            }
            Verdict::Counted { count, remaining } => {
                warn!(
                    exam_id = %self.session.exam_id(),
                    attempt_id = %self.session.attempt_id(),
                    violations = count,
                    remaining,
                    "tab hidden during exam"
                );
                self.show_warning(event);
            }
            Verdict::BudgetExhausted { count } => {
                self.show_warning(event);
                self.begin_grace_period(count);
            }
        }
    }

    fn show_warning(&mut self, event: IntegrityEvent) {
        let message = warning_message(event, self.tracker.count());
        self.warnings.show(event, message, Instant::now());
    }

    fn begin_grace_period(&mut self, count: u32) {
        self.tracker.suppress();
        if self.auto_submit.enter_grace_period(count) {
            warn!(
                exam_id = %self.session.exam_id(),
                attempt_id = %self.session.attempt_id(),
                violations = count,
                "violation budget exhausted; auto-submit scheduled"
            );
        }
    }

    pub async fn on_countdown_tick(&mut self, tick: CountdownTick) {
        if self.torn_down {
            return;
        }
        match self.auto_submit.on_tick(tick) {
            TickOutcome::Stale => debug!(handle = tick.handle.id(), "stale countdown tick"),
            TickOutcome::Remaining(seconds_left) => debug!(seconds_left, "grace period tick"),
            TickOutcome::Expired => {
                if self.auto_submit.complete_grace_period() {
                    self.send_automatic(SubmitTrigger::ViolationBudget).await;
                }
            }
        }
    }

    /// Display-refresh reaction: expires warnings and, when configured,
    /// enforces the time limit.
    pub async fn on_refresh(&mut self) {
        if self.torn_down {
            return;
        }
        let expired = self.warnings.prune_expired(Instant::now());
        if expired > 0 {
            debug!(expired, "warnings expired");
        }
        if self.options.enforce_time_limit
            && self.monitored
            && self.timer.is_expired()
            && self.auto_submit.expire_time_limit()
        {
            self.tracker.suppress();
            self.warnings.dismiss_all();
            warn!(
                exam_id = %self.session.exam_id(),
                attempt_id = %self.session.attempt_id(),
                "time limit reached; submitting"
            );
            self.send_automatic(SubmitTrigger::TimeLimit).await;
        }
    }

    async fn send_automatic(&mut self, trigger: SubmitTrigger) {
        let payload = SubmissionPayload::new(
            &self.session,
            self.timer.elapsed_secs(),
            trigger,
            self.tracker.count(),
        );
        match self
            .gateway
            .submit(&self.auth, &payload.to_request())
            .await
        {
            Ok(_) => {
                info!(
                    exam_id = %self.session.exam_id(),
                    attempt_id = %self.session.attempt_id(),
                    duration_secs = payload.duration_secs(),
                    tab_switches = payload.tab_switches(),
                    "exam auto-submitted"
                );
                let text = match trigger {
                    SubmitTrigger::TimeLimit => TIME_LIMIT_SUCCESS,
                    _ => AUTO_SUCCESS,
                };
                self.status = Some(StatusMessage::info(text));
            }
            Err(err) => {
                error!(
                    exam_id = %self.session.exam_id(),
                    attempt_id = %self.session.attempt_id(),
                    error = %err,
                    "auto-submit failed; leaving exam anyway"
                );
                self.status = Some(StatusMessage::error(auto_failure_message(&err)));
            }
        }
        self.submitted = Some(payload);
        self.navigation = Some(NavigationTarget::Results);
    }

    pub async fn submit_manually(&mut self) -> Result<SubmitOutcome, SubmitRejected> {
        if self.torn_down {
            return Err(SubmitRejected::TornDown);
        }
        if self.session.role() == Role::Examiner {
            return Err(SubmitRejected::NotPermitted);
        }
        let state = self.auto_submit.state();
        if state != SessionState::Monitoring {
            return Err(SubmitRejected::NotMonitoring(state));
        }

        let payload = SubmissionPayload::new(
            &self.session,
            self.timer.elapsed_secs(),
            SubmitTrigger::Manual,
            self.tracker.count(),
        );
        match self
            .gateway
            .submit(&self.auth, &payload.to_request())
            .await
        {
            Ok(_) => {
                self.auto_submit.mark_manual_submitted();
                self.tracker.suppress();
                info!(
                    exam_id = %self.session.exam_id(),
                    attempt_id = %self.session.attempt_id(),
                    duration_secs = payload.duration_secs(),
                    "exam submitted"
                );
                self.status = Some(StatusMessage::success(MANUAL_SUCCESS));
                self.submitted = Some(payload);
                self.navigation = Some(NavigationTarget::Results);
                Ok(SubmitOutcome::Accepted)
            }
            Err(err) => {
                let message = manual_failure_message(&err);
                warn!(
                    exam_id = %self.session.exam_id(),
                    attempt_id = %self.session.attempt_id(),
                    error = %err,
                    "manual submit failed"
                );
                self.status = Some(StatusMessage::error(message.clone()));
                Ok(SubmitOutcome::Failed { message })
            }
        }
    }

    pub fn select_answer(&mut self, index: usize, option: &str) -> Result<(), AnswerError> {
        if self.session.role() == Role::Examiner {
            return Err(AnswerError::NotPermitted);
        }
        if self.torn_down || self.auto_submit.state() != SessionState::Monitoring {
            return Err(AnswerError::Frozen);
        }
        self.session.select_answer(index, option)
    }

    pub fn dismiss_warning(&mut self, kind: IntegrityEvent) -> bool {
        self.warnings.dismiss(kind).is_some()
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    /// Releases listeners, warnings and any countdown. Safe to repeat.
    pub fn teardown(&mut self) {
        let listeners = self.adapter.detach_all();
        let warnings = self.warnings.dismiss_all();
        self.auto_submit.teardown();
        if !self.torn_down {
            info!(
                exam_id = %self.session.exam_id(),
                attempt_id = %self.session.attempt_id(),
                state = self.auto_submit.state().as_str(),
                listeners,
                warnings,
                "exam session closed"
            );
        }
        self.torn_down = true;
    }

    pub fn view(&self) -> SessionView {
        let state = self.auto_submit.state();
        let submit_control = if self.session.role() == Role::Examiner {
            SubmitControl::Disabled {
                label: EXAMINER_SUBMIT_LABEL,
            }
        } else {
            match state {
                SessionState::Monitoring => SubmitControl::Enabled,
                SessionState::GracePeriod { .. } => SubmitControl::Disabled {
                    label: AUTO_SUBMITTING_LABEL,
                },
                SessionState::Submitted | SessionState::ManualSubmitted => {
                    SubmitControl::Disabled {
                        label: SUBMITTED_LABEL,
                    }
                }
            }
        };
        let questions = self
            .session
            .questions()
            .iter()
            .zip(self.session.answers())
            .map(|(question, selected)| QuestionView {
                prompt: question.prompt.clone(),
                options: question.options.clone(),
                selected: selected.clone(),
            })
            .collect();

        SessionView {
            exam_title: self.session.title().to_string(),
            state,
            monitored: self.monitored,
            violations: self.tracker.count(),
            remaining_violations: self.tracker.remaining(),
            remaining_time: self.timer.remaining_display(),
            questions,
            warnings: self
                .warnings
                .live()
                .map(|warning| WarningView {
                    kind: warning.kind,
                    message: warning.message.clone(),
                })
                .collect(),
            auto_submit_notice: self.auto_submit.notice().cloned(),
            submit_control,
            status: self.status.clone(),
            navigation: self.navigation,
        }
    }
}

impl Drop for ExamSessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
