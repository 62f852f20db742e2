//! Single-task event loop around one [`ExamSessionController`].

use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::adapter::{HostSignal, IntegrityEvent};
use crate::auto_submit::SessionState;
use crate::controller::{ExamSessionController, SubmitOutcome};
use crate::countdown::CountdownTick;
use crate::session::SubmissionPayload;
use crate::view::{NavigationTarget, SessionView, StatusMessage};

pub const DISPLAY_REFRESH: Duration = Duration::from_secs(1);

/// Everything the host can ask of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Signal(HostSignal),
    SelectAnswer { question: usize, option: String },
    DismissWarning(IntegrityEvent),
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExit {
    pub state: SessionState,
    pub navigation: Option<NavigationTarget>,
    pub submitted: Option<SubmissionPayload>,
}

pub struct SessionRuntime {
    controller: ExamSessionController,
    inputs: mpsc::Receiver<SessionInput>,
    ticks: mpsc::UnboundedReceiver<CountdownTick>,
    views: watch::Sender<SessionView>,
    refresh_every: Duration,
}

impl SessionRuntime {
    /// Returns the runtime and a receiver for view snapshots. The first
    /// snapshot is available immediately.
    pub fn new(
        controller: ExamSessionController,
        inputs: mpsc::Receiver<SessionInput>,
        ticks: mpsc::UnboundedReceiver<CountdownTick>,
    ) -> (Self, watch::Receiver<SessionView>) {
        let (views, view_rx) = watch::channel(controller.view());
        (
            Self {
                controller,
                inputs,
                ticks,
                views,
                refresh_every: DISPLAY_REFRESH,
            },
            view_rx,
        )
    }

    pub fn with_refresh_every(mut self, refresh_every: Duration) -> Self {
        self.refresh_every = refresh_every;
        self
    }

    /// Runs until the session navigates away or the host hangs up. The
    /// controller is torn down before returning.
    pub async fn run(mut self) -> SessionExit {
        let mut refresh = interval(self.refresh_every);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(input) => self.apply(input).await,
                    None => {
                        info!("host closed the session");
                        break;
                    }
                },
                Some(tick) = self.ticks.recv() => {
                    self.controller.on_countdown_tick(tick).await;
                }
                _ = refresh.tick() => {
                    self.controller.on_refresh().await;
                }
            }

            self.publish();
            if let Some(target) = self.controller.navigation() {
                debug!(?target, "session navigating away");
                break;
            }
        }

        self.controller.teardown();
        self.publish();
        SessionExit {
            state: self.controller.state(),
            navigation: self.controller.navigation(),
            submitted: self.controller.submitted_payload().cloned(),
        }
    }

    async fn apply(&mut self, input: SessionInput) {
        match input {
            SessionInput::Signal(signal) => {
                self.controller.handle_signal(&signal);
            }
            SessionInput::SelectAnswer { question, option } => {
                if let Err(err) = self.controller.select_answer(question, &option) {
                    self.controller.set_status(StatusMessage::error(err.to_string()));
                }
            }
            SessionInput::DismissWarning(kind) => {
                self.controller.dismiss_warning(kind);
            }
            SessionInput::Submit => match self.controller.submit_manually().await {
                Ok(SubmitOutcome::Accepted) => {}
                Ok(SubmitOutcome::Failed { message }) => {
                    debug!(%message, "manual submit may be retried");
                }
                Err(rejected) => {
                    warn!(error = %rejected, "submit request refused");
                    self.controller
                        .set_status(StatusMessage::error(rejected.to_string()));
                }
            },
        }
    }

    fn publish(&self) {
        self.views.send_replace(self.controller.view());
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
