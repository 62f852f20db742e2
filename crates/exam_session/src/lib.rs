//! Client-side exam session controller.
//!
//! One [`ExamSessionController`] owns a candidate's attempt: it watches host
//! signals for integrity violations, warns about them, forces submission once
//! the tab-switch budget is spent (after a ten second grace period), and sends
//! exactly one final answer set through a [`exam_client::SubmissionGateway`].
//! [`SessionRuntime`] drives a controller from a single task.

pub mod adapter;
pub mod auto_submit;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod tracker;
pub mod view;
pub mod warnings;

pub use adapter::{
    EventSourceAdapter, HostEventSource, HostSignal, IntegrityEvent, KeyPress, ListenerKind,
    SignalDisposition,
};
pub use auto_submit::{AutoSubmitNotice, SessionState, GRACE_PERIOD_TICKS};
pub use controller::{ControllerOptions, ExamSessionController, SessionDeps, SubmitOutcome};
pub use countdown::{CountdownHandle, CountdownScheduler, CountdownTick, TokioCountdownScheduler};
pub use error::{AnswerError, SessionLoadError, SubmitRejected};
pub use runtime::{SessionExit, SessionInput, SessionRuntime};
pub use session::{load_session, ExamSession, Question, SubmissionPayload, SubmitTrigger};
pub use tracker::VIOLATION_BUDGET;
pub use view::{
    LoadFailureView, NavigationTarget, QuestionView, SessionView, StatusLevel, StatusMessage,
    SubmitControl, WarningView,
};

#[cfg(test)]
mod tests;
