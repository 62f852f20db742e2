//! Declarative snapshot of everything the presentation layer renders.

use std::time::Duration;

use crate::adapter::IntegrityEvent;
use crate::auto_submit::{AutoSubmitNotice, SessionState};

pub const EXAMINER_SUBMIT_LABEL: &str = "Author can't Attempt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitControl {
    Enabled,
    Disabled { label: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningView {
    pub kind: IntegrityEvent,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub exam_title: String,
    pub state: SessionState,
    pub monitored: bool,
    pub violations: u32,
    pub remaining_violations: u32,
    pub remaining_time: String,
    pub questions: Vec<QuestionView>,
    pub warnings: Vec<WarningView>,
    pub auto_submit_notice: Option<AutoSubmitNotice>,
    pub submit_control: SubmitControl,
    pub status: Option<StatusMessage>,
    pub navigation: Option<NavigationTarget>,
}

impl SessionView {
    pub fn show_auto_submit_notice(&self) -> bool {
        self.auto_submit_notice.is_some()
    }

    pub fn seconds_left(&self) -> Option<u32> {
        self.auto_submit_notice
            .as_ref()
            .map(|notice| notice.seconds_left)
    }
}

/// Full-screen error shown when the exam cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailureView {
    pub message: String,
    pub redirect_after: Duration,
    pub target: NavigationTarget,
}

impl From<&crate::error::SessionLoadError> for LoadFailureView {
    fn from(err: &crate::error::SessionLoadError) -> Self {
        Self {
            message: err.user_message(),
            redirect_after: err.redirect_after(),
            target: NavigationTarget::Results,
        }
    }
}
