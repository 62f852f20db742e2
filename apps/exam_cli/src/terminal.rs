//! Terminal stand-in for a browser host: stdin commands become host signals
//! and session inputs, view snapshots become text.

use std::{
    collections::HashSet,
    fmt::Write as _,
    sync::{Arc, RwLock},
};

use exam_session::{
    HostEventSource, HostSignal, IntegrityEvent, KeyPress, ListenerKind, LoadFailureView,
    SessionExit, SessionInput, SessionView, StatusLevel, SubmitControl,
};
use thiserror::Error;
use tracing::debug;

pub const HELP: &str = "\
commands:
  <n> <option>     answer question n (1-based)
  :hide / :show    leave or return to the exam tab
  :copy :paste :cut :menu
  :key <combo>     key press, e.g. ctrl+c, meta+v, b
  :dismiss <kind>  tab | clipboard | menu | shortcut
  :submit          submit your answers
  :help            show this help
  :quit            leave without submitting";

/// Listener registrations shared between the session and the input loop.
#[derive(Clone, Default)]
pub struct TerminalHost {
    listening: Arc<RwLock<HashSet<ListenerKind>>>,
}

impl TerminalHost {
    pub fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listening
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&kind)
    }

    /// Whether the session will block the default action of `signal`.
    pub fn blocks(&self, signal: &HostSignal) -> bool {
        self.is_listening(signal.listener())
            && signal
                .classify()
                .is_some_and(IntegrityEvent::suppresses_default)
    }
}

impl HostEventSource for TerminalHost {
    fn add_listener(&mut self, kind: ListenerKind) {
        debug!(?kind, "listener added");
        self.listening
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(kind);
    }

    fn remove_listener(&mut self, kind: ListenerKind) {
        debug!(?kind, "listener removed");
        self.listening
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&kind);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Input(SessionInput),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', try :help")]
    Unknown(String),
    #[error("expected '<question number> <option>'")]
    BadAnswer,
    #[error("unknown warning kind '{0}'")]
    BadWarningKind(String),
    #[error("expected a key such as ctrl+c")]
    MissingKey,
}

pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return parse_answer(line).map(Some);
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();
    let signal = |signal| Ok(Some(Command::Input(SessionInput::Signal(signal))));
    match name.as_str() {
        "hide" => signal(HostSignal::VisibilityChanged { hidden: true }),
        "show" => signal(HostSignal::VisibilityChanged { hidden: false }),
        "copy" => signal(HostSignal::Copy),
        "paste" => signal(HostSignal::Paste),
        "cut" => signal(HostSignal::Cut),
        "menu" => signal(HostSignal::ContextMenu),
        "key" => signal(HostSignal::KeyDown(parse_key(arg.ok_or(CommandError::MissingKey)?))),
        "dismiss" => {
            let kind = match arg.map(str::to_ascii_lowercase).as_deref() {
                Some("tab") => IntegrityEvent::TabHidden,
                Some("clipboard") => IntegrityEvent::ClipboardAttempt,
                Some("menu") => IntegrityEvent::ContextMenuAttempt,
                Some("shortcut") => IntegrityEvent::ShortcutAttempt,
                other => {
                    return Err(CommandError::BadWarningKind(
                        other.unwrap_or_default().to_string(),
                    ))
                }
            };
            Ok(Some(Command::Input(SessionInput::DismissWarning(kind))))
        }
        "submit" => Ok(Some(Command::Input(SessionInput::Submit))),
        "help" => Ok(Some(Command::Help)),
        "quit" | "q" => Ok(Some(Command::Quit)),
        _ => Err(CommandError::Unknown(line.to_string())),
    }
}

fn parse_answer(line: &str) -> Result<Command, CommandError> {
    let (number, option) = line.split_once(char::is_whitespace).ok_or(CommandError::BadAnswer)?;
    let number: usize = number.parse().map_err(|_| CommandError::BadAnswer)?;
    let option = option.trim();
    if number == 0 || option.is_empty() {
        return Err(CommandError::BadAnswer);
    }
    Ok(Command::Input(SessionInput::SelectAnswer {
        question: number - 1,
        option: option.to_string(),
    }))
}

fn parse_key(combo: &str) -> KeyPress {
    let mut press = KeyPress::plain("");
    for part in combo.split('+') {
        match part.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => press.ctrl = true,
            "meta" | "cmd" | "super" => press.meta = true,
            key => press.key = key.to_string(),
        }
    }
    press
}

pub fn render_view(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", view.exam_title);
    let _ = write!(out, "time remaining: {}", view.remaining_time);
    if view.monitored {
        let _ = write!(
            out,
            " | tab switches: {} ({} left)",
            view.violations, view.remaining_violations
        );
    }
    out.push('\n');

    for (index, question) in view.questions.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, question.prompt);
        for option in &question.options {
            let marker = if question.selected.as_deref() == Some(option.as_str()) {
                "(x)"
            } else {
                "( )"
            };
            let _ = writeln!(out, "   {marker} {option}");
        }
    }

    for warning in &view.warnings {
        let _ = writeln!(out, "! {}", warning.message);
    }
    if let Some(notice) = &view.auto_submit_notice {
        let _ = writeln!(out, "*** {} ***", notice.title);
        let _ = writeln!(out, "{}", notice.reason);
        let _ = writeln!(out, "{}", notice.redirect_line());
    }
    match view.submit_control {
        SubmitControl::Enabled => {
            let _ = writeln!(out, "[submit: enabled]");
        }
        SubmitControl::Disabled { label } => {
            let _ = writeln!(out, "[{label}]");
        }
    }
    if let Some(status) = &view.status {
        let prefix = match status.level {
            StatusLevel::Info => "info",
            StatusLevel::Success => "ok",
            StatusLevel::Error => "error",
        };
        let _ = writeln!(out, "{prefix}: {}", status.text);
    }
    out
}

pub fn render_load_failure(view: &LoadFailureView) -> String {
    format!(
        "{}\nreturning to results in {} seconds",
        view.message,
        view.redirect_after.as_secs()
    )
}

pub fn render_exit(exit: &SessionExit) -> String {
    match (exit.state, &exit.submitted) {
        (state, Some(payload)) if state.is_terminal() => format!(
            "submitted after {}s ({}); opening results",
            payload.duration_secs(),
            if payload.auto_submitted() {
                "automatic"
            } else {
                "manual"
            }
        ),
        (state, _) => format!("left the exam without submitting ({})", state.as_str()),
    }
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
