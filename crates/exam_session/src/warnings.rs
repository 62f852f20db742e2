//! Notification sink for integrity warnings: at most one live warning per
//! event kind.

use std::{collections::BTreeMap, time::Duration};

use tokio::time::Instant;
use tracing::debug;

use crate::adapter::IntegrityEvent;
use crate::tracker::VIOLATION_BUDGET;

const DEFAULT_WARNING_TTL: Duration = Duration::from_millis(2000);
const TAB_WARNING_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WarningId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub id: WarningId,
    pub kind: IntegrityEvent,
    pub message: String,
    pub expires_at: Instant,
}

pub fn warning_message(kind: IntegrityEvent, violations: u32) -> String {
    match kind {
        IntegrityEvent::TabHidden => format!(
            "Warning: You've switched tabs {violations}/{VIOLATION_BUDGET} times. After {VIOLATION_BUDGET} switches, your exam will be submitted automatically."
        ),
        IntegrityEvent::ClipboardAttempt => "Copy-paste is not allowed during the exam!".to_string(),
        IntegrityEvent::ContextMenuAttempt => {
            "Right-click is not allowed during the exam!".to_string()
        }
        IntegrityEvent::ShortcutAttempt => {
            "Keyboard shortcuts are not allowed during the exam!".to_string()
        }
    }
}

pub fn warning_ttl(kind: IntegrityEvent) -> Duration {
    match kind {
        IntegrityEvent::TabHidden => TAB_WARNING_TTL,
        _ => DEFAULT_WARNING_TTL,
    }
}

#[derive(Debug, Default)]
pub struct WarningBoard {
    live: BTreeMap<IntegrityEvent, Warning>,
    next_id: u64,
}

impl WarningBoard {
    /// Shows a warning of `kind`, cancelling any live one of the same kind
    /// first.
    pub fn show(&mut self, kind: IntegrityEvent, message: String, now: Instant) -> WarningId {
        if let Some(previous) = self.live.remove(&kind) {
            debug!(kind = kind.as_str(), superseded = previous.id.0, "warning replaced");
        }
        self.next_id += 1;
        let id = WarningId(self.next_id);
        self.live.insert(
            kind,
            Warning {
                id,
                kind,
                message,
                expires_at: now + warning_ttl(kind),
            },
        );
        id
    }

    pub fn dismiss(&mut self, kind: IntegrityEvent) -> Option<Warning> {
        self.live.remove(&kind)
    }

    pub fn dismiss_all(&mut self) -> usize {
        let dismissed = self.live.len();
        self.live.clear();
        dismissed
    }

    pub fn prune_expired(&mut self, now: Instant) -> usize {
        let before = self.live.len();
        self.live.retain(|_, warning| warning.expires_at > now);
        before - self.live.len()
    }

    pub fn get(&self, kind: IntegrityEvent) -> Option<&Warning> {
        self.live.get(&kind)
    }

    pub fn live(&self) -> impl Iterator<Item = &Warning> {
        self.live.values()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
