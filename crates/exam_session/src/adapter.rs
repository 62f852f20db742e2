//! Host signal intake: which host listeners exist, and how raw host signals
//! become integrity events.

use shared::domain::Role;
use tracing::debug;

/// Host-level listener registrations made for a monitored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    VisibilityChange,
    Copy,
    Paste,
    Cut,
    ContextMenu,
    KeyDown,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 6] = [
        ListenerKind::VisibilityChange,
        ListenerKind::Copy,
        ListenerKind::Paste,
        ListenerKind::Cut,
        ListenerKind::ContextMenu,
        ListenerKind::KeyDown,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: true,
            meta: false,
        }
    }

    pub fn meta(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: true,
        }
    }

    fn is_blocked_shortcut(&self) -> bool {
        (self.ctrl || self.meta)
            && matches!(
                self.key.to_ascii_lowercase().as_str(),
                "c" | "v" | "x" | "a"
            )
    }
}

/// Raw signal as delivered by the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    VisibilityChanged { hidden: bool },
    Copy,
    Paste,
    Cut,
    ContextMenu,
    KeyDown(KeyPress),
}

impl HostSignal {
    pub fn listener(&self) -> ListenerKind {
        match self {
            HostSignal::VisibilityChanged { .. } => ListenerKind::VisibilityChange,
            HostSignal::Copy => ListenerKind::Copy,
            HostSignal::Paste => ListenerKind::Paste,
            HostSignal::Cut => ListenerKind::Cut,
            HostSignal::ContextMenu => ListenerKind::ContextMenu,
            HostSignal::KeyDown(_) => ListenerKind::KeyDown,
        }
    }

    /// Integrity event carried by this signal, if any. Becoming visible and
    /// ordinary key presses are not events.
    pub fn classify(&self) -> Option<IntegrityEvent> {
        match self {
            HostSignal::VisibilityChanged { hidden: true } => Some(IntegrityEvent::TabHidden),
            HostSignal::VisibilityChanged { hidden: false } => None,
            HostSignal::Copy | HostSignal::Paste | HostSignal::Cut => {
                Some(IntegrityEvent::ClipboardAttempt)
            }
            HostSignal::ContextMenu => Some(IntegrityEvent::ContextMenuAttempt),
            HostSignal::KeyDown(press) if press.is_blocked_shortcut() => {
                Some(IntegrityEvent::ShortcutAttempt)
            }
            HostSignal::KeyDown(_) => None,
        }
    }
}

/// Abstract integrity event. Also serves as the warning key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntegrityEvent {
    TabHidden,
    ClipboardAttempt,
    ContextMenuAttempt,
    ShortcutAttempt,
}

impl IntegrityEvent {
    pub const ALL: [IntegrityEvent; 4] = [
        IntegrityEvent::TabHidden,
        IntegrityEvent::ClipboardAttempt,
        IntegrityEvent::ContextMenuAttempt,
        IntegrityEvent::ShortcutAttempt,
    ];

    pub fn counts_toward_budget(self) -> bool {
        self == IntegrityEvent::TabHidden
    }

    /// Whether the host's default action must not happen.
    pub fn suppresses_default(self) -> bool {
        !self.counts_toward_budget()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntegrityEvent::TabHidden => "tab_hidden",
            IntegrityEvent::ClipboardAttempt => "clipboard_attempt",
            IntegrityEvent::ContextMenuAttempt => "context_menu_attempt",
            IntegrityEvent::ShortcutAttempt => "shortcut_attempt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDisposition {
    Allow,
    SuppressDefault,
}

/// Host side of listener registration.
pub trait HostEventSource: Send + Sync {
    fn add_listener(&mut self, kind: ListenerKind);
    fn remove_listener(&mut self, kind: ListenerKind);
}

pub struct EventSourceAdapter {
    host: Box<dyn HostEventSource>,
    attached: Vec<ListenerKind>,
}

impl EventSourceAdapter {
    pub fn new(host: Box<dyn HostEventSource>) -> Self {
        Self {
            host,
            attached: Vec::new(),
        }
    }

    /// Registers every listener for monitored roles. Returns whether the
    /// session is being monitored afterwards.
    pub fn attach(&mut self, role: Role) -> bool {
        if !role.is_monitored() {
            debug!(role = role.as_str(), "role exempt from integrity monitoring");
            return false;
        }
        if !self.attached.is_empty() {
            return true;
        }
        for kind in ListenerKind::ALL {
            self.host.add_listener(kind);
            self.attached.push(kind);
        }
        true
    }

    /// Removes whatever is still registered; returns how many listeners were
    /// released. Calling it again releases nothing.
    pub fn detach_all(&mut self) -> usize {
        let released = self.attached.len();
        for kind in self.attached.drain(..) {
            self.host.remove_listener(kind);
        }
        released
    }

    pub fn is_attached(&self) -> bool {
        !self.attached.is_empty()
    }

    pub fn translate(&self, signal: &HostSignal) -> Option<IntegrityEvent> {
        if !self.attached.contains(&signal.listener()) {
            return None;
        }
        signal.classify()
    }
}
